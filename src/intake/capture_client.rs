use std::time::Duration;

use serde::Deserialize;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::mpsc::Sender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::common::Frame;
use crate::error::AppError;
use crate::intake::frame_source::FrameSource;

/// A captured frame, or the error that ended capture.
pub type CaptureItem = Result<Frame, AppError>;

/// What capture does when the analysis queue is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backpressure {
    /// Drop the new frame to stay real-time, like a live camera feed.
    DropNewest,
    /// Wait for room so every frame gets analyzed.
    #[default]
    Block,
}

/// Drives a [`FrameSource`] on its own thread and feeds the analysis queue.
pub struct CaptureClient {
    cancel_token: CancellationToken,
    capture_thread: Option<std::thread::JoinHandle<CaptureStats>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureStats {
    pub captured: u64,
    pub dropped: u64,
}

impl CaptureClient {
    pub fn new(
        source: Box<dyn FrameSource>,
        frame_tx: Sender<CaptureItem>,
        frame_interval: Duration,
        backpressure: Backpressure,
        cancel_token: CancellationToken,
    ) -> Self {
        let mut capture = Capture {
            source,
            frame_tx,
            frame_interval,
            backpressure,
            stats: CaptureStats::default(),
        };
        let thread_token = cancel_token.clone();
        Self {
            cancel_token,
            capture_thread: Some(std::thread::spawn(move || capture.run(thread_token))),
        }
    }

    /// Cancels capture and waits for the thread to finish.
    pub fn stop(&mut self) -> Option<CaptureStats> {
        self.cancel_token.cancel();
        self.wait()
    }

    /// Waits for the source to run dry without cancelling it.
    pub fn wait(&mut self) -> Option<CaptureStats> {
        let thread = self.capture_thread.take()?;
        match thread.join() {
            Ok(stats) => Some(stats),
            Err(_) => {
                error!("Capture thread panicked");
                None
            }
        }
    }
}

impl Drop for CaptureClient {
    fn drop(&mut self) {
        self.stop();
    }
}

struct Capture {
    source: Box<dyn FrameSource>,
    frame_tx: Sender<CaptureItem>,
    frame_interval: Duration,
    backpressure: Backpressure,
    stats: CaptureStats,
}

impl Capture {
    fn run(&mut self, cancel_token: CancellationToken) -> CaptureStats {
        info!("Capturing from {}", self.source.describe());
        while !cancel_token.is_cancelled() {
            match self.source.next_frame() {
                Ok(Some(frame)) => {
                    if !self.publish(frame) {
                        break;
                    }
                }
                Ok(None) => {
                    info!("Frame source exhausted");
                    break;
                }
                Err(e) => {
                    error!("Failed to capture frame: {}", e);
                    // Analysis surfaces the failure; nothing to do if it is gone.
                    let _ = self.frame_tx.blocking_send(Err(e));
                    break;
                }
            }
            if !self.frame_interval.is_zero() {
                std::thread::sleep(self.frame_interval);
            }
        }
        debug!(
            "Capture finished: {} frames captured, {} dropped",
            self.stats.captured, self.stats.dropped
        );
        self.stats
    }

    /// Returns false once the receiving side is gone.
    fn publish(&mut self, frame: Frame) -> bool {
        self.stats.captured += 1;
        match self.backpressure {
            Backpressure::Block => self.frame_tx.blocking_send(Ok(frame)).is_ok(),
            Backpressure::DropNewest => match self.frame_tx.try_send(Ok(frame)) {
                Ok(_) => true,
                Err(TrySendError::Full(_)) => {
                    // Drop frame to keep real-time
                    self.stats.dropped += 1;
                    warn!("Dropping frame: channel full");
                    true
                }
                Err(TrySendError::Closed(_)) => false,
            },
        }
    }
}
