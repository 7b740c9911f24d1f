use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::common::{Frame, Rotation};
use crate::config::{AnalysisMode, Configuration};
use crate::error::AppError;
use crate::intake::{Backpressure, CaptureClient, CaptureItem, CaptureStats, FrameSource, ImageFolderSource};
use crate::pipeline::{Analysis, ConfiguredPipelineFactory, FrameMetrics, PipelineFactory, ProcessingPipeline};

/// One analyzed frame, ready for display.
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub frame_id: Uuid,
    pub sequence: u64,
    pub captured_at: DateTime<Utc>,
    pub frame: Arc<Frame>,
    pub analysis: Analysis,
    pub metrics: FrameMetrics,
}

#[derive(Debug)]
pub enum SessionEvent {
    Analyzed(AnalysisReport),
    /// Terminal: nothing else is processed after this.
    Failed(String),
}

pub struct Coordinator {
    configuration: Configuration,
    capture: Option<CaptureClient>,
    pipeline_task: Option<JoinHandle<()>>,
    cancel_token: CancellationToken,
    events: Option<Receiver<SessionEvent>>,
}

impl Coordinator {
    fn new(
        configuration: Configuration,
        source: Box<dyn FrameSource>,
        pipeline: ProcessingPipeline,
    ) -> Self {
        let cancel_token = CancellationToken::new();
        let (frame_tx, frame_rx) = mpsc::channel(configuration.frame_buffer_size.max(1));
        let (event_tx, event_rx) = mpsc::channel(configuration.event_buffer_size.max(1));

        let capture = CaptureClient::new(
            source,
            frame_tx,
            Duration::from_millis(configuration.frame_interval_ms),
            configuration.backpressure,
            cancel_token.child_token(),
        );
        let pipeline_task =
            Self::start_pipeline_task(pipeline, frame_rx, event_tx, cancel_token.clone());

        Self {
            configuration,
            capture: Some(capture),
            pipeline_task: Some(pipeline_task),
            cancel_token,
            events: Some(event_rx),
        }
    }

    fn start_pipeline_task(
        mut pipeline: ProcessingPipeline,
        mut frame_rx: Receiver<CaptureItem>,
        event_tx: Sender<SessionEvent>,
        cancel_token: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                let item = tokio::select! {
                    biased;
                    _ = cancel_token.cancelled() => break,
                    item = frame_rx.recv() => match item {
                        Some(item) => item,
                        None => break,
                    },
                };

                let result = match item {
                    Ok(frame) => pipeline.process(frame).await,
                    Err(e) => Err(e),
                };

                let event = match result {
                    Ok(ctx) => {
                        let (frame, analysis, metrics) = ctx.into_parts();
                        SessionEvent::Analyzed(AnalysisReport {
                            frame_id: frame.frame_id(),
                            sequence: frame.sequence(),
                            captured_at: frame.captured_at(),
                            frame,
                            analysis,
                            metrics,
                        })
                    }
                    Err(e) => {
                        tracing::error!("Pipeline error: {}", e);
                        let _ = event_tx.send(SessionEvent::Failed(e.to_string())).await;
                        // Stop processing further frames.
                        cancel_token.cancel();
                        break;
                    }
                };
                if event_tx.send(event).await.is_err() {
                    tracing::debug!("Event receiver dropped, stopping pipeline");
                    break;
                }
            }
            tracing::debug!("Pipeline task finished");
        })
    }

    /// The configuration after builder overrides.
    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    /// Hands out the event stream; only the first call gets it.
    pub fn take_events(&mut self) -> Option<Receiver<SessionEvent>> {
        self.events.take()
    }

    pub fn stop(&self) {
        self.cancel_token.cancel();
    }

    /// Waits for capture and analysis to wind down.
    pub async fn join(mut self) -> Result<Option<CaptureStats>, AppError> {
        if let Some(task) = self.pipeline_task.take() {
            task.await
                .map_err(|e| AppError::Pipeline(format!("pipeline task failed: {e}")))?;
        }
        // Nothing drains frames any more.
        self.cancel_token.cancel();
        let stats = match self.capture.take() {
            Some(mut capture) => tokio::task::spawn_blocking(move || capture.stop())
                .await
                .map_err(|e| AppError::Intake(format!("capture thread failed: {e}")))?,
            None => None,
        };
        Ok(stats)
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        self.cancel_token.cancel();
        if let Some(task) = self.pipeline_task.take() {
            task.abort();
        }
    }
}

pub struct CoordinatorBuilder {
    configuration: Configuration,
    frames_dir: Option<PathBuf>,
    source: Option<Box<dyn FrameSource>>,
    pipeline: Option<ProcessingPipeline>,
}

impl CoordinatorBuilder {
    pub fn new(configuration: Configuration) -> Self {
        Self {
            configuration,
            frames_dir: None,
            source: None,
            pipeline: None,
        }
    }

    // Selects the model by catalog key or path, this will override the configuration.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.configuration.model = Some(model.into());
        self
    }

    // Adjusts the analysis mode, this will override the configuration.
    pub fn mode(mut self, mode: AnalysisMode) -> Self {
        self.configuration.mode = mode;
        self
    }

    // Sets where overlays are written, this will override the configuration.
    pub fn output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.configuration.output_dir = Some(output_dir.into());
        self
    }

    // Adjusts the sensor rotation, this will override the configuration.
    pub fn rotation_degrees(mut self, rotation_degrees: u32) -> Self {
        self.configuration.rotation_degrees = rotation_degrees;
        self
    }

    // Adjusts the analyzer timeout, this will override the configuration.
    pub fn analyzer_timeout_ms(mut self, analyzer_timeout_ms: u64) -> Self {
        self.configuration.analyzer_timeout_ms = Some(analyzer_timeout_ms);
        self
    }

    /// Replays the image files of `frames_dir` unless a source is set.
    pub fn frames_dir(mut self, frames_dir: impl Into<PathBuf>) -> Self {
        self.frames_dir = Some(frames_dir.into());
        self
    }

    // Adjusts the frame buffer size, this will override the configuration.
    pub fn frame_buffer_size(mut self, frame_buffer_size: usize) -> Self {
        self.configuration.frame_buffer_size = frame_buffer_size;
        self
    }

    // Adjusts the event buffer size, this will override the configuration.
    pub fn event_buffer_size(mut self, event_buffer_size: usize) -> Self {
        self.configuration.event_buffer_size = event_buffer_size;
        self
    }

    // Sets the pause between captured frames, this will override the configuration.
    pub fn frame_interval_ms(mut self, frame_interval_ms: u64) -> Self {
        self.configuration.frame_interval_ms = frame_interval_ms;
        self
    }

    pub fn backpressure(mut self, backpressure: Backpressure) -> Self {
        self.configuration.backpressure = backpressure;
        self
    }

    pub fn source(mut self, source: Box<dyn FrameSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn pipeline(mut self, pipeline: ProcessingPipeline) -> Self {
        self.pipeline = Some(pipeline);
        self
    }

    /// Starts capture and analysis; must run inside a tokio runtime.
    ///
    /// Without an explicit pipeline one is built from the configuration, and
    /// without an explicit source the frames directory is opened.
    pub fn build(self) -> Result<Coordinator, AppError> {
        let configuration = self.configuration;
        configuration.validate()?;

        let source = match (self.source, self.frames_dir) {
            (Some(source), _) => source,
            (None, Some(dir)) => Box::new(ImageFolderSource::open(
                &dir,
                Rotation::from_degrees(configuration.rotation_degrees)?,
                configuration.raw_yuv,
                configuration.loop_frames,
            )?),
            (None, None) => return Err(AppError::Intake("Frame source not set".to_string())),
        };
        let pipeline = match self.pipeline {
            Some(pipeline) => pipeline,
            None => ConfiguredPipelineFactory::new(&configuration).build()?,
        };
        Ok(Coordinator::new(configuration, source, pipeline))
    }
}
