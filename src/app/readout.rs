use std::collections::VecDeque;
use std::time::Duration;

use crate::pipeline::Analysis;

pub const MOVING_AVG_PERIOD: usize = 10;

/// Fixed-capacity FIFO of the latest latency samples with a running sum.
#[derive(Debug, Clone)]
pub struct MovingAverage {
    period: usize,
    samples: VecDeque<u64>,
    sum: u64,
}

impl MovingAverage {
    pub fn new(period: usize) -> Self {
        let period = period.max(1);
        Self {
            period,
            samples: VecDeque::with_capacity(period + 1),
            sum: 0,
        }
    }

    pub fn push(&mut self, sample: u64) {
        self.sum += sample;
        self.samples.push_back(sample);
        if self.samples.len() > self.period {
            if let Some(oldest) = self.samples.pop_front() {
                self.sum -= oldest;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Average of the last `period` samples; `None` until the window is full.
    pub fn average(&self) -> Option<f32> {
        (self.samples.len() == self.period).then(|| self.sum as f32 / self.period as f32)
    }
}

impl Default for MovingAverage {
    fn default() -> Self {
        Self::new(MOVING_AVG_PERIOD)
    }
}

/// Text shown for one analyzed frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Readout {
    pub forward_ms: u64,
    pub ms_text: String,
    pub fps_text: Option<String>,
    pub avg_text: Option<String>,
}

/// Turns per-frame timings into latency, FPS and moving-average text.
#[derive(Debug, Clone, Default)]
pub struct MetricsDisplay {
    moving_avg: MovingAverage,
}

impl MetricsDisplay {
    pub fn new(period: usize) -> Self {
        Self {
            moving_avg: MovingAverage::new(period),
        }
    }

    pub fn apply(&mut self, analysis: &Analysis) -> Readout {
        let forward_ms = analysis.module_forward_duration().as_millis() as u64;
        self.moving_avg.push(forward_ms);

        Readout {
            forward_ms,
            ms_text: format!("{forward_ms}ms"),
            fps_text: frames_per_second(analysis.analysis_duration()).map(|fps| format!("{fps:.1}FPS")),
            avg_text: self.moving_avg.average().map(|avg| format!("avg:{avg:.0}ms")),
        }
    }

    pub fn average_ms(&self) -> Option<f32> {
        self.moving_avg.average()
    }
}

/// `1000 / analysis_ms` over whole milliseconds; nothing below one millisecond.
pub fn frames_per_second(analysis_duration: Duration) -> Option<f32> {
    let millis = analysis_duration.as_millis();
    (millis > 0).then(|| 1000.0 / millis as f32)
}
