use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use tokio::sync::mpsc::Receiver;
use tracing::{debug, info};
use uuid::Uuid;

use crate::app::readout::{MetricsDisplay, Readout};
use crate::coordinator::{AnalysisReport, SessionEvent};
use crate::error::AppError;
use crate::pipeline::domain::{Labels, OverlayPalette};

#[derive(Debug, Clone, Serialize)]
pub struct FrameSummary {
    pub sequence: u64,
    pub frame_id: Uuid,
    pub captured_at: DateTime<Utc>,
    pub forward_ms: u64,
    pub analysis_ms: u64,
    pub fps: Option<String>,
    pub moving_avg: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub predictions: Vec<crate::pipeline::Prediction>,
    /// Share of overlay pixels per highlighted class.
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub coverage: IndexMap<String, f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overlay_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionSummary {
    pub frames_analyzed: usize,
    pub average_forward_ms: Option<f32>,
    pub frames: Vec<FrameSummary>,
}

impl SessionSummary {
    pub fn write_json(&self, path: &Path) -> Result<(), AppError> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }
}

/// Owns the display state for one session.
pub struct Presenter {
    display: MetricsDisplay,
    output_dir: Option<PathBuf>,
    class_names: Labels,
    highlighted: Vec<usize>,
    summary: SessionSummary,
}

impl Presenter {
    pub fn new(moving_avg_period: usize, output_dir: Option<PathBuf>) -> Self {
        Self {
            display: MetricsDisplay::new(moving_avg_period),
            output_dir,
            class_names: Labels::pascal_voc(),
            highlighted: OverlayPalette::default().classes().collect(),
            summary: SessionSummary::default(),
        }
    }

    /// Consumes events until the stream closes; a failure ends the session with an error.
    pub async fn run(mut self, mut events: Receiver<SessionEvent>) -> Result<SessionSummary, AppError> {
        if let Some(dir) = &self.output_dir {
            tokio::fs::create_dir_all(dir).await?;
        }
        while let Some(event) = events.recv().await {
            self.handle(event).await?;
        }
        Ok(self.finish())
    }

    pub async fn handle(&mut self, event: SessionEvent) -> Result<Readout, AppError> {
        match event {
            SessionEvent::Analyzed(report) => self.present(report).await,
            SessionEvent::Failed(message) => Err(AppError::Pipeline(message)),
        }
    }

    pub fn finish(mut self) -> SessionSummary {
        self.summary.frames_analyzed = self.summary.frames.len();
        self.summary.average_forward_ms = self.display.average_ms();
        self.summary
    }

    async fn present(&mut self, report: AnalysisReport) -> Result<Readout, AppError> {
        let readout = self.display.apply(&report.analysis);
        info!(
            "frame {}: {} {} {}",
            report.sequence,
            readout.ms_text,
            readout.fps_text.as_deref().unwrap_or("-"),
            readout.avg_text.as_deref().unwrap_or("")
        );

        let mut coverage = IndexMap::new();
        let mut overlay_path = None;
        if let Some(mask) = report.analysis.mask() {
            for &class in &self.highlighted {
                let share = mask.coverage(class);
                if share > 0.0 {
                    coverage.insert(self.class_names.name(class), share);
                }
            }
            if let Some(dir) = &self.output_dir {
                let path = dir.join(format!("frame-{:05}.png", report.sequence));
                let overlay = mask.to_rgba_image();
                let target = path.clone();
                // PNG encoding and file writes stay off the async workers.
                tokio::task::spawn_blocking(move || overlay.save(&target))
                    .await
                    .map_err(|e| AppError::Pipeline(format!("overlay writer failed: {e}")))??;
                debug!("Wrote overlay {}", path.display());
                overlay_path = Some(path);
            }
        }

        let predictions = report.analysis.predictions().to_vec();
        for prediction in &predictions {
            info!("  {} {:.4}", prediction.label, prediction.score);
        }

        self.summary.frames.push(FrameSummary {
            sequence: report.sequence,
            frame_id: report.frame_id,
            captured_at: report.captured_at,
            forward_ms: readout.forward_ms,
            analysis_ms: report.analysis.analysis_duration().as_millis() as u64,
            fps: readout.fps_text.clone(),
            moving_avg: readout.avg_text.clone(),
            predictions,
            coverage,
            overlay_path,
        });
        Ok(readout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{Frame, FramePixels, Rotation};
    use crate::pipeline::domain::overlay::{argmax_overlay, ScoreGrid, PERSON};
    use crate::pipeline::{Analysis, AnalysisOutput, FrameMetrics, Prediction};
    use image::{Rgb, RgbImage};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn report(sequence: u64, output: AnalysisOutput) -> AnalysisReport {
        let frame = Arc::new(Frame::new(
            sequence,
            FramePixels::Rgb(RgbImage::from_pixel(2, 2, Rgb([0, 0, 0]))),
            Rotation::None,
        ));
        AnalysisReport {
            frame_id: frame.frame_id(),
            sequence,
            captured_at: frame.captured_at(),
            frame,
            analysis: Analysis::new(output, Duration::from_millis(20), Duration::from_millis(50)),
            metrics: FrameMetrics::new(),
        }
    }

    fn person_left_half() -> AnalysisOutput {
        // 21 classes over a 2x2 plane; person wins the left column.
        let mut scores = vec![0.0; 21 * 4];
        scores[PERSON * 4] = 1.0;
        scores[PERSON * 4 + 2] = 1.0;
        let grid = ScoreGrid::new(&scores, 21, 2, 2).unwrap();
        AnalysisOutput::Segmentation(argmax_overlay(&grid, &OverlayPalette::default()))
    }

    #[tokio::test]
    async fn writes_numbered_overlays() {
        let dir = tempfile::tempdir().unwrap();
        let mut presenter = Presenter::new(10, Some(dir.path().to_path_buf()));
        let readout = presenter
            .handle(SessionEvent::Analyzed(report(7, person_left_half())))
            .await
            .unwrap();
        assert_eq!(readout.ms_text, "20ms");
        assert_eq!(readout.fps_text.as_deref(), Some("20.0FPS"));

        let written = image::open(dir.path().join("frame-00007.png")).unwrap().to_rgba8();
        assert_eq!(written.get_pixel(0, 0).0, [255, 0, 0, 255]);
        assert_eq!(written.get_pixel(1, 0).0[3], 0);

        let summary = presenter.finish();
        assert_eq!(summary.frames_analyzed, 1);
        assert_eq!(summary.frames[0].coverage.get("person"), Some(&0.5));
    }

    #[tokio::test]
    async fn failure_event_is_an_error() {
        let mut presenter = Presenter::new(10, None);
        let err = presenter
            .handle(SessionEvent::Failed("module exploded".to_string()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("module exploded"));
    }

    #[tokio::test]
    async fn run_collects_a_summary() {
        let (tx, rx) = mpsc::channel(4);
        let predictions = vec![Prediction {
            class_index: 1,
            label: "dog".to_string(),
            score: 0.9,
        }];
        tx.send(SessionEvent::Analyzed(report(0, AnalysisOutput::Classification(predictions))))
            .await
            .unwrap();
        tx.send(SessionEvent::Analyzed(report(1, AnalysisOutput::Classification(vec![]))))
            .await
            .unwrap();
        drop(tx);

        let summary = Presenter::new(2, None).run(rx).await.unwrap();
        assert_eq!(summary.frames_analyzed, 2);
        assert_eq!(summary.average_forward_ms, Some(20.0));
        assert_eq!(summary.frames[0].predictions[0].label, "dog");
        assert_eq!(summary.frames[1].moving_avg.as_deref(), Some("avg:20ms"));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        summary.write_json(&path).unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["frames_analyzed"], 2);
    }

    #[tokio::test]
    async fn unwritable_output_dir_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("not-created");
        let mut presenter = Presenter::new(10, Some(missing));
        let result = presenter
            .handle(SessionEvent::Analyzed(report(1, person_left_half())))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn run_stops_at_the_first_failure() {
        let (tx, rx) = mpsc::channel(4);
        tx.send(SessionEvent::Failed("boom".to_string())).await.unwrap();
        drop(tx);
        assert!(Presenter::new(10, None).run(rx).await.is_err());
    }
}
