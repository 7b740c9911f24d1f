use std::path::PathBuf;
use thiserror::Error;

// Main Application Error Type

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Failed to load module '{path}': {reason}")]
    ModuleLoad { path: PathBuf, reason: String },
    #[error("Frame conversion failed: {0}")]
    Preprocessing(String),
    #[error("Inference failed: {0}")]
    Inference(String),
    #[error("Frame source error: {0}")]
    Intake(String),
    #[error("Pipeline error: {0}")]
    Pipeline(String),
    #[error("Analysis timed out")]
    Timeout,
    #[error("Analysis halted after an earlier failure")]
    Halted,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl AppError {
    /// Recovers an `AppError` from the boxed error a tower stack hands back.
    pub fn from_boxed(err: tower::BoxError) -> Self {
        if err.is::<tower::timeout::error::Elapsed>() {
            return AppError::Timeout;
        }
        match err.downcast::<AppError>() {
            Ok(app_error) => *app_error,
            Err(other) => AppError::Pipeline(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boxed_app_error_round_trips() {
        let boxed: tower::BoxError = Box::new(AppError::Inference("bad shape".to_string()));
        match AppError::from_boxed(boxed) {
            AppError::Inference(msg) => assert_eq!(msg, "bad shape"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn elapsed_becomes_timeout() {
        let boxed: tower::BoxError = Box::new(tower::timeout::error::Elapsed::new());
        assert!(matches!(AppError::from_boxed(boxed), AppError::Timeout));
    }

    #[test]
    fn foreign_error_becomes_pipeline_error() {
        let boxed: tower::BoxError = "worker gone".into();
        assert!(matches!(AppError::from_boxed(boxed), AppError::Pipeline(_)));
    }
}
