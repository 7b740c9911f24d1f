pub mod app;
pub mod catalog;
pub mod common;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod intake;
pub mod pipeline;
pub mod runtime;

pub use config::{AnalysisMode, Configuration};
pub use coordinator::{Coordinator, CoordinatorBuilder, SessionEvent};
pub use error::AppError;
