pub mod capture_client;
pub mod frame_source;

pub use capture_client::{Backpressure, CaptureClient, CaptureItem, CaptureStats};
pub use frame_source::{FrameSource, ImageFolderSource, RawYuvDimensions};
