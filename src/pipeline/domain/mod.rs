pub mod analysis;
pub mod labels;
pub mod overlay;
pub mod topk;

pub use analysis::{Analysis, AnalysisOutput, Prediction};
pub use labels::Labels;
pub use overlay::{argmax_overlay, OverlayPalette, ScoreGrid, SegmentationMask};
pub use topk::top_k;
