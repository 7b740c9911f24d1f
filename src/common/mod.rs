pub mod frame;
pub mod yuv;

pub use frame::{Frame, FramePixels, Rotation};
pub use yuv::{Yuv420Image, YuvPlane};
