pub mod camera;

pub use camera::{CameraFrame, CameraRenderer, FrameFormat};
