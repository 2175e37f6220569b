#[cfg(feature = "camera-nokhwa")]
pub mod camera;
pub mod recognizer;
#[cfg(feature = "camera-nokhwa")]
pub mod rgba_converter;
pub mod skeleton;

use crate::{error::FrameError, types::Frame};

/// Blocking supplier of frames for the control loop.
pub trait FrameSource {
    fn read_frame(&mut self) -> Result<Frame, FrameError>;
}

// Re-exports for convenience
#[cfg(feature = "camera-nokhwa")]
pub use camera::{CameraSource, available_cameras};
pub use recognizer::{HandDetector, HandRecognizer, OrtEngine};
