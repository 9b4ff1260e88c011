//! Camera Capture Library for Driver Monitoring
//!
//! Provides the video frame types consumed by the detection pipeline and the
//! `FrameSource` seam behind which the actual camera hardware lives.
//! The default capture profile is a single cabin camera at 640x480, <=30fps.

pub mod frame;
pub mod source;

pub use frame::VideoFrame;
pub use source::{FrameSource, SyntheticCamera, SyntheticPattern};

use thiserror::Error;

/// Camera error types
#[derive(Error, Debug)]
pub enum CameraError {
    #[error("Failed to open camera: {0}")]
    Open(String),

    #[error("Invalid format: {0}")]
    Format(String),

    #[error("Streaming error: {0}")]
    Stream(String),

    #[error("Capture timeout")]
    Timeout,

    #[error("Camera released")]
    Released,
}

/// Camera configuration
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Device identifier (e.g. "/dev/video0")
    pub device: String,
    /// Capture width
    pub width: u32,
    /// Capture height
    pub height: u32,
    /// Target FPS (capped at 30)
    pub fps: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device: "/dev/video0".to_string(),
            width: 640,
            height: 480,
            fps: 30,
        }
    }
}
