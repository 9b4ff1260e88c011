//! Frame source seam
//!
//! The real camera device is an external collaborator. The pipeline only
//! depends on this trait; tests and the demo binary use `SyntheticCamera`.

use crate::frame::VideoFrame;
use crate::{CameraConfig, CameraError};
use tracing::info;

/// A source of video frames.
///
/// Implementations must hand out frames in capture order. `release` must be
/// idempotent and stop the underlying device; a released source returns
/// `CameraError::Released` from `next_frame`.
pub trait FrameSource: Send {
    /// Capture the next frame.
    fn next_frame(&mut self) -> Result<VideoFrame, CameraError>;

    /// Stop capture and release the device.
    fn release(&mut self);
}

/// Test pattern for the synthetic camera
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntheticPattern {
    /// Every pixel the same gray value
    Solid(u8),
    /// Horizontal left-to-right luminance ramp
    Gradient,
}

/// Deterministic in-memory frame source used by tests and the demo binary.
pub struct SyntheticCamera {
    config: CameraConfig,
    pattern: SyntheticPattern,
    sequence: u32,
    released: bool,
}

impl SyntheticCamera {
    pub fn new(config: CameraConfig, pattern: SyntheticPattern) -> Self {
        info!(
            device = %config.device,
            width = config.width,
            height = config.height,
            "opening synthetic camera"
        );
        Self {
            config,
            pattern,
            sequence: 0,
            released: false,
        }
    }

    pub fn config(&self) -> &CameraConfig {
        &self.config
    }

    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl FrameSource for SyntheticCamera {
    fn next_frame(&mut self) -> Result<VideoFrame, CameraError> {
        if self.released {
            return Err(CameraError::Released);
        }

        let (w, h) = (self.config.width, self.config.height);
        let mut data = Vec::with_capacity((w * h * 4) as usize);
        for _y in 0..h {
            for x in 0..w {
                let v = match self.pattern {
                    SyntheticPattern::Solid(v) => v,
                    SyntheticPattern::Gradient => ((x * 255) / w.max(1)) as u8,
                };
                data.extend_from_slice(&[v, v, v, 255]);
            }
        }

        let seq = self.sequence;
        self.sequence = self.sequence.wrapping_add(1);
        let timestamp_ns = seq as u64 * 1_000_000_000 / self.config.fps.max(1) as u64;

        VideoFrame::from_rgba(data, w, h, timestamp_ns, seq)
            .ok_or_else(|| CameraError::Format("zero-area capture configuration".into()))
    }

    fn release(&mut self) {
        if !self.released {
            info!(device = %self.config.device, "releasing synthetic camera");
            self.released = true;
        }
    }
}
