//! Frame Preprocessor
//!
//! Converts a raw camera frame into the model input tensor:
//! 1. Brightness probe over a 64x64 downsample (luma-weighted mean)
//! 2. Regime selection: dark / bright / normal enhancement parameters
//! 3. Resize to the square model input (blur applied during the draw)
//! 4. Gamma + CLAHE, or a 3x3 sharpen, depending on regime
//! 5. Interleaved RGBA -> planar NCHW float32 in [0,1], alpha dropped

pub mod enhance;

use camera_capture::VideoFrame;
use image::{imageops, ImageBuffer, Rgba};
use ndarray::Array4;
use thiserror::Error;
use tracing::debug;

pub use enhance::{apply_clahe, apply_gamma, apply_sharpen, luma_mean};

/// Side of the brightness-probe downsample
const PROBE_SIZE: u32 = 64;

/// Mean luma below which the dark regime is selected
const DARK_BRIGHTNESS: f32 = 60.0;

/// Mean luma above which the bright/backlit regime is selected
const BRIGHT_BRIGHTNESS: f32 = 180.0;

/// Preprocessing error types
#[derive(Error, Debug)]
pub enum PreprocessError {
    #[error("Degenerate frame: {0}")]
    DegenerateFrame(String),
}

/// Enhancement regime chosen from the brightness probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnhanceRegime {
    /// Tunnel / night: gamma 2.0, blur ~2px, CLAHE clip 3.0
    Dark,
    /// Backlit: gamma 0.6, blur ~1px, CLAHE clip 1.5
    Bright,
    /// Daylight: 3x3 sharpen only
    Normal,
}

impl EnhanceRegime {
    /// Select a regime from the probed mean brightness.
    pub fn from_brightness(b: f32) -> Self {
        if b < DARK_BRIGHTNESS {
            EnhanceRegime::Dark
        } else if b > BRIGHT_BRIGHTNESS {
            EnhanceRegime::Bright
        } else {
            EnhanceRegime::Normal
        }
    }

    /// (gamma, blur sigma, CLAHE clip factor); `None` entries mean "skip"
    fn params(&self) -> (Option<f32>, Option<f32>, Option<f32>) {
        match self {
            EnhanceRegime::Dark => (Some(2.0), Some(2.0), Some(3.0)),
            EnhanceRegime::Bright => (Some(0.6), Some(1.0), Some(1.5)),
            EnhanceRegime::Normal => (None, None, None),
        }
    }
}

/// Stateless per-frame preprocessing with reusable scratch buffers.
///
/// The scratch buffers only avoid reallocation; both the brightness probe and
/// the full-size resize are redrawn fresh on every call so no pixel data leaks
/// between frames.
pub struct Preprocessor {
    input_size: u32,
    /// RGBA scratch at input_size^2, rewritten each call
    pixels: Vec<u8>,
    /// Unmodified snapshot the sharpen kernel reads from
    sharpen_src: Vec<u8>,
}

impl Preprocessor {
    pub fn new(input_size: u32) -> Self {
        let cap = (input_size as usize) * (input_size as usize) * 4;
        Self {
            input_size,
            pixels: Vec::with_capacity(cap),
            sharpen_src: Vec::new(),
        }
    }

    pub fn input_size(&self) -> u32 {
        self.input_size
    }

    /// Preprocess one frame into a fresh `[1, 3, N, N]` tensor owned by the
    /// caller.
    pub fn run(&mut self, frame: &VideoFrame) -> Result<Array4<f32>, PreprocessError> {
        if frame.width == 0 || frame.height == 0 {
            return Err(PreprocessError::DegenerateFrame("zero-area frame".into()));
        }
        let expected = frame.pixel_count() * 4;
        if frame.data.len() != expected {
            return Err(PreprocessError::DegenerateFrame(format!(
                "buffer length {} does not match {}x{} RGBA",
                frame.data.len(),
                frame.width,
                frame.height
            )));
        }

        let src: ImageBuffer<Rgba<u8>, &[u8]> =
            ImageBuffer::from_raw(frame.width, frame.height, frame.data.as_slice()).ok_or_else(
                || PreprocessError::DegenerateFrame("failed to view frame as image".into()),
            )?;

        // Step 1: brightness probe on a small fresh downsample
        let probe = imageops::resize(&src, PROBE_SIZE, PROBE_SIZE, imageops::FilterType::Triangle);
        let brightness = luma_mean(probe.as_raw());

        // Step 2: regime selection
        let regime = EnhanceRegime::from_brightness(brightness);
        let (gamma, blur_sigma, clahe_clip) = regime.params();
        debug!(brightness, ?regime, "selected enhancement regime");

        // Step 3: resize to model input, blur folded into the draw when set
        let n = self.input_size;
        let mut resized = imageops::resize(&src, n, n, imageops::FilterType::Triangle);
        if let Some(sigma) = blur_sigma {
            resized = imageops::blur(&resized, sigma);
        }
        self.pixels.clear();
        self.pixels.extend_from_slice(resized.as_raw());

        // Step 4: pixel-level filters per regime
        if let Some(g) = gamma {
            apply_gamma(&mut self.pixels, g);
        }
        if let Some(clip) = clahe_clip {
            apply_clahe(&mut self.pixels, clip);
        }
        if regime == EnhanceRegime::Normal {
            self.sharpen_src.clear();
            self.sharpen_src.extend_from_slice(&self.pixels);
            apply_sharpen(&mut self.pixels, &self.sharpen_src, n as usize, n as usize);
        }

        // Step 5: interleaved RGBA -> planar NCHW float32, [0,1]
        let n = n as usize;
        let mut tensor = Array4::<f32>::zeros((1, 3, n, n));
        for (i, px) in self.pixels.chunks_exact(4).enumerate() {
            let (y, x) = (i / n, i % n);
            tensor[[0, 0, y, x]] = px[0] as f32 / 255.0;
            tensor[[0, 1, y, x]] = px[1] as f32 / 255.0;
            tensor[[0, 2, y, x]] = px[2] as f32 / 255.0;
        }

        Ok(tensor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camera_capture::VideoFrame;

    fn solid_frame(value: u8, width: u32, height: u32) -> VideoFrame {
        let mut data = Vec::with_capacity((width * height * 4) as usize);
        for _ in 0..width * height {
            data.extend_from_slice(&[value, value, value, 255]);
        }
        VideoFrame::from_rgba(data, width, height, 0, 0).unwrap()
    }

    #[test]
    fn test_regime_boundaries() {
        assert_eq!(EnhanceRegime::from_brightness(0.0), EnhanceRegime::Dark);
        assert_eq!(EnhanceRegime::from_brightness(59.9), EnhanceRegime::Dark);
        assert_eq!(EnhanceRegime::from_brightness(60.0), EnhanceRegime::Normal);
        assert_eq!(EnhanceRegime::from_brightness(180.0), EnhanceRegime::Normal);
        assert_eq!(EnhanceRegime::from_brightness(180.1), EnhanceRegime::Bright);
    }

    #[test]
    fn test_tensor_shape_and_range() {
        let mut pre = Preprocessor::new(64);
        let frame = solid_frame(128, 320, 240);
        let tensor = pre.run(&frame).unwrap();
        assert_eq!(tensor.shape(), &[1, 3, 64, 64]);
        for &v in tensor.iter() {
            assert!((0.0..=1.0).contains(&v));
        }
    }

    #[test]
    fn test_degenerate_frame_rejected() {
        let mut pre = Preprocessor::new(64);
        let mut frame = solid_frame(100, 4, 4);
        frame.width = 0;
        assert!(pre.run(&frame).is_err());

        let mut frame = solid_frame(100, 4, 4);
        frame.data.pop();
        assert!(pre.run(&frame).is_err());
    }

    #[test]
    fn test_scratch_reuse_is_fresh_per_frame() {
        let mut pre = Preprocessor::new(32);
        let bright = pre.run(&solid_frame(200, 64, 64)).unwrap();
        let dark = pre.run(&solid_frame(20, 64, 64)).unwrap();
        // Second frame must not inherit data from the first.
        assert!(dark[[0, 0, 16, 16]] < bright[[0, 0, 16, 16]]);
    }

    #[test]
    fn test_normal_regime_channel_layout() {
        // A mid-brightness frame with distinct channels: red plane must hold
        // the red channel, not an interleaved mix.
        let mut data = Vec::new();
        for _ in 0..64 * 64 {
            data.extend_from_slice(&[150, 100, 50, 255]);
        }
        let frame = VideoFrame::from_rgba(data, 64, 64, 0, 0).unwrap();
        let mut pre = Preprocessor::new(64);
        let tensor = pre.run(&frame).unwrap();
        // Sharpen leaves uniform interiors untouched.
        assert!((tensor[[0, 0, 32, 32]] - 150.0 / 255.0).abs() < 1e-4);
        assert!((tensor[[0, 1, 32, 32]] - 100.0 / 255.0).abs() < 1e-4);
        assert!((tensor[[0, 2, 32, 32]] - 50.0 / 255.0).abs() < 1e-4);
    }
}
