//! Monitor configuration
//!
//! Loaded from an optional file plus `MONITOR_*` environment overrides;
//! every field has a default so an empty configuration is valid.

use crate::MonitorError;
use camera_capture::CameraConfig;
use serde::{Deserialize, Serialize};
use smoothing::SmoothingSettings;

/// Top-level configuration for the detection loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// ONNX model artifact path; unset runs the mock engine
    pub model_path: Option<String>,
    /// Square model input side (pixels)
    pub input_size: u32,
    /// Run inference on every Nth captured frame
    pub skip_frames: u32,
    /// Capture cadence in milliseconds (~30fps default)
    pub frame_interval_ms: u64,
    /// Minimum smoothing history window (frames); the engine widens it to
    /// span the longest configured look-back at the detection cadence
    pub window_size: usize,
    /// Camera capture profile
    pub camera: CameraConfig,
    /// Per-category alert thresholds and channel toggles
    pub settings: SmoothingSettings,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            model_path: None,
            input_size: 640,
            skip_frames: 10,
            frame_interval_ms: 33,
            window_size: 10,
            camera: CameraConfig::default(),
            settings: SmoothingSettings::default(),
        }
    }
}

impl MonitorConfig {
    /// Nominal time between processed (not merely captured) frames.
    pub fn detection_interval_ms(&self) -> u64 {
        self.frame_interval_ms * self.skip_frames.max(1) as u64
    }

    /// Load from an optional config file with `MONITOR_` env overrides.
    pub fn load(path: Option<&str>) -> Result<Self, MonitorError> {
        let mut builder = ::config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(::config::File::with_name(path));
        }
        builder = builder.add_source(
            ::config::Environment::with_prefix("MONITOR").separator("__"),
        );

        builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| MonitorError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = MonitorConfig::default();
        assert_eq!(cfg.input_size, 640);
        assert_eq!(cfg.skip_frames, 10);
        assert_eq!(cfg.camera.width, 640);
        assert_eq!(cfg.detection_interval_ms(), 330);
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let cfg = MonitorConfig::load(None).unwrap();
        assert_eq!(cfg.window_size, 10);
        assert!(cfg.model_path.is_none());
    }

    #[test]
    fn test_zero_skip_frames_does_not_zero_interval() {
        let cfg = MonitorConfig {
            skip_frames: 0,
            ..Default::default()
        };
        assert_eq!(cfg.detection_interval_ms(), 33);
    }
}
