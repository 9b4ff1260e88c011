//! Per-category alert thresholds and channel toggles

use serde::{Deserialize, Serialize};

/// Externally supplied alert configuration. Treated as immutable within one
/// decision cycle; replaced wholesale via `SmoothingEngine::update_settings`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingSettings {
    /// Yawn count within the fixed 15 s window that triggers a caution
    pub yawn_threshold: u32,
    /// Seconds of sustained phone use before a warning
    pub phone_usage_duration: f32,
    /// Seconds of sustained distraction before a warning
    pub distraction_duration: f32,
    /// Seconds of sustained head drop before a critical alarm
    pub head_drop_duration: f32,
    /// Seconds of sustained eye closure before a critical alarm
    pub eye_closure_duration: f32,
    /// Alert channel toggles, consumed by the alert sinks
    pub enable_voice_alert: bool,
    pub enable_sound_alert: bool,
    pub enable_emergency_contact: bool,
}

impl Default for SmoothingSettings {
    fn default() -> Self {
        Self {
            yawn_threshold: 3,
            phone_usage_duration: 5.0,
            distraction_duration: 3.0,
            head_drop_duration: 3.0,
            eye_closure_duration: 3.0,
            enable_voice_alert: true,
            enable_sound_alert: true,
            enable_emergency_contact: true,
        }
    }
}
