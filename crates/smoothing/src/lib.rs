//! Smoothing Decision Engine
//!
//! Converts the noisy stream of per-frame dominant labels into a stable,
//! cooldown-gated alarm state. Each hazard category looks back over its own
//! duration-in-seconds slice of a shared bounded history, so decisions stay
//! robust to detector frame-rate variation: eye closure reacts fastest,
//! yawning accumulates over a long window.

mod engine;
mod settings;

pub use engine::{SmoothingEngine, WindowStats, ALARM_COOLDOWN_MS};
pub use settings::SmoothingSettings;

use serde::{Deserialize, Serialize};

/// Discrete alarm severity, ordered.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub enum AlarmState {
    #[default]
    Normal,
    AlarmCaution,
    AlarmWarning,
    AlarmCritical,
}

impl AlarmState {
    /// Wire name used in event payloads and trip records
    pub fn as_str(&self) -> &'static str {
        match self {
            AlarmState::Normal => "NORMAL",
            AlarmState::AlarmCaution => "ALARM_CAUTION",
            AlarmState::AlarmWarning => "ALARM_WARNING",
            AlarmState::AlarmCritical => "ALARM_CRITICAL",
        }
    }
}

impl std::fmt::Display for AlarmState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
