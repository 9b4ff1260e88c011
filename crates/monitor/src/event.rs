//! Alarm event payload and the sink seam to external consumers

use chrono::{DateTime, Utc};
use detector::Label;
use serde::{Deserialize, Serialize};
use smoothing::{AlarmState, WindowStats};

/// The single highest-confidence detection of the frame that tripped the
/// alarm (ties broken by first-seen order).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DominantDetection {
    pub label: Label,
    pub confidence: f32,
}

/// Dispatched to registered consumers when a non-normal state passes the
/// alarm cooldown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlarmEvent {
    pub alarm_state: AlarmState,
    pub dominant: DominantDetection,
    pub statistics: WindowStats,
    pub timestamp: DateTime<Utc>,
}

/// Narrow interface to the external alert collaborators (audio, voice,
/// backend logging, UI). Sinks must not block the detection loop.
pub trait AlarmSink: Send {
    fn name(&self) -> &'static str;

    fn on_alarm(&mut self, event: &AlarmEvent);
}
