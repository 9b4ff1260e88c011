//! Shipped alarm sinks
//!
//! Each sink reduces an `AlarmEvent` to the narrow payload its external
//! collaborator needs: a sound cue, a voice phrase key, or a serialized trip
//! record. Actual audio synthesis, TTS wording, and the backend client stay
//! outside this crate; they are injected as output callbacks.

use crate::event::{AlarmEvent, AlarmSink};
use chrono::{DateTime, Utc};
use detector::Label;
use serde::{Deserialize, Serialize};
use smoothing::AlarmState;
use tracing::{info, warn};
use uuid::Uuid;

/// Abstract audio cue, mapped from alarm severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SoundCue {
    /// Single beep
    Warning,
    /// Double beep
    Alert,
    /// Siren sweep
    Critical,
}

impl SoundCue {
    pub fn for_state(state: AlarmState) -> Option<Self> {
        match state {
            AlarmState::Normal => None,
            AlarmState::AlarmCaution => Some(SoundCue::Warning),
            AlarmState::AlarmWarning => Some(SoundCue::Alert),
            AlarmState::AlarmCritical => Some(SoundCue::Critical),
        }
    }
}

/// Plays a severity-mapped cue through the injected audio output.
pub struct SoundAlertSink {
    enabled: bool,
    output: Box<dyn FnMut(SoundCue) + Send>,
}

impl SoundAlertSink {
    pub fn new(enabled: bool, output: Box<dyn FnMut(SoundCue) + Send>) -> Self {
        Self { enabled, output }
    }
}

impl AlarmSink for SoundAlertSink {
    fn name(&self) -> &'static str {
        "sound"
    }

    fn on_alarm(&mut self, event: &AlarmEvent) {
        if !self.enabled {
            return;
        }
        if let Some(cue) = SoundCue::for_state(event.alarm_state) {
            (self.output)(cue);
        }
    }
}

/// Stable phrase key for the voice collaborator; the spoken wording lives
/// with the TTS service, not here.
pub fn phrase_key(label: Label) -> &'static str {
    match label {
        Label::Awake => "awake",
        Label::Distracted => "distracted",
        Label::Drowsy => "drowsy",
        Label::HeadDrop => "head_drop",
        Label::Phone => "phone",
        Label::Smoking => "smoking",
        Label::Yawn => "yawn",
    }
}

/// Hands a phrase key plus severity to the injected voice output.
pub struct VoiceAlertSink {
    enabled: bool,
    output: Box<dyn FnMut(&'static str, AlarmState) + Send>,
}

impl VoiceAlertSink {
    pub fn new(enabled: bool, output: Box<dyn FnMut(&'static str, AlarmState) + Send>) -> Self {
        Self { enabled, output }
    }
}

impl AlarmSink for VoiceAlertSink {
    fn name(&self) -> &'static str {
        "voice"
    }

    fn on_alarm(&mut self, event: &AlarmEvent) {
        if !self.enabled {
            return;
        }
        (self.output)(phrase_key(event.dominant.label), event.alarm_state);
    }
}

/// Persisted detection event, one row per dispatched alarm.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripEventRecord {
    pub session_id: Uuid,
    pub event_type: String,
    pub confidence: f32,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gps_location: Option<(f64, f64)>,
    pub alarm_state: String,
}

/// Serializes trip records and hands the JSON to the injected writer
/// (the backend trip API client in production, a buffer in tests).
pub struct TripLogSink {
    session_id: Uuid,
    gps: Box<dyn Fn() -> Option<(f64, f64)> + Send + Sync>,
    writer: Box<dyn FnMut(String) + Send>,
}

impl TripLogSink {
    pub fn new(
        gps: Box<dyn Fn() -> Option<(f64, f64)> + Send + Sync>,
        writer: Box<dyn FnMut(String) + Send>,
    ) -> Self {
        let session_id = Uuid::new_v4();
        info!(%session_id, "starting trip log session");
        Self {
            session_id,
            gps,
            writer,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }
}

impl AlarmSink for TripLogSink {
    fn name(&self) -> &'static str {
        "trip-log"
    }

    fn on_alarm(&mut self, event: &AlarmEvent) {
        let record = TripEventRecord {
            session_id: self.session_id,
            event_type: event.dominant.label.as_str().to_string(),
            confidence: event.dominant.confidence,
            timestamp: event.timestamp,
            gps_location: (self.gps)(),
            alarm_state: event.alarm_state.as_str().to_string(),
        };
        match serde_json::to_string(&record) {
            Ok(json) => (self.writer)(json),
            Err(e) => warn!("failed to serialize trip record: {}", e),
        }
    }
}
