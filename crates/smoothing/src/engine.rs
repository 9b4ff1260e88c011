//! Sliding-window decision engine with per-category duration look-backs

use crate::settings::SmoothingSettings;
use crate::AlarmState;
use detector::label::ALL_LABELS;
use detector::Label;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::time::{Duration, Instant};
use tracing::debug;

/// Minimum time between two dispatched alarm side effects, independent of
/// how often the state is re-evaluated.
pub const ALARM_COOLDOWN_MS: u64 = 3000;

/// Density required for a critical category (drowsy, head drop)
const CRITICAL_DENSITY: f32 = 0.75;

/// Density required for a warning category (phone, distracted, smoking)
const WARNING_DENSITY: f32 = 0.60;

/// Fixed look-back for the smoking check (seconds)
const SMOKING_LOOKBACK_SECS: f32 = 3.0;

/// Fixed look-back for the cumulative yawn count (seconds)
const YAWN_LOOKBACK_SECS: f32 = 15.0;

/// Read-only snapshot over the entire history window, for display only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowStats {
    pub window_size: usize,
    pub current_frames: usize,
    pub counts: BTreeMap<String, u32>,
    pub percentages: BTreeMap<String, f32>,
    pub alarm_state: AlarmState,
}

/// Converts per-frame dominant labels into an alarm state.
///
/// Single-writer by construction: the detection loop is the only mutator, so
/// no locking is needed, only call ordering.
pub struct SmoothingEngine {
    window_size: usize,
    history: VecDeque<Label>,
    settings: SmoothingSettings,
    detection_interval_ms: u64,
    alarm_state: AlarmState,
    last_alarm_time: Option<Instant>,
}

impl SmoothingEngine {
    /// `window_size` is a lower bound: the window is widened to hold the
    /// longest configured look-back at the given cadence, so a short window
    /// can never silently truncate the 15 s yawn check.
    pub fn new(window_size: usize, detection_interval_ms: u64, settings: SmoothingSettings) -> Self {
        let detection_interval_ms = detection_interval_ms.max(1);
        let window_size = window_size
            .max(Self::required_frames(detection_interval_ms, &settings))
            .max(1);
        Self {
            window_size,
            history: VecDeque::with_capacity(window_size),
            settings,
            detection_interval_ms,
            alarm_state: AlarmState::Normal,
            last_alarm_time: None,
        }
    }

    /// Frames needed to span the longest look-back among the per-category
    /// durations and the fixed smoking/yawn windows.
    fn required_frames(detection_interval_ms: u64, settings: &SmoothingSettings) -> usize {
        let interval_secs = detection_interval_ms as f32 / 1000.0;
        let longest = [
            settings.eye_closure_duration,
            settings.head_drop_duration,
            settings.phone_usage_duration,
            settings.distraction_duration,
            SMOKING_LOOKBACK_SECS,
            YAWN_LOOKBACK_SECS,
        ]
        .into_iter()
        .fold(0.0f32, f32::max);
        (longest / interval_secs).ceil() as usize
    }

    /// Replace the settings between decision cycles. Longer durations widen
    /// the window; it never shrinks while running.
    pub fn update_settings(&mut self, settings: SmoothingSettings) {
        self.window_size = self
            .window_size
            .max(Self::required_frames(self.detection_interval_ms, &settings));
        self.settings = settings;
    }

    /// Effective window capacity in frames.
    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn settings(&self) -> &SmoothingSettings {
        &self.settings
    }

    pub fn alarm_state(&self) -> AlarmState {
        self.alarm_state
    }

    /// Ingest one per-frame dominant label and recompute the alarm state.
    pub fn add_detection(&mut self, label: Label) -> AlarmState {
        self.history.push_back(label);
        if self.history.len() > self.window_size {
            self.history.pop_front();
        }

        let state = self.evaluate();
        if state != self.alarm_state {
            debug!(from = %self.alarm_state, to = %state, "alarm state transition");
        }
        self.alarm_state = state;
        state
    }

    /// Category checks in fixed priority order; the first match wins so a
    /// simultaneously satisfied lower-severity check can never mask a
    /// critical one.
    fn evaluate(&self) -> AlarmState {
        if self.history.is_empty() {
            return AlarmState::Normal;
        }

        if self.density(Label::Drowsy, self.settings.eye_closure_duration) >= CRITICAL_DENSITY {
            return AlarmState::AlarmCritical;
        }
        if self.density(Label::HeadDrop, self.settings.head_drop_duration) >= CRITICAL_DENSITY {
            return AlarmState::AlarmCritical;
        }
        if self.density(Label::Phone, self.settings.phone_usage_duration) >= WARNING_DENSITY {
            return AlarmState::AlarmWarning;
        }
        if self.density(Label::Distracted, self.settings.distraction_duration) >= WARNING_DENSITY {
            return AlarmState::AlarmWarning;
        }
        if self.density(Label::Smoking, SMOKING_LOOKBACK_SECS) >= WARNING_DENSITY {
            return AlarmState::AlarmWarning;
        }
        if self.recent_count(Label::Yawn, YAWN_LOOKBACK_SECS) >= self.settings.yawn_threshold {
            return AlarmState::AlarmCaution;
        }

        AlarmState::Normal
    }

    /// Convert a duration in seconds to a frame count at the nominal
    /// detection cadence, at least 1, capped at the window capacity.
    fn frames_to_look_back(&self, seconds: f32) -> usize {
        let interval_secs = self.detection_interval_ms as f32 / 1000.0;
        let frames = (seconds / interval_secs).ceil() as usize;
        frames.max(1).min(self.window_size)
    }

    /// Fraction of the category's look-back sub-window holding `label`.
    ///
    /// A density check only fires once the history actually spans the full
    /// sub-window; before that a handful of flickering frames would dominate
    /// the ratio, which is exactly what smoothing is meant to prevent.
    fn density(&self, label: Label, seconds: f32) -> f32 {
        let frames = self.frames_to_look_back(seconds);
        if self.history.len() < frames {
            return 0.0;
        }
        let hits = self
            .history
            .iter()
            .rev()
            .take(frames)
            .filter(|&&l| l == label)
            .count();
        hits as f32 / frames as f32
    }

    /// Raw occurrence count of `label` in the look-back sub-window. Unlike
    /// density, partial history counts: the total can only grow as the
    /// window fills.
    fn recent_count(&self, label: Label, seconds: f32) -> u32 {
        let frames = self.frames_to_look_back(seconds);
        self.history
            .iter()
            .rev()
            .take(frames)
            .filter(|&&l| l == label)
            .count() as u32
    }

    /// Rate-limits outward side effects. Returns true (and arms the
    /// cooldown) only when the state is non-normal and the global cooldown
    /// has elapsed.
    pub fn should_trigger_alarm(&mut self) -> bool {
        self.should_trigger_alarm_at(Instant::now())
    }

    /// Time-parameterized variant; the public method passes `Instant::now()`.
    pub fn should_trigger_alarm_at(&mut self, now: Instant) -> bool {
        if self.alarm_state == AlarmState::Normal {
            return false;
        }
        let cooled_down = match self.last_alarm_time {
            None => true,
            Some(last) => now.duration_since(last) >= Duration::from_millis(ALARM_COOLDOWN_MS),
        };
        if cooled_down {
            self.last_alarm_time = Some(now);
        }
        cooled_down
    }

    /// Whole-window snapshot for UI display. Not used for decisions, which
    /// run on per-category sub-windows.
    pub fn statistics(&self) -> WindowStats {
        let total = self.history.len();
        let mut counts = BTreeMap::new();
        let mut percentages = BTreeMap::new();
        for label in ALL_LABELS {
            let n = self.history.iter().filter(|&&l| l == label).count() as u32;
            counts.insert(label.as_str().to_string(), n);
            let pct = if total > 0 {
                n as f32 / total as f32 * 100.0
            } else {
                0.0
            };
            percentages.insert(label.as_str().to_string(), pct);
        }
        WindowStats {
            window_size: self.window_size,
            current_frames: total,
            counts,
            percentages,
            alarm_state: self.alarm_state,
        }
    }

    /// Clear history and return to normal. Cooldown timestamps survive so a
    /// reset cannot be used to bypass alarm rate limiting.
    pub fn reset(&mut self) {
        self.history.clear();
        self.alarm_state = AlarmState::Normal;
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Oldest-first copy of the current window (tests and diagnostics).
    pub fn history_snapshot(&self) -> Vec<Label> {
        self.history.iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn engine(window: usize, interval_ms: u64) -> SmoothingEngine {
        SmoothingEngine::new(window, interval_ms, SmoothingSettings::default())
    }

    #[test]
    fn test_empty_history_is_normal() {
        let eng = engine(10, 500);
        assert_eq!(eng.alarm_state(), AlarmState::Normal);
        assert_eq!(eng.statistics().current_frames, 0);
    }

    /// Twenty consecutive drowsy labels with a 3 s eye-closure look-back at
    /// 500 ms cadence (6 frames) go critical at frame 6 and stay there.
    #[test]
    fn test_sustained_drowsy_goes_critical() {
        let mut eng = engine(10, 500);
        for i in 1..=20 {
            let state = eng.add_detection(Label::Drowsy);
            if i < 6 {
                assert_eq!(state, AlarmState::Normal, "frame {}", i);
            } else {
                assert_eq!(state, AlarmState::AlarmCritical, "frame {}", i);
            }
        }
    }

    /// The caution fires exactly when the 3rd yawn enters the 15 s window.
    #[test]
    fn test_yawn_count_triggers_caution() {
        let mut eng = SmoothingEngine::new(
            32,
            1000,
            SmoothingSettings {
                yawn_threshold: 3,
                ..Default::default()
            },
        );
        assert_eq!(eng.add_detection(Label::Yawn), AlarmState::Normal);
        for _ in 0..4 {
            assert_eq!(eng.add_detection(Label::Awake), AlarmState::Normal);
        }
        assert_eq!(eng.add_detection(Label::Yawn), AlarmState::Normal);
        for _ in 0..4 {
            assert_eq!(eng.add_detection(Label::Awake), AlarmState::Normal);
        }
        assert_eq!(eng.add_detection(Label::Yawn), AlarmState::AlarmCaution);
    }

    /// A 50% phone density stays below the 60% warning threshold.
    #[test]
    fn test_alternating_phone_stays_normal() {
        let mut eng = engine(20, 500);
        for i in 0..40 {
            let label = if i % 2 == 0 { Label::Phone } else { Label::Awake };
            assert_eq!(eng.add_detection(label), AlarmState::Normal, "frame {}", i);
        }
    }

    /// Critical checks strictly precede warning checks.
    #[test]
    fn test_critical_outranks_warning() {
        // Fill with phone (warning), then a drowsy burst that satisfies the
        // critical check while phone density stays above its threshold.
        let mut eng = SmoothingEngine::new(
            10,
            1000,
            SmoothingSettings {
                phone_usage_duration: 6.0,
                ..Default::default()
            },
        );
        for _ in 0..6 {
            eng.add_detection(Label::Phone);
        }
        assert_eq!(eng.alarm_state(), AlarmState::AlarmWarning);
        // Phone density over its 6-frame window stays >= 60% while the last
        // 3 frames go fully drowsy.
        eng.add_detection(Label::Drowsy);
        eng.add_detection(Label::Drowsy);
        let state = eng.add_detection(Label::Drowsy);
        assert_eq!(state, AlarmState::AlarmCritical);
    }

    #[test]
    fn test_head_drop_is_critical() {
        let mut eng = engine(10, 1000);
        for _ in 0..3 {
            eng.add_detection(Label::HeadDrop);
        }
        assert_eq!(eng.alarm_state(), AlarmState::AlarmCritical);
    }

    #[test]
    fn test_smoking_fixed_window_warning() {
        let mut eng = engine(10, 1000);
        for _ in 0..3 {
            eng.add_detection(Label::Smoking);
        }
        assert_eq!(eng.alarm_state(), AlarmState::AlarmWarning);
    }

    #[test]
    fn test_distraction_warning_and_recovery() {
        let mut eng = engine(10, 1000);
        for _ in 0..3 {
            eng.add_detection(Label::Distracted);
        }
        assert_eq!(eng.alarm_state(), AlarmState::AlarmWarning);
        for _ in 0..10 {
            eng.add_detection(Label::Awake);
        }
        assert_eq!(eng.alarm_state(), AlarmState::Normal);
    }

    /// The global cooldown gates repeated triggers.
    #[test]
    fn test_cooldown_gating() {
        let mut eng = engine(10, 1000);
        for _ in 0..3 {
            eng.add_detection(Label::Drowsy);
        }
        assert_eq!(eng.alarm_state(), AlarmState::AlarmCritical);

        let t0 = Instant::now();
        assert!(eng.should_trigger_alarm_at(t0));
        assert!(!eng.should_trigger_alarm_at(t0 + Duration::from_millis(1000)));
        assert!(!eng.should_trigger_alarm_at(t0 + Duration::from_millis(2999)));
        assert!(eng.should_trigger_alarm_at(t0 + Duration::from_millis(3000)));
    }

    #[test]
    fn test_normal_state_never_triggers() {
        let mut eng = engine(10, 1000);
        eng.add_detection(Label::Awake);
        assert!(!eng.should_trigger_alarm_at(Instant::now()));
    }

    #[test]
    fn test_reset_clears_history_but_keeps_cooldown() {
        let mut eng = engine(10, 1000);
        for _ in 0..3 {
            eng.add_detection(Label::Drowsy);
        }
        let t0 = Instant::now();
        assert!(eng.should_trigger_alarm_at(t0));

        eng.reset();
        assert_eq!(eng.alarm_state(), AlarmState::Normal);
        assert_eq!(eng.history_len(), 0);

        // Immediately re-trip the alarm; the pre-reset cooldown still gates.
        for _ in 0..3 {
            eng.add_detection(Label::Drowsy);
        }
        assert!(!eng.should_trigger_alarm_at(t0 + Duration::from_millis(100)));
    }

    #[test]
    fn test_statistics_snapshot() {
        let mut eng = engine(10, 500);
        eng.add_detection(Label::Drowsy);
        eng.add_detection(Label::Awake);
        eng.add_detection(Label::Awake);
        eng.add_detection(Label::Yawn);

        let stats = eng.statistics();
        // The requested window of 10 is widened to hold the 15 s yawn
        // look-back at 500 ms cadence.
        assert_eq!(stats.window_size, 30);
        assert_eq!(stats.current_frames, 4);
        assert_eq!(stats.counts["awake"], 2);
        assert_eq!(stats.counts["drowsy"], 1);
        assert_eq!(stats.counts["head drop"], 0);
        assert!((stats.percentages["awake"] - 50.0).abs() < 1e-3);
    }

    #[test]
    fn test_minimum_lookback_is_one_frame() {
        // A duration shorter than one interval still inspects one frame.
        let mut eng = SmoothingEngine::new(
            10,
            1000,
            SmoothingSettings {
                eye_closure_duration: 0.1,
                ..Default::default()
            },
        );
        assert_eq!(eng.add_detection(Label::Drowsy), AlarmState::AlarmCritical);
    }

    /// A small configured window cannot truncate the 15 s yawn look-back:
    /// at the stock 330 ms processed-frame cadence, three yawns spaced 20
    /// frames apart still raise the caution on the third.
    #[test]
    fn test_small_window_cannot_truncate_yawn_lookback() {
        let mut eng = engine(10, 330);
        assert!(eng.window_size() >= 46);
        for i in 0..=40 {
            let label = if i % 20 == 0 { Label::Yawn } else { Label::Awake };
            let state = eng.add_detection(label);
            if i < 40 {
                assert_eq!(state, AlarmState::Normal, "frame {}", i);
            } else {
                assert_eq!(state, AlarmState::AlarmCaution, "frame {}", i);
            }
        }
    }

    fn label_strategy() -> impl Strategy<Value = Label> {
        prop::sample::select(ALL_LABELS.to_vec())
    }

    proptest! {
        /// The history never exceeds the effective window capacity.
        #[test]
        fn prop_history_bounded(labels in prop::collection::vec(label_strategy(), 0..200), window in 1usize..40) {
            let mut eng = SmoothingEngine::new(window, 500, SmoothingSettings::default());
            let cap = eng.window_size();
            prop_assert!(cap >= window);
            for label in labels {
                eng.add_detection(label);
                prop_assert!(eng.history_len() <= cap);
            }
        }

        /// Eviction is FIFO; after n > capacity pushes the window holds the
        /// last `cap` labels in insertion order.
        #[test]
        fn prop_fifo_eviction(labels in prop::collection::vec(label_strategy(), 1..200), window in 1usize..40) {
            let mut eng = SmoothingEngine::new(window, 500, SmoothingSettings::default());
            let cap = eng.window_size();
            for &label in &labels {
                eng.add_detection(label);
            }
            let expected: Vec<Label> = labels
                .iter()
                .copied()
                .skip(labels.len().saturating_sub(cap))
                .collect();
            prop_assert_eq!(eng.history_snapshot(), expected);
        }
    }
}
