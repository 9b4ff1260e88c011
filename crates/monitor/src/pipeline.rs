//! The detection loop

use crate::config::MonitorConfig;
use crate::event::{AlarmEvent, AlarmSink, DominantDetection};
use crate::MonitorError;
use camera_capture::{FrameSource, VideoFrame};
use detector::{Detection, DetectorError, InferenceEngine};
use smoothing::SmoothingEngine;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

/// Loop lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Running,
    Stopped,
}

/// Seam between the loop and the inference engine, so the loop is testable
/// with a scripted detector.
pub trait FrameDetector: Send {
    /// Load the model if not already loaded. Idempotent.
    fn ensure_loaded(&mut self) -> Result<(), DetectorError>;

    /// One inference pass; must fail closed (empty list, never panic).
    fn detect(&mut self, frame: &VideoFrame) -> Vec<Detection>;
}

impl FrameDetector for InferenceEngine {
    fn ensure_loaded(&mut self) -> Result<(), DetectorError> {
        self.load().map(|_| ())
    }

    fn detect(&mut self, frame: &VideoFrame) -> Vec<Detection> {
        InferenceEngine::detect(self, frame)
    }
}

/// Cancellation handle; cloneable, checked before each tick.
#[derive(Clone)]
pub struct LoopHandle {
    stop: Arc<AtomicBool>,
}

impl LoopHandle {
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

/// The single highest-confidence detection; ties broken by first-seen order.
pub fn dominant_detection(detections: &[Detection]) -> Option<&Detection> {
    let mut best: Option<&Detection> = None;
    for det in detections {
        match best {
            Some(b) if det.confidence <= b.confidence => {}
            _ => best = Some(det),
        }
    }
    best
}

/// Orchestrates capture -> inference -> smoothing -> alarm dispatch on a
/// single logical thread. Inference runs synchronously between interval
/// ticks, so at most one pass is in flight per loop instance.
pub struct DetectionLoop<D: FrameDetector> {
    config: MonitorConfig,
    detector: D,
    smoothing: SmoothingEngine,
    sinks: Vec<Box<dyn AlarmSink>>,
    state: LoopState,
    stop: Arc<AtomicBool>,
}

impl<D: FrameDetector> DetectionLoop<D> {
    pub fn new(config: MonitorConfig, detector: D, sinks: Vec<Box<dyn AlarmSink>>) -> Self {
        let smoothing = SmoothingEngine::new(
            config.window_size,
            config.detection_interval_ms(),
            config.settings.clone(),
        );
        Self {
            config,
            detector,
            smoothing,
            sinks,
            state: LoopState::Idle,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn handle(&self) -> LoopHandle {
        LoopHandle {
            stop: Arc::clone(&self.stop),
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Run until stopped or the stream fails. The frame source is released
    /// on every exit path, including load failures before the first frame.
    pub async fn run(&mut self, mut source: Box<dyn FrameSource>) -> Result<(), MonitorError> {
        if let Err(e) = self.detector.ensure_loaded() {
            source.release();
            self.state = LoopState::Stopped;
            return Err(MonitorError::ModelLoad(e.to_string()));
        }

        self.state = LoopState::Running;
        info!(
            skip_frames = self.config.skip_frames,
            interval_ms = self.config.frame_interval_ms,
            "detection loop started"
        );

        let mut interval =
            tokio::time::interval(std::time::Duration::from_millis(self.config.frame_interval_ms));
        // A slow inference call makes the loop skip capture ticks instead of
        // queuing them.
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut frame_count: u64 = 0;
        let mut processed: u64 = 0;
        let mut dispatched: u64 = 0;
        let skip = self.config.skip_frames.max(1) as u64;

        let result = loop {
            if self.stop.load(Ordering::Relaxed) {
                break Ok(());
            }
            interval.tick().await;
            if self.stop.load(Ordering::Relaxed) {
                break Ok(());
            }

            let frame = match source.next_frame() {
                Ok(frame) => frame,
                Err(e) => {
                    error!("camera stream failed: {}", e);
                    break Err(MonitorError::Camera(e.to_string()));
                }
            };

            frame_count += 1;
            if frame_count % skip != 0 {
                continue;
            }

            // Inference runs synchronously on this task, so a second pass
            // cannot start while one is in flight; a slow pass surfaces as
            // skipped capture ticks, never as queued overlapping work.
            let detections = self.detector.detect(&frame);
            processed += 1;

            if self.stop.load(Ordering::Relaxed) {
                // Stop raced an in-flight inference; discard its result.
                break Ok(());
            }

            let Some(dominant) = dominant_detection(&detections) else {
                continue;
            };
            let dominant = DominantDetection {
                label: dominant.label,
                confidence: dominant.confidence,
            };

            let alarm_state = self.smoothing.add_detection(dominant.label);
            if self.smoothing.should_trigger_alarm() {
                let event = AlarmEvent {
                    alarm_state,
                    dominant,
                    statistics: self.smoothing.statistics(),
                    timestamp: chrono::Utc::now(),
                };
                dispatched += 1;
                warn!(state = %alarm_state, label = %event.dominant.label, "alarm dispatched");
                for sink in &mut self.sinks {
                    sink.on_alarm(&event);
                }
            }
        };

        source.release();
        self.state = LoopState::Stopped;
        info!(frame_count, processed, dispatched, "detection loop stopped");
        result
    }
}
