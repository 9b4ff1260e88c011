//! Detection Loop Orchestrator
//!
//! Runs the inference engine at a fixed frame cadence, feeds the dominant
//! per-frame label into the smoothing engine, and dispatches cooldown-gated
//! alarm events to the registered sinks (sound, voice, trip logging). The
//! camera stream is released on every exit path, including startup errors.

mod config;
mod event;
mod pipeline;
pub mod sinks;

pub use config::MonitorConfig;
pub use event::{AlarmEvent, AlarmSink, DominantDetection};
pub use pipeline::{DetectionLoop, FrameDetector, LoopHandle, LoopState};

use thiserror::Error;

/// Orchestrator error types. Per-frame failures never surface here; these
/// are the blocking conditions shown to the user.
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Model loading failed: {0}")]
    ModelLoad(String),

    #[error("Camera stream failed: {0}")]
    Camera(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Install the global tracing subscriber for the binary.
pub fn init_logging() {
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(tracing::Level::INFO)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");
}
