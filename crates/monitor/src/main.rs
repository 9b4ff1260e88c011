//! Driver drowsiness monitor - main entry point

use camera_capture::{SyntheticCamera, SyntheticPattern};
use detector::{EngineConfig, InferenceEngine};
use monitor::sinks::{SoundAlertSink, TripLogSink, VoiceAlertSink};
use monitor::{init_logging, AlarmSink, DetectionLoop, MonitorConfig};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    info!("=== Driver Drowsiness Monitor v{} ===", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::args().nth(1);
    let config = MonitorConfig::load(config_path.as_deref())?;

    let engine = InferenceEngine::new(EngineConfig {
        model_path: config.model_path.clone(),
        input_size: config.input_size,
    });
    if config.model_path.is_none() {
        warn!("no model_path configured; running with the mock engine");
    }

    let settings = &config.settings;
    let sinks: Vec<Box<dyn AlarmSink>> = vec![
        Box::new(SoundAlertSink::new(
            settings.enable_sound_alert,
            Box::new(|cue| info!(?cue, "sound alert")),
        )),
        Box::new(VoiceAlertSink::new(
            settings.enable_voice_alert,
            Box::new(|phrase, state| info!(phrase, %state, "voice alert")),
        )),
        Box::new(TripLogSink::new(
            Box::new(|| None),
            Box::new(|json| info!(record = %json, "trip event")),
        )),
    ];

    // The demo binary drives the loop from a synthetic source; a real
    // deployment swaps in the device-backed FrameSource implementation.
    let source = SyntheticCamera::new(config.camera.clone(), SyntheticPattern::Gradient);

    let mut pipeline = DetectionLoop::new(config, engine, sinks);
    let handle = pipeline.handle();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown requested");
            handle.stop();
        }
    });

    pipeline.run(Box::new(source)).await?;
    Ok(())
}
