//! ONNX inference engine
//!
//! Owns the loaded session and orchestrates preprocess -> model -> decode
//! for one frame at a time. The hot path never panics and never returns an
//! error: any per-frame failure is logged and yields an empty detection list.

use crate::decode::{decode_output, Detection};
use crate::DetectorError;
use camera_capture::VideoFrame;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use preprocess::Preprocessor;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

/// Inference engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Path to the ONNX model artifact; `None` runs the engine in mock mode
    pub model_path: Option<String>,
    /// Square model input side (pixels)
    pub input_size: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            model_path: None,
            input_size: 640,
        }
    }
}

/// Single-session object detection engine.
///
/// `detect` takes `&mut self` and runs to completion, so a single owner
/// cannot issue overlapping calls for the same stream.
pub struct InferenceEngine {
    config: EngineConfig,
    session: Option<Session>,
    preprocessor: Preprocessor,
    loaded: bool,
}

impl InferenceEngine {
    pub fn new(config: EngineConfig) -> Self {
        let preprocessor = Preprocessor::new(config.input_size);
        Self {
            config,
            session: None,
            preprocessor,
            loaded: false,
        }
    }

    /// Engine without a model, for tests and the demo binary. Detect calls
    /// return no detections.
    pub fn mock() -> Self {
        info!("creating mock inference engine");
        let mut engine = Self::new(EngineConfig::default());
        engine.loaded = true;
        engine
    }

    /// Load the model artifact. Idempotent: returns `Ok(true)` immediately
    /// when a previous call succeeded. A missing or corrupt artifact surfaces
    /// `DetectorError::ModelLoad` with the underlying reason; no retry.
    pub fn load(&mut self) -> Result<bool, DetectorError> {
        if self.loaded {
            return Ok(true);
        }

        let Some(path) = self.config.model_path.clone() else {
            warn!("no model path configured, running in mock mode");
            self.loaded = true;
            return Ok(true);
        };

        info!("loading detection model from {}", path);
        let session = Session::builder()
            .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Level3))
            .and_then(|b| b.commit_from_file(&path))
            .map_err(|e| {
                error!("failed to load detection model: {}", e);
                DetectorError::ModelLoad(e.to_string())
            })?;

        self.session = Some(session);
        self.loaded = true;
        info!("detection model loaded");
        Ok(true)
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Run one inference pass over a frame.
    ///
    /// Fails closed: preprocessing, executor, or decode failures are logged
    /// and produce an empty list so the capture loop keeps running.
    pub fn detect(&mut self, frame: &VideoFrame) -> Vec<Detection> {
        if !self.loaded {
            warn!("detect called before model load");
            return Vec::new();
        }

        match self.detect_inner(frame) {
            Ok(detections) => detections,
            Err(e) => {
                error!("detection failed, dropping frame: {}", e);
                Vec::new()
            }
        }
    }

    fn detect_inner(&mut self, frame: &VideoFrame) -> Result<Vec<Detection>, DetectorError> {
        let tensor = self
            .preprocessor
            .run(frame)
            .map_err(|e| DetectorError::Inference(e.to_string()))?;

        let Some(session) = &mut self.session else {
            debug!("mock engine: no session, returning empty detections");
            return Ok(Vec::new());
        };

        let input = Value::from_array(tensor)
            .map_err(|e| DetectorError::Inference(e.to_string()))?;
        let outputs = session
            .run(ort::inputs![input])
            .map_err(|e| DetectorError::Inference(e.to_string()))?;

        let (shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| DetectorError::Inference(e.to_string()))?;

        let dims: Vec<usize> = shape.as_ref().iter().map(|&d| d as usize).collect();
        if dims.len() != 3 {
            return Err(DetectorError::OutputShape(format!(
                "expected 3D output, got {:?}",
                dims
            )));
        }

        Ok(decode_output(
            data,
            &dims,
            frame.width as f32,
            frame.height as f32,
            self.config.input_size as f32,
        ))
    }
}
