//! Detection Decoder and Inference Engine
//!
//! Turns raw model output into pixel-space detections (box extraction,
//! class arg-max, NMS) and owns the ONNX session that produces that output.

pub mod decode;
pub mod engine;
pub mod label;

pub use decode::{decode_output, non_max_suppression, BoundingBox, Detection};
pub use engine::{EngineConfig, InferenceEngine};
pub use label::Label;

use thiserror::Error;

/// Detector error types
#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("Model loading failed: {0}")]
    ModelLoad(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Unexpected output shape: {0}")]
    OutputShape(String),
}
