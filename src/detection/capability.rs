// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! The detector capability boundary
//!
//! The model behind this trait is opaque: it resizes or pads its input
//! however it likes, and the pipeline learns the resolution it actually
//! worked at only from the [`InferenceOutput`] of each call.

use image::DynamicImage;
use thiserror::Error;

/// A single detection as the model emitted it, in working-resolution
/// coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDetection {
    /// Class index into the capability's class-name table
    pub class_id: u32,
    /// Confidence score (0.0-1.0)
    pub confidence: f32,
    /// Bounding box [x1, y1, x2, y2] with x1 <= x2, y1 <= y2
    pub bbox: [f32; 4],
}

/// Result of one inference call
#[derive(Debug, Clone)]
pub struct InferenceOutput {
    /// Width the detector actually processed for this call
    pub working_width: u32,
    /// Height the detector actually processed for this call
    pub working_height: u32,
    /// Detections in the order the model produced them
    pub detections: Vec<RawDetection>,
}

/// Errors raised by a capability while processing a validly decoded image
///
/// These are server-side faults and map to a 5xx response.
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("inference engine error: {0}")]
    Engine(String),

    #[error("unexpected model output shape: {0}")]
    OutputShape(String),
}

// Sanitize ORT errors: log the full error internally, surface a stable
// message externally.
impl From<ort::Error> for InferenceError {
    fn from(e: ort::Error) -> Self {
        tracing::error!(error = %e, "ONNX Runtime inference error");
        InferenceError::Engine("internal inference error".into())
    }
}

/// Common interface for object detectors
///
/// Loaded once at startup, then shared read-only across requests.
/// Implementations must tolerate concurrent `infer` calls without external
/// locking.
pub trait DetectionCapability: Send + Sync {
    /// Run detection on a decoded pixel grid
    fn infer(&self, image: &DynamicImage) -> Result<InferenceOutput, InferenceError>;

    /// Resolve a class id to its human-readable label
    ///
    /// Returns `None` for ids outside the capability's class table.
    fn class_name(&self, class_id: u32) -> Option<&str>;
}
