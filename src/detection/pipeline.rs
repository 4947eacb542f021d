// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Inference pipeline: runs the capability and maps boxes back to the
//! caller's coordinate space

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use super::capability::{DetectionCapability, InferenceError};
use crate::vision::DecodedImage;

/// A detection in original-image pixel coordinates, ready for the response
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// Human-readable class label
    pub label: String,
    /// Confidence score (0.0-1.0)
    pub confidence: f32,
    /// Bounding box [x1, y1, x2, y2] in original-image pixels
    pub bbox: [f32; 4],
}

/// Pipeline failures
#[derive(Debug, Error)]
pub enum DetectError {
    #[error(transparent)]
    Inference(#[from] InferenceError),

    /// The capability emitted a class id its own table cannot name.
    #[error("capability returned unknown class id {class_id}")]
    UnknownClass { class_id: u32 },
}

/// Stateless detection pipeline around an injected capability
///
/// One instance is built at startup and shared across requests; `detect` is
/// a pure function of (image, capability).
pub struct DetectionPipeline {
    capability: Arc<dyn DetectionCapability>,
}

impl DetectionPipeline {
    pub fn new(capability: Arc<dyn DetectionCapability>) -> Self {
        Self { capability }
    }

    /// Run inference and rescale every box into the image's own pixel space
    ///
    /// Boxes are mapped with an independent per-axis linear scale
    /// (`original / working`) and no translation term: the working frame is
    /// assumed to share the image's top-left origin. Padding a capability may
    /// have applied internally is not subtracted, so a box near a padded edge
    /// can land slightly outside `[0, width] x [0, height]`. The bundled
    /// [`YoloDetector`](super::YoloDetector) stretches its input without
    /// padding, which makes the mapping exact for it.
    ///
    /// Output order matches the capability's detection order; nothing is
    /// sorted, filtered, or deduplicated here. Zero detections is a valid,
    /// empty result.
    pub fn detect(&self, image: &DecodedImage) -> Result<Vec<Detection>, DetectError> {
        let output = self.capability.infer(&image.pixels)?;

        let scale_x = image.width as f32 / output.working_width as f32;
        let scale_y = image.height as f32 / output.working_height as f32;

        debug!(
            working_width = output.working_width,
            working_height = output.working_height,
            original_width = image.width,
            original_height = image.height,
            raw_detections = output.detections.len(),
            "Rescaling detections to original coordinates"
        );

        let mut detections = Vec::with_capacity(output.detections.len());
        for raw in &output.detections {
            let label = self
                .capability
                .class_name(raw.class_id)
                .ok_or(DetectError::UnknownClass {
                    class_id: raw.class_id,
                })?
                .to_string();

            detections.push(Detection {
                label,
                confidence: raw.confidence,
                bbox: [
                    raw.bbox[0] * scale_x,
                    raw.bbox[1] * scale_y,
                    raw.bbox[2] * scale_x,
                    raw.bbox[3] * scale_y,
                ],
            });
        }

        Ok(detections)
    }
}
