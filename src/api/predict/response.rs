// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Predict response types

use serde::{Deserialize, Serialize};

use crate::detection::Detection;

/// One detected object in original-image pixel coordinates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    /// Object label/class
    pub label: String,
    /// Confidence score (0.0-1.0)
    pub confidence: f32,
    /// Bounding box [x1, y1, x2, y2] in original-image pixels
    #[serde(rename = "box")]
    pub bbox: [f32; 4],
}

impl From<Detection> for Prediction {
    fn from(detection: Detection) -> Self {
        Self {
            label: detection.label,
            confidence: detection.confidence,
            bbox: detection.bbox,
        }
    }
}

/// Response from the predict endpoint
///
/// An empty `predictions` list is a valid response, not an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictResponse {
    pub predictions: Vec<Prediction>,
}

impl PredictResponse {
    pub fn new(detections: Vec<Detection>) -> Self {
        Self {
            predictions: detections.into_iter().map(Prediction::from).collect(),
        }
    }
}
