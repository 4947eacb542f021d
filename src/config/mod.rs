// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Service configuration from environment variables

use std::env;
use std::path::PathBuf;

/// Runtime configuration for the vision node
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Port the HTTP API listens on
    pub api_port: u16,
    /// Path to the exported YOLOv8 ONNX model
    pub model_path: PathBuf,
    /// Minimum confidence for a detection to be reported
    pub confidence_threshold: f32,
    /// IoU threshold for non-maximum suppression
    pub iou_threshold: f32,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            api_port: 8000,
            model_path: PathBuf::from("./models/yolov8n.onnx"),
            confidence_threshold: 0.25,
            iou_threshold: 0.45,
        }
    }
}

impl NodeConfig {
    /// Read configuration from the environment, falling back to defaults
    ///
    /// Recognized variables: `API_PORT`, `MODEL_PATH`,
    /// `CONFIDENCE_THRESHOLD`, `IOU_THRESHOLD`.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let api_port = env::var("API_PORT")
            .ok()
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(defaults.api_port);

        let model_path = env::var("MODEL_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.model_path);

        let confidence_threshold = env::var("CONFIDENCE_THRESHOLD")
            .ok()
            .and_then(|v| v.parse::<f32>().ok())
            .unwrap_or(defaults.confidence_threshold);

        let iou_threshold = env::var("IOU_THRESHOLD")
            .ok()
            .and_then(|v| v.parse::<f32>().ok())
            .unwrap_or(defaults.iou_threshold);

        Self {
            api_port,
            model_path,
            confidence_threshold,
            iou_threshold,
        }
    }
}
