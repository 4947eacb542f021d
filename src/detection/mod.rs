// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Object detection: capability boundary, inference pipeline, YOLO backend
//!
//! The pipeline depends only on the [`DetectionCapability`] trait, so it can
//! be exercised against a deterministic fake. The ort-backed
//! [`YoloDetector`] is the one concrete capability wired up at startup.

pub mod capability;
pub mod labels;
pub mod pipeline;
pub mod yolo;

pub use capability::{DetectionCapability, InferenceError, InferenceOutput, RawDetection};
pub use pipeline::{DetectError, Detection, DetectionPipeline};
pub use yolo::YoloDetector;
