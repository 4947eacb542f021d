// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod api;
pub mod config;
pub mod detection;
pub mod version;
pub mod vision;

// Re-export main types
pub use api::{build_router, start_server, AppState};
pub use config::NodeConfig;
pub use detection::{
    DetectError, Detection, DetectionCapability, DetectionPipeline, InferenceError,
    InferenceOutput, RawDetection, YoloDetector,
};
pub use vision::{decode_image, DecodeError, DecodedImage};
