// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Predict endpoint: multipart image upload in, detections out

pub mod handler;
pub mod response;

pub use handler::predict_handler;
pub use response::{PredictResponse, Prediction};
