// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::detection::DetectError;
use crate::vision::DecodeError;

/// JSON body returned for every failed request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub error_type: String,
    pub message: String,
}

/// Client-visible error taxonomy
///
/// Decode failures are the caller's fault (4xx); inference and internal
/// failures are ours (5xx). The pipeline never retries either kind.
#[derive(Debug, Clone)]
pub enum ApiError {
    /// Malformed request envelope (bad multipart, missing file field)
    InvalidRequest(String),
    /// Uploaded bytes are not a decodable image
    DecodeError(String),
    /// The detection capability failed on a validly decoded image
    InferenceError(String),
    InternalError(String),
}

impl ApiError {
    pub fn to_response(&self) -> ErrorResponse {
        let (error_type, message) = match self {
            ApiError::InvalidRequest(msg) => ("invalid_request", msg.clone()),
            ApiError::DecodeError(msg) => ("decode_error", msg.clone()),
            ApiError::InferenceError(msg) => ("inference_error", msg.clone()),
            ApiError::InternalError(msg) => ("internal_error", msg.clone()),
        };

        ErrorResponse {
            error_type: error_type.to_string(),
            message,
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::InvalidRequest(_) | ApiError::DecodeError(_) => 400,
            ApiError::InferenceError(_) | ApiError::InternalError(_) => 500,
        }
    }
}

impl From<DecodeError> for ApiError {
    fn from(e: DecodeError) -> Self {
        ApiError::DecodeError(e.to_string())
    }
}

impl From<DetectError> for ApiError {
    fn from(e: DetectError) -> Self {
        match e {
            DetectError::Inference(err) => ApiError::InferenceError(err.to_string()),
            DetectError::UnknownClass { .. } => ApiError::InternalError(e.to_string()),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            ApiError::DecodeError(msg) => write!(f, "Decode error: {}", msg),
            ApiError::InferenceError(msg) => write!(f, "Inference error: {}", msg),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

/// Error response wrapper for axum handlers
pub struct ApiErrorResponse(pub ApiError);

impl From<ApiError> for ApiErrorResponse {
    fn from(e: ApiError) -> Self {
        ApiErrorResponse(e)
    }
}

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        (status, axum::response::Json(self.0.to_response())).into_response()
    }
}
