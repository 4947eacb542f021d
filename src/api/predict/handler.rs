// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Predict endpoint handler

use axum::{extract::State, Json};
use axum_extra::extract::Multipart;
use tracing::debug;

use super::response::PredictResponse;
use crate::api::errors::{ApiError, ApiErrorResponse};
use crate::api::http_server::AppState;
use crate::vision::decode_image;

/// POST /predict - Detect objects in an uploaded image
///
/// Accepts a multipart form with the encoded image in a part named `file`
/// and returns the detected objects with boxes in the image's own pixel
/// coordinates. An image with nothing in it yields an empty list, not an
/// error.
pub async fn predict_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<PredictResponse>, ApiErrorResponse> {
    // Extract image bytes from the multipart form
    let mut image_bytes = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::InvalidRequest(format!("multipart error: {e}")))
        .map_err(ApiErrorResponse)?
    {
        if field.name() == Some("file") {
            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::InvalidRequest(format!("failed to read upload: {e}")))
                .map_err(ApiErrorResponse)?;
            image_bytes = Some(data);
            break;
        }
    }

    let image_bytes = image_bytes.ok_or_else(|| {
        ApiErrorResponse(ApiError::InvalidRequest(
            "no 'file' field in request".to_string(),
        ))
    })?;

    // Decode and keep the image's true dimensions
    let image = decode_image(&image_bytes)
        .map_err(ApiError::from)
        .map_err(ApiErrorResponse)?;

    debug!(
        width = image.width,
        height = image.height,
        bytes = image_bytes.len(),
        "Image decoded, running detection"
    );

    // Run inference and rescale boxes to original coordinates
    let detections = state
        .pipeline
        .detect(&image)
        .map_err(ApiError::from)
        .map_err(ApiErrorResponse)?;

    Ok(Json(PredictResponse::new(detections)))
}
