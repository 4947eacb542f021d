// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! HTTP-level tests for the predict endpoint, driven against a fake
//! detection capability so no model weights are needed.

use fabstir_vision_node::api::{build_router, AppState};
use fabstir_vision_node::detection::{
    DetectionCapability, DetectionPipeline, InferenceError, InferenceOutput, RawDetection,
};
use image::DynamicImage;
use std::sync::Arc;

struct FakeCapability {
    working: (u32, u32),
    detections: Vec<RawDetection>,
}

impl DetectionCapability for FakeCapability {
    fn infer(&self, _image: &DynamicImage) -> Result<InferenceOutput, InferenceError> {
        Ok(InferenceOutput {
            working_width: self.working.0,
            working_height: self.working.1,
            detections: self.detections.clone(),
        })
    }

    fn class_name(&self, class_id: u32) -> Option<&str> {
        ["person", "bicycle", "car"].get(class_id as usize).copied()
    }
}

/// Serve the router on an ephemeral port and return its base URL
async fn spawn_server(capability: FakeCapability) -> String {
    let state = AppState {
        pipeline: Arc::new(DetectionPipeline::new(Arc::new(capability))),
        model_name: "fake-detector".to_string(),
    };

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, build_router(state)).await.unwrap();
    });

    format!("http://{addr}")
}

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut bytes = Vec::new();
    let img = DynamicImage::ImageRgb8(image::RgbImage::new(width, height));
    img.write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}

async fn post_predict(base_url: &str, field_name: &str, bytes: Vec<u8>) -> reqwest::Response {
    let part = reqwest::multipart::Part::bytes(bytes).file_name("upload.png");
    let form = reqwest::multipart::Form::new().part(field_name.to_string(), part);

    reqwest::Client::new()
        .post(format!("{base_url}/predict"))
        .multipart(form)
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_predict_scales_boxes_to_original_coordinates() {
    let base_url = spawn_server(FakeCapability {
        working: (640, 640),
        detections: vec![RawDetection {
            class_id: 0,
            confidence: 0.9,
            bbox: [100.0, 100.0, 200.0, 200.0],
        }],
    })
    .await;

    let response = post_predict(&base_url, "file", png_bytes(400, 300)).await;
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.unwrap();
    let predictions = body["predictions"].as_array().unwrap();
    assert_eq!(predictions.len(), 1);
    assert_eq!(predictions[0]["label"], "person");
    assert_eq!(predictions[0]["confidence"].as_f64().unwrap(), 0.9);

    let bbox: Vec<f64> = predictions[0]["box"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_f64().unwrap())
        .collect();
    assert_eq!(bbox, vec![62.5, 46.875, 125.0, 93.75]);
}

#[tokio::test]
async fn test_predict_returns_empty_list_when_nothing_detected() {
    let base_url = spawn_server(FakeCapability {
        working: (640, 640),
        detections: vec![],
    })
    .await;

    let response = post_predict(&base_url, "file", png_bytes(32, 32)).await;
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["predictions"], serde_json::json!([]));
}

#[tokio::test]
async fn test_predict_preserves_detection_order() {
    let base_url = spawn_server(FakeCapability {
        working: (100, 100),
        detections: vec![
            RawDetection {
                class_id: 2,
                confidence: 0.4,
                bbox: [0.0, 0.0, 10.0, 10.0],
            },
            RawDetection {
                class_id: 0,
                confidence: 0.99,
                bbox: [20.0, 20.0, 40.0, 40.0],
            },
        ],
    })
    .await;

    let response = post_predict(&base_url, "file", png_bytes(100, 100)).await;
    let body: serde_json::Value = response.json().await.unwrap();

    let labels: Vec<&str> = body["predictions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["label"].as_str().unwrap())
        .collect();
    assert_eq!(labels, vec!["car", "person"]);
}

#[tokio::test]
async fn test_predict_rejects_non_image_bytes() {
    let base_url = spawn_server(FakeCapability {
        working: (640, 640),
        detections: vec![],
    })
    .await;

    let response = post_predict(&base_url, "file", b"not an image at all".to_vec()).await;
    assert_eq!(response.status(), 400);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error_type"], "decode_error");
}

#[tokio::test]
async fn test_predict_requires_file_field() {
    let base_url = spawn_server(FakeCapability {
        working: (640, 640),
        detections: vec![],
    })
    .await;

    let response = post_predict(&base_url, "not_the_file", png_bytes(8, 8)).await;
    assert_eq!(response.status(), 400);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error_type"], "invalid_request");
}

#[tokio::test]
async fn test_health_endpoint() {
    let base_url = spawn_server(FakeCapability {
        working: (640, 640),
        detections: vec![],
    })
    .await;

    let response = reqwest::get(format!("{base_url}/health")).await.unwrap();
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["model"], "fake-detector");
}
