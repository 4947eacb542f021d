// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{Context, Result};
use fabstir_vision_node::{
    api::{start_server, AppState},
    config::NodeConfig,
    detection::{DetectionPipeline, YoloDetector},
    version,
};
use std::{env, net::SocketAddr, sync::Arc};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber for logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    println!("🚀 Starting Fabstir Vision Node...\n");
    println!("📦 BUILD VERSION: {}", version::VERSION);
    println!("📅 Build Date: {}", version::BUILD_DATE);
    println!();

    let config = NodeConfig::from_env();

    // One-time model load before serving; requests never see a
    // partially-initialized detector.
    println!(
        "🧠 Loading detection model from {}...",
        config.model_path.display()
    );
    let detector = YoloDetector::new(
        &config.model_path,
        config.confidence_threshold,
        config.iou_threshold,
    )
    .context("Failed to initialize detection model")?;
    println!("✅ Detection model loaded");

    let model_name = config
        .model_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "unknown".to_string());

    let state = AppState {
        pipeline: Arc::new(DetectionPipeline::new(Arc::new(detector))),
        model_name,
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], config.api_port));
    println!("🌐 Serving detection API on {}\n", addr);

    start_server(addr, state)
        .await
        .map_err(|e| anyhow::anyhow!("API server error: {e}"))?;

    Ok(())
}
