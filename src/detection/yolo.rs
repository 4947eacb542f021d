// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! ONNX Runtime YOLOv8 detection capability
//!
//! Wraps an ort session around an exported `yolov8*.onnx` checkpoint:
//! - model loading from disk with shape validation
//! - stretch-resize preprocessing (RGB f32 CHW, 0-1)
//! - `[1, 4+nc, anchors]` output decoding with confidence threshold and NMS
//!
//! The input resolution and class count are read from the session's own
//! tensor metadata at load time and reported back per inference call; they
//! are never hard-coded.

use anyhow::{Context, Result};
use image::{imageops::FilterType, DynamicImage};
use ndarray::{Array2, Array4, ArrayView2, Axis, Ix2};
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info, warn};

use super::capability::{DetectionCapability, InferenceError, InferenceOutput, RawDetection};
use super::labels::COCO_CLASSES;

/// YOLOv8 object detector
///
/// # Thread Safety
/// The ort session is behind a `Mutex`; concurrent `infer` calls are safe
/// and serialize only around the actual session run.
pub struct YoloDetector {
    /// ONNX Runtime session
    session: Mutex<Session>,

    /// Input tensor name reported by the model (usually "images")
    input_name: String,

    /// Input width the model was exported with
    input_width: u32,

    /// Input height the model was exported with
    input_height: u32,

    /// Class count derived from the output shape (4 + nc)
    num_classes: usize,

    /// Minimum confidence a candidate box must reach
    confidence_threshold: f32,

    /// IoU above which overlapping boxes are suppressed
    iou_threshold: f32,
}

impl std::fmt::Debug for YoloDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YoloDetector")
            .field("input_width", &self.input_width)
            .field("input_height", &self.input_height)
            .field("num_classes", &self.num_classes)
            .field("confidence_threshold", &self.confidence_threshold)
            .field("iou_threshold", &self.iou_threshold)
            .finish_non_exhaustive()
    }
}

impl YoloDetector {
    /// Load a YOLOv8 ONNX model from disk
    ///
    /// # Errors
    /// Returns an error if the file is missing, the session cannot be built,
    /// or the model's input/output shapes are not the expected
    /// `[1, 3, H, W]` / `[1, 4+nc, anchors]` layout.
    pub fn new<P: AsRef<Path>>(
        model_path: P,
        confidence_threshold: f32,
        iou_threshold: f32,
    ) -> Result<Self> {
        let model_path = model_path.as_ref();

        if !model_path.exists() {
            anyhow::bail!("ONNX model file not found: {}", model_path.display());
        }

        let session = Session::builder()
            .context("Failed to create session builder")?
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .context("Failed to set CPU execution provider")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("Failed to set optimization level")?
            .with_intra_threads(4)
            .context("Failed to set intra threads")?
            .commit_from_file(model_path)
            .context(format!(
                "Failed to load ONNX model from {}",
                model_path.display()
            ))?;

        // Input shape: [batch, channels, height, width]
        let input = session
            .inputs
            .first()
            .ok_or_else(|| anyhow::anyhow!("Model has no inputs"))?;
        let input_name = input.name.clone();
        let input_dims: Vec<i64> = input
            .input_type
            .tensor_dimensions()
            .ok_or_else(|| anyhow::anyhow!("Model input is not a tensor"))?
            .to_vec();

        if input_dims.len() != 4 {
            anyhow::bail!("Expected 4D model input, got {}D", input_dims.len());
        }
        let (input_height, input_width) = (input_dims[2], input_dims[3]);
        if input_height <= 0 || input_width <= 0 {
            anyhow::bail!(
                "Model input resolution must be static, got {}x{}",
                input_width,
                input_height
            );
        }

        // Output shape: [1, 4+nc, anchors] (anchors always dominate features)
        let output = session
            .outputs
            .first()
            .ok_or_else(|| anyhow::anyhow!("Model has no outputs"))?;
        let output_dims: Vec<i64> = output
            .output_type
            .tensor_dimensions()
            .ok_or_else(|| anyhow::anyhow!("Model output is not a tensor"))?
            .to_vec();

        if output_dims.len() != 3 {
            anyhow::bail!("Expected 3D model output, got {}D", output_dims.len());
        }
        let output_features = output_dims[1].min(output_dims[2]) as usize;
        if output_features < 5 {
            anyhow::bail!("Model output features too small: {}", output_features);
        }
        let num_classes = output_features - 4;

        if num_classes != COCO_CLASSES.len() {
            warn!(
                num_classes,
                table = COCO_CLASSES.len(),
                "Model class count differs from the COCO label table"
            );
        }

        info!(
            input = %format!("{}x{}", input_width, input_height),
            num_classes,
            confidence_threshold,
            iou_threshold,
            "YOLO detection model loaded"
        );

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            input_width: input_width as u32,
            input_height: input_height as u32,
            num_classes,
            confidence_threshold,
            iou_threshold,
        })
    }

    /// Stretch-resize to the model resolution and normalize to f32 CHW
    ///
    /// The resize is non-uniform (no letterboxing), so the working frame and
    /// the original image share their top-left origin and a simple per-axis
    /// scale.
    fn preprocess(&self, image: &DynamicImage) -> Array4<f32> {
        let resized = image
            .resize_exact(self.input_width, self.input_height, FilterType::Triangle)
            .to_rgb8();

        let mut input = Array4::<f32>::zeros((
            1,
            3,
            self.input_height as usize,
            self.input_width as usize,
        ));
        for (x, y, pixel) in resized.enumerate_pixels() {
            input[[0, 0, y as usize, x as usize]] = f32::from(pixel[0]) / 255.0;
            input[[0, 1, y as usize, x as usize]] = f32::from(pixel[1]) / 255.0;
            input[[0, 2, y as usize, x as usize]] = f32::from(pixel[2]) / 255.0;
        }
        input
    }

    /// Run the session and normalize the output to `[anchors, features]`
    fn run_session(&self, input: Array4<f32>) -> Result<Array2<f32>, InferenceError> {
        let input_value = Value::from_array(input)?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| InferenceError::Engine("session lock poisoned".into()))?;
        let outputs = session.run(ort::inputs![self.input_name.as_str() => input_value])?;

        let output = outputs[0].try_extract_array::<f32>()?;
        let shape = output.shape().to_vec();
        if shape.len() != 3 || shape[0] != 1 {
            return Err(InferenceError::OutputShape(format!("{:?}", shape)));
        }

        let features = 4 + self.num_classes;
        let view = output.index_axis(Axis(0), 0);
        let preds = if shape[1] == features {
            // [1, 84, 8400] -> transpose to [8400, 84]
            view.t().to_owned()
        } else if shape[2] == features {
            view.to_owned()
        } else {
            return Err(InferenceError::OutputShape(format!("{:?}", shape)));
        };

        preds
            .into_dimensionality::<Ix2>()
            .map_err(|e| InferenceError::OutputShape(e.to_string()))
    }
}

impl DetectionCapability for YoloDetector {
    fn infer(&self, image: &DynamicImage) -> Result<InferenceOutput, InferenceError> {
        let input = self.preprocess(image);
        let preds = self.run_session(input)?;

        let mut candidates = decode_predictions(preds.view(), self.confidence_threshold);
        candidates.sort_unstable_by(|a, b| b.confidence.total_cmp(&a.confidence));
        let detections = non_max_suppression(candidates, self.iou_threshold);

        debug!(detections = detections.len(), "YOLO inference completed");

        Ok(InferenceOutput {
            working_width: self.input_width,
            working_height: self.input_height,
            detections,
        })
    }

    fn class_name(&self, class_id: u32) -> Option<&str> {
        COCO_CLASSES.get(class_id as usize).copied()
    }
}

/// Decode `[anchors, 4+nc]` predictions into candidate boxes
///
/// Each row is `[cx, cy, w, h, class scores...]` in working-resolution
/// pixels. Rows whose best class score misses the threshold, or whose
/// geometry is degenerate or non-finite, are dropped.
fn decode_predictions(preds: ArrayView2<'_, f32>, confidence_threshold: f32) -> Vec<RawDetection> {
    let mut candidates = Vec::new();

    for row in preds.rows() {
        let (best_class, best_score) = row.iter().skip(4).enumerate().fold(
            (0usize, f32::NEG_INFINITY),
            |(best_idx, best), (idx, &score)| {
                if score > best {
                    (idx, score)
                } else {
                    (best_idx, best)
                }
            },
        );

        if !best_score.is_finite() || best_score < confidence_threshold {
            continue;
        }

        let (cx, cy, w, h) = (row[0], row[1], row[2], row[3]);
        if !(cx.is_finite() && cy.is_finite() && w.is_finite() && h.is_finite()) {
            continue;
        }
        if w <= 0.0 || h <= 0.0 {
            continue;
        }

        candidates.push(RawDetection {
            class_id: best_class as u32,
            confidence: best_score,
            bbox: [cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0],
        });
    }

    candidates
}

/// Greedy non-maximum suppression over confidence-sorted candidates
fn non_max_suppression(candidates: Vec<RawDetection>, iou_threshold: f32) -> Vec<RawDetection> {
    let mut kept: Vec<RawDetection> = Vec::with_capacity(candidates.len().min(64));

    'candidates: for candidate in candidates {
        for survivor in &kept {
            if iou(&candidate.bbox, &survivor.bbox) > iou_threshold {
                continue 'candidates;
            }
        }
        kept.push(candidate);
    }

    kept
}

fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let inter_x1 = a[0].max(b[0]);
    let inter_y1 = a[1].max(b[1]);
    let inter_x2 = a[2].min(b[2]);
    let inter_y2 = a[3].min(b[3]);

    let inter = (inter_x2 - inter_x1).max(0.0) * (inter_y2 - inter_y1).max(0.0);
    let area_a = (a[2] - a[0]) * (a[3] - a[1]);
    let area_b = (b[2] - b[0]) * (b[3] - b[1]);
    let union = area_a + area_b - inter;

    if union > f32::EPSILON {
        inter / union
    } else {
        0.0
    }
}
