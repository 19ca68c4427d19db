mod anchors;

use std::{cmp::Ordering, path::Path};

use anyhow::{Context, Result, anyhow};
use ort::session::{Session, builder::GraphOptimizationLevel};
use ort::value::Tensor;

use super::common::{LetterboxInfo, PALM_INPUT_SIZE, prepare_frame_with_size};
use crate::types::Frame;

pub const PALM_LANDMARKS: usize = 7;

/// Palm landmark indices used to orient the hand crop.
pub const PALM_WRIST: usize = 0;
pub const PALM_MIDDLE_FINGER_MCP: usize = 2;

/// A detected palm in frame pixel coordinates.
///
/// `bbox` is not clipped to the frame, so a palm entering from an edge keeps
/// its full extent.
#[derive(Clone, Debug)]
pub struct PalmRegion {
    pub bbox: [f32; 4],
    pub landmarks: Vec<(f32, f32)>,
    pub score: f32,
}

#[derive(Clone, Debug)]
pub struct PalmDetectorConfig {
    pub score_threshold: f32,
    pub nms_threshold: f32,
    pub top_k: usize,
}

impl Default for PalmDetectorConfig {
    fn default() -> Self {
        Self {
            score_threshold: 0.5,
            nms_threshold: 0.3,
            top_k: 32,
        }
    }
}

pub struct PalmDetector {
    session: Session,
    anchors: Vec<[f32; 2]>,
    cfg: PalmDetectorConfig,
}

impl PalmDetector {
    pub fn new(model_path: &Path, cfg: PalmDetectorConfig) -> Result<Self> {
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(2)?
            .commit_from_file(model_path)
            .with_context(|| {
                format!("failed to load palm detector from {}", model_path.display())
            })?;

        Ok(Self {
            session,
            anchors: anchors::generate(),
            cfg,
        })
    }

    /// Palms sorted by descending score, overlapping detections suppressed.
    pub fn detect(&mut self, frame: &Frame) -> Result<Vec<PalmRegion>> {
        let (input, letterbox) = prepare_frame_with_size(frame, PALM_INPUT_SIZE)?;
        let tensor = Tensor::from_array(input)?;

        let outputs = self
            .session
            .run(ort::inputs![tensor])
            .context("failed to run palm detector session")?;

        if outputs.len() < 2 {
            return Err(anyhow!(
                "palm detector returned {} outputs, expected at least 2",
                outputs.len()
            ));
        }

        let box_and_landmarks = outputs[0].try_extract_array::<f32>()?;
        let scores = outputs[1].try_extract_array::<f32>()?;

        let box_shape = box_and_landmarks.shape().to_vec();
        let score_shape = scores.shape().to_vec();

        decode_palm_outputs(
            box_and_landmarks
                .as_slice()
                .ok_or_else(|| anyhow!("palm boxes not contiguous"))?,
            &box_shape,
            scores
                .as_slice()
                .ok_or_else(|| anyhow!("palm scores not contiguous"))?,
            &score_shape,
            &self.anchors,
            &letterbox,
            &self.cfg,
        )
    }
}

fn decode_palm_outputs(
    box_landmark: &[f32],
    box_shape: &[usize],
    scores: &[f32],
    score_shape: &[usize],
    anchors: &[[f32; 2]],
    letterbox: &LetterboxInfo,
    cfg: &PalmDetectorConfig,
) -> Result<Vec<PalmRegion>> {
    if box_shape.len() < 3 {
        return Err(anyhow!(
            "unexpected palm box shape {:?}, need [batch, anchors, features]",
            box_shape
        ));
    }
    if score_shape.len() < 3 {
        return Err(anyhow!(
            "unexpected palm score shape {:?}, need [batch, anchors, 1]",
            score_shape
        ));
    }

    let anchor_dim = box_shape[box_shape.len() - 2];
    let feature_dim = box_shape[box_shape.len() - 1];
    let score_anchor_dim = score_shape[score_shape.len() - 2];
    let score_feature_dim = score_shape[score_shape.len() - 1];

    if feature_dim < 4 + PALM_LANDMARKS * 2 {
        return Err(anyhow!(
            "palm box feature dimension too small: {feature_dim}"
        ));
    }
    if anchor_dim != score_anchor_dim {
        return Err(anyhow!(
            "anchor dimension mismatch between boxes ({anchor_dim}) and scores ({score_anchor_dim})"
        ));
    }

    let count = anchors.len().min(anchor_dim);
    let pad_bias_x = letterbox.pad_x / letterbox.scale;
    let pad_bias_y = letterbox.pad_y / letterbox.scale;
    let scale = letterbox.orig_w.max(letterbox.orig_h) as f32;
    let target_input = PALM_INPUT_SIZE as f32;

    let feature = |anchor_idx: usize, offset: usize| -> Result<f32> {
        box_landmark
            .get(anchor_idx * feature_dim + offset)
            .map(|v| v / target_input)
            .ok_or_else(|| anyhow!("missing palm feature {offset} for anchor {anchor_idx}"))
    };

    let mut candidates = Vec::new();
    for (anchor_idx, anchor) in anchors.iter().take(count).enumerate() {
        let raw_score = *scores
            .get(anchor_idx * score_feature_dim)
            .ok_or_else(|| anyhow!("missing score for palm anchor {anchor_idx}"))?;
        let score = sigmoid(raw_score);
        if score < cfg.score_threshold {
            continue;
        }

        let cx = feature(anchor_idx, 0)? + anchor[0];
        let cy = feature(anchor_idx, 1)? + anchor[1];
        let hw = feature(anchor_idx, 2)? / 2.0;
        let hh = feature(anchor_idx, 3)? / 2.0;

        let bbox = [
            (cx - hw) * scale - pad_bias_x,
            (cy - hh) * scale - pad_bias_y,
            (cx + hw) * scale - pad_bias_x,
            (cy + hh) * scale - pad_bias_y,
        ];
        if bbox[2] <= bbox[0] || bbox[3] <= bbox[1] {
            continue;
        }

        let mut landmarks = Vec::with_capacity(PALM_LANDMARKS);
        for l in 0..PALM_LANDMARKS {
            let lx = feature(anchor_idx, 4 + l * 2)?;
            let ly = feature(anchor_idx, 4 + l * 2 + 1)?;
            landmarks.push((
                (lx + anchor[0]) * scale - pad_bias_x,
                (ly + anchor[1]) * scale - pad_bias_y,
            ));
        }

        candidates.push(PalmRegion {
            bbox,
            landmarks,
            score,
        });
    }

    let kept = nms(&candidates, cfg.nms_threshold, cfg.top_k);
    Ok(kept
        .into_iter()
        .filter_map(|idx| candidates.get(idx).cloned())
        .collect())
}

fn nms(candidates: &[PalmRegion], threshold: f32, top_k: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..candidates.len()).collect();
    order.sort_by(|a, b| {
        candidates[*b]
            .score
            .partial_cmp(&candidates[*a].score)
            .unwrap_or(Ordering::Equal)
    });

    let mut keep: Vec<usize> = Vec::new();
    'outer: for &idx in &order {
        for &k in &keep {
            if iou(&candidates[idx].bbox, &candidates[k].bbox) >= threshold {
                continue 'outer;
            }
        }
        keep.push(idx);
        if keep.len() >= top_k {
            break;
        }
    }
    keep
}

fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let x1 = a[0].max(b[0]);
    let y1 = a[1].max(b[1]);
    let x2 = a[2].min(b[2]);
    let y2 = a[3].min(b[3]);

    let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    if inter <= 0.0 {
        return 0.0;
    }

    let area_a = (a[2] - a[0]).max(0.0) * (a[3] - a[1]).max(0.0);
    let area_b = (b[2] - b[0]).max(0.0) * (b[3] - b[1]).max(0.0);
    let union = area_a + area_b - inter;
    if union <= 0.0 { 0.0 } else { inter / union }
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}
