use std::path::Path;

use anyhow::{Context, Result, anyhow};
use ort::session::{Session, builder::GraphOptimizationLevel};
use ort::value::Tensor;

use super::{
    HandLandmarker, HandLandmarkerOptions,
    common::{self, HANDPOSE_INPUT_SIZE},
    palm::{PalmDetector, PalmDetectorConfig, PalmRegion},
    roi::HandRoi,
    tracker::{HandEstimate, HandInference, HandTracker},
};
use crate::types::{Frame, HandLandmarkerResult};

/// Palm detector followed by the hand-pose estimator on each palm crop.
///
/// Region selection and tracking across frames live in [`HandTracker`].
pub struct OrtHandLandmarker {
    models: OrtModels,
    tracker: HandTracker,
}

struct OrtModels {
    handpose: Session,
    palm_detector: PalmDetector,
}

impl OrtHandLandmarker {
    pub fn new(
        handpose_model_path: &Path,
        palm_detector_model_path: &Path,
        options: HandLandmarkerOptions,
    ) -> Result<Self> {
        options.validate()?;

        let handpose = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(2)?
            .commit_from_file(handpose_model_path)
            .with_context(|| {
                format!(
                    "failed to load ORT session from {}",
                    handpose_model_path.display()
                )
            })?;

        let palm_detector = PalmDetector::new(
            palm_detector_model_path,
            PalmDetectorConfig {
                score_threshold: options.min_detection_confidence,
                ..PalmDetectorConfig::default()
            },
        )?;

        Ok(Self {
            models: OrtModels {
                handpose,
                palm_detector,
            },
            tracker: HandTracker::new(options),
        })
    }

    pub fn options(&self) -> &HandLandmarkerOptions {
        self.tracker.options()
    }
}

impl HandLandmarker for OrtHandLandmarker {
    fn process(&mut self, frame: &Frame) -> Result<HandLandmarkerResult> {
        self.tracker.process(&mut self.models, frame)
    }
}

impl HandInference for OrtModels {
    fn detect_palms(&mut self, frame: &Frame) -> Result<Vec<PalmRegion>> {
        self.palm_detector.detect(frame)
    }

    fn estimate_hand(&mut self, frame: &Frame, roi: &HandRoi) -> Result<HandEstimate> {
        let (input, transform) = common::prepare_rotated_crop(
            frame,
            roi.center,
            roi.side,
            roi.angle,
            HANDPOSE_INPUT_SIZE,
        )?;
        let tensor = Tensor::from_array(input)?;
        let outputs = self
            .handpose
            .run(ort::inputs![tensor])
            .context("failed to run ORT session")?;

        if outputs.len() < 4 {
            return Err(anyhow!(
                "handpose model returned {} outputs, expected 4",
                outputs.len()
            ));
        }

        let coords = outputs[0].try_extract_array::<f32>()?;
        let flattened: Vec<f32> = coords.iter().copied().collect();
        let landmarks = common::decode_landmarks(&flattened)?;

        let presence = outputs[1]
            .try_extract_array::<f32>()
            .context("failed to read hand presence")?;
        let presence = first_scalar(presence.iter().copied(), "presence")?;

        let handedness = outputs[2]
            .try_extract_array::<f32>()
            .context("failed to read handedness")?;
        let handedness = first_scalar(handedness.iter().copied(), "handedness")?;

        let world = outputs[3].try_extract_array::<f32>()?;
        let flattened: Vec<f32> = world.iter().copied().collect();
        let world_landmarks = common::decode_landmarks(&flattened)?;

        Ok(HandEstimate {
            landmarks: landmarks.map(|point| transform.project(point)),
            world_landmarks: world_landmarks.map(|point| transform.rotate_world(point)),
            presence,
            handedness,
        })
    }
}

fn first_scalar(values: impl IntoIterator<Item = f32>, name: &str) -> Result<f32> {
    values
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("handpose model returned an empty {name} tensor"))
}
