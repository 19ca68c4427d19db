mod common;
mod ort;
mod palm;
mod roi;
mod tracker;

use std::path::PathBuf;

use anyhow::{Result, anyhow};

use crate::{
    model_download::{
        ModelKind, default_handpose_estimator_model_path, default_palm_detector_model_path,
        ensure_model_ready,
    },
    types::{Frame, HandLandmarkerResult},
};

pub use self::ort::OrtHandLandmarker;
pub use self::palm::{PalmDetectorConfig, PalmRegion};
pub use self::roi::HandRoi;

/// Per-frame hand landmark detection.
///
/// Implementations are configured once and then fed frames in temporal
/// order. An error aborts the run; there is no per-frame recovery.
pub trait HandLandmarker {
    fn process(&mut self, frame: &Frame) -> Result<HandLandmarkerResult>;
}

impl<L: HandLandmarker + ?Sized> HandLandmarker for Box<L> {
    fn process(&mut self, frame: &Frame) -> Result<HandLandmarkerResult> {
        (**self).process(frame)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunningMode {
    /// Frames are independent images.
    Image,
    /// Frames are consecutive; hands are tracked between them.
    Video,
}

#[derive(Clone, Debug)]
pub struct HandLandmarkerOptions {
    pub running_mode: RunningMode,
    pub max_num_hands: usize,
    pub min_detection_confidence: f32,
    pub min_tracking_confidence: f32,
}

impl Default for HandLandmarkerOptions {
    fn default() -> Self {
        Self {
            running_mode: RunningMode::Video,
            max_num_hands: 2,
            min_detection_confidence: 0.5,
            min_tracking_confidence: 0.5,
        }
    }
}

impl HandLandmarkerOptions {
    pub fn validate(&self) -> Result<()> {
        if self.max_num_hands == 0 {
            return Err(anyhow!("max_num_hands must be at least 1"));
        }
        for (name, value) in [
            ("min_detection_confidence", self.min_detection_confidence),
            ("min_tracking_confidence", self.min_tracking_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(anyhow!("{name} must be within [0, 1], got {value}"));
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct LandmarkerBackend {
    handpose_estimator_model_path: PathBuf,
    palm_detector_model_path: PathBuf,
}

impl LandmarkerBackend {
    pub fn new(handpose_estimator_model_path: PathBuf, palm_detector_model_path: PathBuf) -> Self {
        Self {
            handpose_estimator_model_path,
            palm_detector_model_path,
        }
    }

    pub fn handpose_estimator_model_path(&self) -> PathBuf {
        self.handpose_estimator_model_path.clone()
    }

    pub fn palm_detector_model_path(&self) -> PathBuf {
        self.palm_detector_model_path.clone()
    }

    pub fn label(&self) -> &'static str {
        "ort"
    }

    /// Opens a detector session, downloading missing models first.
    pub fn create(&self, options: HandLandmarkerOptions) -> Result<OrtHandLandmarker> {
        log::info!("starting hand landmarker backend: {}", self.label());

        ensure_model_ready(
            ModelKind::HandposeEstimator,
            &self.handpose_estimator_model_path,
            |_evt| {},
        )?;
        ensure_model_ready(
            ModelKind::PalmDetector,
            &self.palm_detector_model_path,
            |_evt| {},
        )?;

        let landmarker = OrtHandLandmarker::new(
            &self.handpose_estimator_model_path,
            &self.palm_detector_model_path,
            options.clone(),
        )?;
        log::info!(
            "hand landmarker ready using {} and palm detector {} ({:?})",
            self.handpose_estimator_model_path.display(),
            self.palm_detector_model_path.display(),
            options
        );
        Ok(landmarker)
    }
}

impl Default for LandmarkerBackend {
    fn default() -> Self {
        Self::new(
            default_handpose_estimator_model_path(),
            default_palm_detector_model_path(),
        )
    }
}
