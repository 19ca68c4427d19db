//! Runs a hand landmark detector over the frames of a video and collects the
//! per-frame landmarks, either as a JSON detection log or as fixed-shape
//! numeric arrays.

pub mod collect;
pub mod config;
pub mod frames;
pub mod landmarker;
pub mod model_download;
pub mod types;

pub use collect::{Collector, DetectionLog, LandmarkStack, run};
pub use landmarker::{
    HandLandmarker, HandLandmarkerOptions, LandmarkerBackend, OrtHandLandmarker, RunningMode,
};
pub use types::{DetectedHand, Frame, HandLandmarkerResult, Handedness, Landmark, NUM_LANDMARKS};
