use std::{
    env,
    path::{Path, PathBuf},
};

use crate::landmarker::{HandLandmarkerOptions, RunningMode};

pub const VERIFY_INPUT_FILENAME: &str = "input.avi";
pub const VERIFY_OUTPUT_FILENAME: &str = "verified-detections.json";
pub const SMOKE_INPUT_FILENAME: &str = "video.avi";

/// Detector settings for writing verified detections.
pub fn verify_options() -> HandLandmarkerOptions {
    HandLandmarkerOptions {
        running_mode: RunningMode::Video,
        max_num_hands: 2,
        min_detection_confidence: 0.5,
        min_tracking_confidence: 0.5,
    }
}

/// Detector settings for the numeric smoke test on a video.
pub fn smoke_options() -> HandLandmarkerOptions {
    HandLandmarkerOptions {
        running_mode: RunningMode::Video,
        max_num_hands: 1,
        min_detection_confidence: 0.5,
        ..HandLandmarkerOptions::default()
    }
}

/// `name` resolved next to the running executable, or against the working
/// directory when the executable location is unknown.
pub fn beside_executable(name: impl AsRef<Path>) -> PathBuf {
    let dir = env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf));
    match dir {
        Some(dir) => dir.join(name),
        None => PathBuf::from(name.as_ref()),
    }
}

/// Positional argument `index` as a path, or `default_name` beside the executable.
pub fn path_arg(args: &[String], index: usize, default_name: &str) -> PathBuf {
    args.get(index)
        .map(PathBuf::from)
        .unwrap_or_else(|| beside_executable(default_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_sit_next_to_the_executable() {
        let path = beside_executable(VERIFY_OUTPUT_FILENAME);
        assert_eq!(path.file_name().unwrap(), VERIFY_OUTPUT_FILENAME);
        let exe = env::current_exe().unwrap();
        assert_eq!(path.parent(), exe.parent());
    }

    #[test]
    fn explicit_argument_wins() {
        let args = vec!["clip.mp4".to_string()];
        assert_eq!(path_arg(&args, 0, SMOKE_INPUT_FILENAME), PathBuf::from("clip.mp4"));
        assert!(path_arg(&args, 1, SMOKE_INPUT_FILENAME).ends_with(SMOKE_INPUT_FILENAME));
    }

    #[test]
    fn smoke_test_tracks_one_hand() {
        assert_eq!(smoke_options().max_num_hands, 1);
        assert_eq!(verify_options().max_num_hands, 2);
        assert!(smoke_options().validate().is_ok());
    }
}
