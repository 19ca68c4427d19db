use anyhow::Result;
use hand_harvest::{
    LandmarkStack, LandmarkerBackend,
    config::{SMOKE_INPUT_FILENAME, path_arg, smoke_options},
    frames, run,
};
use ndarray::Axis;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let video_path = path_arg(&args, 0, SMOKE_INPUT_FILENAME);

    let options = smoke_options();
    let mut stack = LandmarkStack::new(options.max_num_hands);
    let mut landmarker = LandmarkerBackend::default().create(options)?;
    run(frames::open(&video_path), &mut landmarker, &mut stack)?;
    drop(landmarker);

    let (landmarks, world_landmarks) = stack.finish();
    let frames_with_hand = landmarks
        .axis_iter(Axis(0))
        .filter(|frame| frame.iter().any(|v| !v.is_nan()))
        .count();

    log::info!(
        "{}: landmarks {:?}, world landmarks {:?}, {} frame(s) with a hand",
        video_path.display(),
        landmarks.shape(),
        world_landmarks.shape(),
        frames_with_hand
    );

    Ok(())
}
