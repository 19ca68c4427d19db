use anyhow::Result;
use hand_harvest::{
    DetectionLog, LandmarkerBackend,
    config::{VERIFY_INPUT_FILENAME, VERIFY_OUTPUT_FILENAME, path_arg, verify_options},
    frames, run,
};

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let video_path = path_arg(&args, 0, VERIFY_INPUT_FILENAME);
    let output_path = path_arg(&args, 1, VERIFY_OUTPUT_FILENAME);

    let mut log = DetectionLog::new();
    {
        let mut landmarker = LandmarkerBackend::default().create(verify_options())?;
        run(frames::open(&video_path), &mut landmarker, &mut log)?;
    }

    log.write_json(&output_path)?;
    println!("Detections written to {}", output_path.display());

    Ok(())
}
