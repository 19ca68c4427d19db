mod stack;
mod verify;

use anyhow::{Context, Result};

use crate::{
    landmarker::HandLandmarker,
    types::{Frame, HandLandmarkerResult},
};

pub use stack::LandmarkStack;
pub use verify::{DetectionLog, FrameRecord, HandRecord};

/// Receives every frame together with what the landmarker found in it.
pub trait Collector {
    fn collect(&mut self, frame: &Frame, result: &HandLandmarkerResult);
}

impl<C: Collector + ?Sized> Collector for &mut C {
    fn collect(&mut self, frame: &Frame, result: &HandLandmarkerResult) {
        (**self).collect(frame, result)
    }
}

/// Feeds every frame to `landmarker` and hands the result to `collector`.
///
/// Returns the number of frames processed. A landmarker error stops the run
/// and is returned as is; frames collected before it stay in `collector`.
pub fn run<I, L, C>(frames: I, landmarker: &mut L, collector: &mut C) -> Result<usize>
where
    I: IntoIterator<Item = Frame>,
    L: HandLandmarker + ?Sized,
    C: Collector + ?Sized,
{
    let mut processed = 0;
    for frame in frames {
        let result = landmarker
            .process(&frame)
            .with_context(|| format!("hand landmarker failed on frame {}", frame.index))?;
        log::debug!("frame {}: {} hand(s)", frame.index, result.hands.len());
        collector.collect(&frame, &result);
        processed += 1;
    }
    log::info!("processed {processed} frames");
    Ok(processed)
}
