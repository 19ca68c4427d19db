use anyhow::Result;

use super::{HandLandmarkerOptions, RunningMode, palm::PalmRegion, roi::HandRoi};
use crate::types::{DetectedHand, Frame, HandLandmarkerResult, Handedness, Landmark, NUM_LANDMARKS};

/// Hand-pose model output for one region, projected back to the frame.
pub struct HandEstimate {
    /// Frame pixels; `z` shares the scale of `x`.
    pub landmarks: [Landmark; NUM_LANDMARKS],
    pub world_landmarks: [Landmark; NUM_LANDMARKS],
    pub presence: f32,
    /// Raw handedness output, `>= 0.5` meaning a right hand.
    pub handedness: f32,
}

/// The two model stages the tracker drives.
pub trait HandInference {
    fn detect_palms(&mut self, frame: &Frame) -> Result<Vec<PalmRegion>>;
    fn estimate_hand(&mut self, frame: &Frame, roi: &HandRoi) -> Result<HandEstimate>;
}

/// Decides which regions get a hand-pose pass and which hands survive.
///
/// In [`RunningMode::Video`] accepted hands are tracked into the next frame
/// from their landmarks, and the palm detector only runs while fewer than
/// `max_num_hands` hands are being tracked.
pub struct HandTracker {
    options: HandLandmarkerOptions,
    tracked: Vec<HandRoi>,
}

impl HandTracker {
    pub fn new(options: HandLandmarkerOptions) -> Self {
        Self {
            options,
            tracked: Vec::new(),
        }
    }

    pub fn options(&self) -> &HandLandmarkerOptions {
        &self.options
    }

    pub fn tracked(&self) -> &[HandRoi] {
        &self.tracked
    }

    fn presence_threshold(&self) -> f32 {
        match self.options.running_mode {
            RunningMode::Video => self.options.min_tracking_confidence,
            RunningMode::Image => self.options.min_detection_confidence,
        }
    }

    pub fn process<I>(&mut self, inference: &mut I, frame: &Frame) -> Result<HandLandmarkerResult>
    where
        I: HandInference + ?Sized,
    {
        let max_hands = self.options.max_num_hands;
        let mut rois = match self.options.running_mode {
            RunningMode::Video => std::mem::take(&mut self.tracked),
            RunningMode::Image => Vec::new(),
        };

        if rois.len() < max_hands {
            let palms = inference.detect_palms(frame)?;
            for palm in &palms {
                if rois.len() >= max_hands {
                    break;
                }
                let roi = HandRoi::from_palm(palm);
                if rois.iter().any(|tracked| tracked.contains(roi.center)) {
                    continue;
                }
                rois.push(roi);
            }
        }

        let threshold = self.presence_threshold();
        let (width, height) = (frame.width as f32, frame.height as f32);
        let mut hands = Vec::with_capacity(rois.len());
        let mut next_rois: Vec<HandRoi> = Vec::with_capacity(rois.len());

        for roi in &rois {
            let estimate = inference.estimate_hand(frame, roi)?;
            if estimate.presence < threshold {
                log::trace!(
                    "frame {}: dropping hand with presence {:.3}",
                    frame.index,
                    estimate.presence
                );
                continue;
            }

            let next_roi = HandRoi::from_landmarks(&estimate.landmarks);
            if next_rois
                .iter()
                .any(|accepted| accepted.contains(next_roi.center))
            {
                continue;
            }

            let (handedness, score) = Handedness::from_raw(estimate.handedness);
            hands.push(DetectedHand {
                handedness,
                score,
                landmarks: estimate
                    .landmarks
                    .map(|p| Landmark::new(p.x / width, p.y / height, p.z / width)),
                world_landmarks: estimate.world_landmarks,
            });
            next_rois.push(next_roi);
        }

        if self.options.running_mode == RunningMode::Video {
            self.tracked = next_rois;
        }

        Ok(HandLandmarkerResult { hands })
    }
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;

    use super::*;
    use crate::landmarker::palm::{PALM_LANDMARKS, PALM_MIDDLE_FINGER_MCP, PALM_WRIST};

    const SIZE: u32 = 100;

    fn frame(index: usize) -> Frame {
        Frame {
            index,
            rgb: vec![0; (SIZE * SIZE * 3) as usize],
            width: SIZE,
            height: SIZE,
        }
    }

    fn palm(cx: f32, cy: f32) -> PalmRegion {
        let mut landmarks = vec![(cx, cy); PALM_LANDMARKS];
        landmarks[PALM_WRIST] = (cx, cy + 10.0);
        landmarks[PALM_MIDDLE_FINGER_MCP] = (cx, cy - 10.0);
        PalmRegion {
            bbox: [cx - 10.0, cy - 10.0, cx + 10.0, cy + 10.0],
            landmarks,
            score: 0.9,
        }
    }

    /// An upright hand spread around `center`, wrist below it.
    fn hand_points(center: (f32, f32)) -> [Landmark; NUM_LANDMARKS] {
        std::array::from_fn(|i| {
            if i == 0 {
                return Landmark::new(center.0, center.1 + 10.0, 0.0);
            }
            let (col, row) = ((i - 1) % 5, (i - 1) / 5);
            Landmark::new(
                center.0 - 8.0 + col as f32 * 4.0,
                center.1 + 6.0 - row as f32 * 4.0,
                -2.0,
            )
        })
    }

    /// Fixed palms on every frame and a hand centred on whatever region it is given.
    struct Scripted {
        palms: Vec<PalmRegion>,
        presence: f32,
        handedness: f32,
        palm_calls: usize,
        estimated: Vec<HandRoi>,
        fail_estimate: bool,
    }

    impl Scripted {
        fn new(palms: Vec<PalmRegion>) -> Self {
            Self {
                palms,
                presence: 0.9,
                handedness: 0.8,
                palm_calls: 0,
                estimated: Vec::new(),
                fail_estimate: false,
            }
        }
    }

    impl HandInference for Scripted {
        fn detect_palms(&mut self, _frame: &Frame) -> Result<Vec<PalmRegion>> {
            self.palm_calls += 1;
            Ok(self.palms.clone())
        }

        fn estimate_hand(&mut self, _frame: &Frame, roi: &HandRoi) -> Result<HandEstimate> {
            if self.fail_estimate {
                return Err(anyhow!("handpose model returned an empty presence tensor"));
            }
            self.estimated.push(*roi);
            Ok(HandEstimate {
                landmarks: hand_points(roi.center),
                world_landmarks: [Landmark::new(0.01, 0.02, 0.03); NUM_LANDMARKS],
                presence: self.presence,
                handedness: self.handedness,
            })
        }
    }

    fn options(running_mode: RunningMode, max_num_hands: usize) -> HandLandmarkerOptions {
        HandLandmarkerOptions {
            running_mode,
            max_num_hands,
            ..HandLandmarkerOptions::default()
        }
    }

    #[test]
    fn video_mode_tracks_without_redetecting() {
        let mut tracker = HandTracker::new(options(RunningMode::Video, 1));
        let mut models = Scripted::new(vec![palm(50.0, 50.0)]);

        let first = tracker.process(&mut models, &frame(0)).unwrap();
        let second = tracker.process(&mut models, &frame(1)).unwrap();

        assert_eq!(first.hands.len(), 1);
        assert_eq!(second.hands.len(), 1);
        assert_eq!(models.palm_calls, 1);
        assert_eq!(models.estimated.len(), 2);
        let carried = models.estimated[1].center;
        assert!((carried.0 - 50.0).abs() < 10.0 && (carried.1 - 40.0).abs() < 10.0);
        assert_eq!(tracker.tracked().len(), 1);
    }

    #[test]
    fn image_mode_detects_on_every_frame() {
        let mut tracker = HandTracker::new(options(RunningMode::Image, 1));
        let mut models = Scripted::new(vec![palm(50.0, 50.0)]);

        for index in 0..3 {
            assert_eq!(tracker.process(&mut models, &frame(index)).unwrap().hands.len(), 1);
        }
        assert_eq!(models.palm_calls, 3);
        assert!(tracker.tracked().is_empty());
    }

    #[test]
    fn reports_at_most_max_num_hands() {
        let mut tracker = HandTracker::new(options(RunningMode::Video, 2));
        let mut models = Scripted::new(vec![palm(20.0, 20.0), palm(50.0, 50.0), palm(80.0, 80.0)]);

        let result = tracker.process(&mut models, &frame(0)).unwrap();
        assert_eq!(result.hands.len(), 2);
        assert_eq!(models.estimated.len(), 2);
        assert_eq!(tracker.tracked().len(), 2);
    }

    #[test]
    fn palm_over_a_tracked_hand_is_not_estimated_twice() {
        let mut tracker = HandTracker::new(options(RunningMode::Video, 2));
        let mut models = Scripted::new(vec![palm(50.0, 50.0)]);

        tracker.process(&mut models, &frame(0)).unwrap();
        let second = tracker.process(&mut models, &frame(1)).unwrap();

        // one slot free, so the detector runs again but its palm is the tracked hand
        assert_eq!(models.palm_calls, 2);
        assert_eq!(models.estimated.len(), 2);
        assert_eq!(second.hands.len(), 1);
    }

    #[test]
    fn presence_threshold_follows_running_mode() {
        let gated = |running_mode| {
            let mut tracker = HandTracker::new(HandLandmarkerOptions {
                running_mode,
                max_num_hands: 1,
                min_detection_confidence: 0.8,
                min_tracking_confidence: 0.3,
            });
            let mut models = Scripted::new(vec![palm(50.0, 50.0)]);
            models.presence = 0.5;
            tracker.process(&mut models, &frame(0)).unwrap().hands.len()
        };

        assert_eq!(gated(RunningMode::Video), 1);
        assert_eq!(gated(RunningMode::Image), 0);
    }

    #[test]
    fn dropped_hands_are_not_tracked() {
        let mut tracker = HandTracker::new(options(RunningMode::Video, 1));
        let mut models = Scripted::new(vec![palm(50.0, 50.0)]);
        models.presence = 0.1;

        assert!(tracker.process(&mut models, &frame(0)).unwrap().is_empty());
        assert!(tracker.tracked().is_empty());
        tracker.process(&mut models, &frame(1)).unwrap();
        assert_eq!(models.palm_calls, 2);
    }

    #[test]
    fn landmarks_are_normalized_to_the_frame() {
        let mut tracker = HandTracker::new(options(RunningMode::Video, 1));
        let mut models = Scripted::new(vec![palm(50.0, 50.0)]);
        models.handedness = 0.2;

        let result = tracker.process(&mut models, &frame(0)).unwrap();
        let hand = &result.hands[0];
        let roi = models.estimated[0];
        assert!((hand.landmarks[0].x - roi.center.0 / SIZE as f32).abs() < 1e-6);
        assert!((hand.landmarks[0].y - (roi.center.1 + 10.0) / SIZE as f32).abs() < 1e-6);
        assert!((hand.landmarks[1].z + 2.0 / SIZE as f32).abs() < 1e-6);
        assert_eq!(hand.world_landmarks[0], Landmark::new(0.01, 0.02, 0.03));
        assert_eq!(hand.handedness, Handedness::Left);
        assert!((hand.score - 0.8).abs() < 1e-6);
    }

    #[test]
    fn estimate_errors_propagate() {
        let mut tracker = HandTracker::new(options(RunningMode::Video, 1));
        let mut models = Scripted::new(vec![palm(50.0, 50.0)]);
        models.fail_estimate = true;

        let err = tracker.process(&mut models, &frame(0)).unwrap_err();
        assert!(err.to_string().contains("presence"));
    }
}
