use serde::Serialize;

pub const NUM_LANDMARKS: usize = 21;

/// A decoded video frame in packed RGB, `height × width × 3`, no row padding.
#[derive(Clone, Debug)]
pub struct Frame {
    pub index: usize,
    pub rgb: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl Frame {
    /// `(rows, cols, channels)`
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.height as usize, self.width as usize, 3)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Handedness {
    Left,
    Right,
}

impl Handedness {
    pub fn label(&self) -> &'static str {
        match self {
            Handedness::Left => "Left",
            Handedness::Right => "Right",
        }
    }

    /// Maps the estimator's raw handedness output to a label and the
    /// classification score of that label.
    pub fn from_raw(raw: f32) -> (Self, f32) {
        let raw = if raw.is_nan() { 0.0 } else { raw.clamp(0.0, 1.0) };
        if raw >= 0.5 {
            (Handedness::Right, raw)
        } else {
            (Handedness::Left, 1.0 - raw)
        }
    }
}

#[derive(Clone, Debug)]
pub struct DetectedHand {
    pub handedness: Handedness,
    pub score: f32,
    /// Normalized to image width/height; `z` shares the scale of `x`.
    pub landmarks: [Landmark; NUM_LANDMARKS],
    /// Metric coordinates in meters, centred on the hand.
    pub world_landmarks: [Landmark; NUM_LANDMARKS],
}

#[derive(Clone, Debug, Default)]
pub struct HandLandmarkerResult {
    pub hands: Vec<DetectedHand>,
}

impl HandLandmarkerResult {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.hands.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handedness_threshold_is_inclusive_for_right() {
        assert_eq!(Handedness::from_raw(0.5), (Handedness::Right, 0.5));
        let (label, score) = Handedness::from_raw(0.2);
        assert_eq!(label, Handedness::Left);
        assert!((score - 0.8).abs() < 1e-6);
    }

    #[test]
    fn handedness_score_stays_in_unit_range() {
        for raw in [-3.0, 0.0, 0.49, 1.0, 7.5, f32::NAN] {
            let (_, score) = Handedness::from_raw(raw);
            assert!((0.0..=1.0).contains(&score), "raw {raw} gave {score}");
        }
    }

    #[test]
    fn handedness_serializes_as_label() {
        let json = serde_json::to_string(&Handedness::Left).unwrap();
        assert_eq!(json, "\"Left\"");
        assert_eq!(Handedness::Right.label(), "Right");
    }
}
