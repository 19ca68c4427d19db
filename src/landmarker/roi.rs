use std::f32::consts::{FRAC_PI_2, PI};

use super::palm::{PALM_MIDDLE_FINGER_MCP, PALM_WRIST, PalmRegion};
use crate::types::{Landmark, NUM_LANDMARKS};

const WRIST: usize = 0;
const INDEX_FINGER_MCP: usize = 5;
const MIDDLE_FINGER_MCP: usize = 9;
const RING_FINGER_MCP: usize = 13;

const PALM_SCALE: f32 = 2.6;
const PALM_SHIFT_Y: f32 = -0.5;
const LANDMARK_SCALE: f32 = 2.0;
const LANDMARK_SHIFT_Y: f32 = -0.1;

/// A rotated square region of the frame holding one hand, in pixels.
///
/// `angle` rotates the crop so that the fingers point up.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HandRoi {
    pub center: (f32, f32),
    pub side: f32,
    pub angle: f32,
}

impl HandRoi {
    pub fn from_palm(palm: &PalmRegion) -> Self {
        let angle = match (
            palm.landmarks.get(PALM_WRIST),
            palm.landmarks.get(PALM_MIDDLE_FINGER_MCP),
        ) {
            (Some(wrist), Some(mcp)) => rotation(*wrist, *mcp),
            _ => 0.0,
        };
        let width = (palm.bbox[2] - palm.bbox[0]).abs();
        let height = (palm.bbox[3] - palm.bbox[1]).abs();
        let center = (
            (palm.bbox[0] + palm.bbox[2]) * 0.5,
            (palm.bbox[1] + palm.bbox[3]) * 0.5,
        );

        Self::shifted(center, width, height, angle, PALM_SHIFT_Y, PALM_SCALE)
    }

    /// Region to track a hand into the next frame; `points` are frame pixels.
    pub fn from_landmarks(points: &[Landmark; NUM_LANDMARKS]) -> Self {
        let wrist = (points[WRIST].x, points[WRIST].y);
        let knuckles = [INDEX_FINGER_MCP, RING_FINGER_MCP]
            .iter()
            .fold((0.0, 0.0), |acc, idx| {
                (acc.0 + points[*idx].x * 0.5, acc.1 + points[*idx].y * 0.5)
            });
        let middle = (points[MIDDLE_FINGER_MCP].x, points[MIDDLE_FINGER_MCP].y);
        let target = ((knuckles.0 + middle.0) * 0.5, (knuckles.1 + middle.1) * 0.5);
        let angle = rotation(wrist, target);

        // Axis-aligned bounds in the rotated frame.
        let (cos, sin) = (angle.cos(), angle.sin());
        let (mut min_u, mut max_u) = (f32::MAX, f32::MIN);
        let (mut min_v, mut max_v) = (f32::MAX, f32::MIN);
        for p in points {
            let u = p.x * cos + p.y * sin;
            let v = -p.x * sin + p.y * cos;
            min_u = min_u.min(u);
            max_u = max_u.max(u);
            min_v = min_v.min(v);
            max_v = max_v.max(v);
        }
        let (mid_u, mid_v) = ((min_u + max_u) * 0.5, (min_v + max_v) * 0.5);
        let center = (mid_u * cos - mid_v * sin, mid_u * sin + mid_v * cos);

        Self::shifted(
            center,
            max_u - min_u,
            max_v - min_v,
            angle,
            LANDMARK_SHIFT_Y,
            LANDMARK_SCALE,
        )
    }

    fn shifted(
        center: (f32, f32),
        width: f32,
        height: f32,
        angle: f32,
        shift_y: f32,
        scale: f32,
    ) -> Self {
        let center = (
            center.0 - height * shift_y * angle.sin(),
            center.1 + height * shift_y * angle.cos(),
        );
        Self {
            center,
            side: width.max(height) * scale,
            angle,
        }
    }

    pub fn contains(&self, point: (f32, f32)) -> bool {
        let (dx, dy) = (point.0 - self.center.0, point.1 - self.center.1);
        let (cos, sin) = (self.angle.cos(), self.angle.sin());
        let u = dx * cos + dy * sin;
        let v = -dx * sin + dy * cos;
        let half = self.side * 0.5;
        u.abs() <= half && v.abs() <= half
    }
}

/// Angle that turns the `from → to` direction to point straight up.
fn rotation(from: (f32, f32), to: (f32, f32)) -> f32 {
    let angle = FRAC_PI_2 - (-(to.1 - from.1)).atan2(to.0 - from.0);
    normalize_radians(angle)
}

fn normalize_radians(angle: f32) -> f32 {
    angle - 2.0 * PI * ((angle + PI) / (2.0 * PI)).floor()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upright_palm() -> PalmRegion {
        let mut landmarks = vec![(50.0, 50.0); 7];
        landmarks[PALM_WRIST] = (50.0, 60.0);
        landmarks[PALM_MIDDLE_FINGER_MCP] = (50.0, 40.0);
        PalmRegion {
            bbox: [40.0, 40.0, 60.0, 60.0],
            landmarks,
            score: 0.9,
        }
    }

    #[test]
    fn upright_palm_needs_no_rotation() {
        let roi = HandRoi::from_palm(&upright_palm());
        assert!(roi.angle.abs() < 1e-6);
        assert!((roi.side - 52.0).abs() < 1e-4);
        // shifted towards the fingers
        assert!((roi.center.0 - 50.0).abs() < 1e-4);
        assert!((roi.center.1 - 40.0).abs() < 1e-4);
    }

    #[test]
    fn sideways_palm_rotates_a_quarter_turn() {
        let mut palm = upright_palm();
        palm.landmarks[PALM_WRIST] = (40.0, 50.0);
        palm.landmarks[PALM_MIDDLE_FINGER_MCP] = (60.0, 50.0);
        let roi = HandRoi::from_palm(&palm);
        assert!((roi.angle - FRAC_PI_2).abs() < 1e-5);
        assert!((roi.center.0 - 60.0).abs() < 1e-4);
        assert!((roi.center.1 - 50.0).abs() < 1e-4);
    }

    #[test]
    fn palm_crossing_the_left_edge_stays_centred_on_the_hand() {
        let mut landmarks = vec![(0.0, 60.0); 7];
        landmarks[PALM_WRIST] = (0.0, 75.0);
        landmarks[PALM_MIDDLE_FINGER_MCP] = (0.0, 45.0);
        let palm = PalmRegion {
            bbox: [-20.0, 40.0, 20.0, 80.0],
            landmarks,
            score: 0.9,
        };

        let roi = HandRoi::from_palm(&palm);
        assert!(roi.angle.abs() < 1e-6);
        assert!(roi.center.0.abs() < 1e-4);
        assert!((roi.center.1 - 40.0).abs() < 1e-4);
        assert!((roi.side - 104.0).abs() < 1e-3);
    }

    #[test]
    fn rotation_is_normalized() {
        let angle = rotation((0.0, 0.0), (-1.0, 0.0));
        assert!((angle + FRAC_PI_2).abs() < 1e-5);
        let down = rotation((0.0, 0.0), (0.0, 1.0));
        assert!((down.abs() - PI).abs() < 1e-5);
    }

    #[test]
    fn landmark_roi_covers_the_hand() {
        let mut points = [Landmark::default(); NUM_LANDMARKS];
        for (i, p) in points.iter_mut().enumerate() {
            *p = Landmark::new(100.0 + (i % 5) as f32 * 10.0, 200.0 - (i / 5) as f32 * 10.0, 0.0);
        }
        points[WRIST] = Landmark::new(120.0, 210.0, 0.0);
        let roi = HandRoi::from_landmarks(&points);

        for p in &points {
            assert!(roi.contains((p.x, p.y)), "{p:?} outside {roi:?}");
        }
        assert!(!roi.contains((0.0, 0.0)));
    }
}
