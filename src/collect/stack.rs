use ndarray::{Array3, Array4, ArrayView3, Axis};

use super::Collector;
use crate::types::{Frame, HandLandmarkerResult, Landmark, NUM_LANDMARKS};

const NUM_DIMENSIONS: usize = 3;

/// Fixed-shape landmark arrays for a whole video.
///
/// Every frame contributes a `(max_num_hands, 21, 3)` slab to both the image
/// and the world array. Slots without a detected hand hold `NaN` in all three
/// coordinates. Image landmarks are in pixels: `(x·width, y·height, z·width)`.
#[derive(Debug)]
pub struct LandmarkStack {
    max_num_hands: usize,
    image: Vec<Array3<f64>>,
    world: Vec<Array3<f64>>,
}

impl LandmarkStack {
    pub fn new(max_num_hands: usize) -> Self {
        Self {
            max_num_hands,
            image: Vec::new(),
            world: Vec::new(),
        }
    }

    pub fn max_num_hands(&self) -> usize {
        self.max_num_hands
    }

    pub fn len(&self) -> usize {
        self.image.len()
    }

    pub fn is_empty(&self) -> bool {
        self.image.is_empty()
    }

    fn empty_slab(&self) -> Array3<f64> {
        Array3::from_elem((self.max_num_hands, NUM_LANDMARKS, NUM_DIMENSIONS), f64::NAN)
    }

    /// Image-space and world-space arrays of shape `(frames, max_num_hands, 21, 3)`.
    pub fn finish(self) -> (Array4<f64>, Array4<f64>) {
        let shape = (0, self.max_num_hands, NUM_LANDMARKS, NUM_DIMENSIONS);
        (stack_slabs(&self.image, shape), stack_slabs(&self.world, shape))
    }
}

fn stack_slabs(slabs: &[Array3<f64>], empty_shape: (usize, usize, usize, usize)) -> Array4<f64> {
    let views: Vec<ArrayView3<'_, f64>> = slabs.iter().map(|slab| slab.view()).collect();
    ndarray::stack(Axis(0), &views).unwrap_or_else(|_| Array4::zeros(empty_shape))
}

fn write_hand(slab: &mut Array3<f64>, slot: usize, landmarks: &[Landmark], scale: [f64; 3]) {
    for (idx, landmark) in landmarks.iter().enumerate() {
        slab[[slot, idx, 0]] = landmark.x as f64 * scale[0];
        slab[[slot, idx, 1]] = landmark.y as f64 * scale[1];
        slab[[slot, idx, 2]] = landmark.z as f64 * scale[2];
    }
}

impl Collector for LandmarkStack {
    fn collect(&mut self, frame: &Frame, result: &HandLandmarkerResult) {
        let (rows, cols, _) = frame.shape();
        let (rows, cols) = (rows as f64, cols as f64);
        let mut image = self.empty_slab();
        let mut world = self.empty_slab();

        if result.hands.len() > self.max_num_hands {
            log::warn!(
                "frame {}: {} hands detected, keeping the first {}",
                frame.index,
                result.hands.len(),
                self.max_num_hands
            );
        }

        for (slot, hand) in result.hands.iter().take(self.max_num_hands).enumerate() {
            write_hand(&mut image, slot, &hand.landmarks, [cols, rows, cols]);
            write_hand(&mut world, slot, &hand.world_landmarks, [1.0; 3]);
        }

        self.image.push(image);
        self.world.push(world);
    }
}
