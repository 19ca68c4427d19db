//! SSD anchors of the 192x192 palm detector.
//!
//! Consecutive layers sharing a stride are merged into one feature map. Each
//! layer contributes two fixed-size anchors per cell, which yields
//! 24x24x2 + 12x12x6 = 2016 anchors.

use crate::landmarker::common::PALM_INPUT_SIZE;

const STRIDES: [u32; 4] = [8, 16, 16, 16];
const ANCHORS_PER_LAYER: usize = 2;

pub const NUM_ANCHORS: usize = 2016;

/// Anchor centres as `[x, y]`, normalized to the detector input.
pub fn generate() -> Vec<[f32; 2]> {
    let mut anchors = Vec::with_capacity(NUM_ANCHORS);

    let mut layer = 0;
    while layer < STRIDES.len() {
        let stride = STRIDES[layer];
        let mut per_cell = 0;
        while layer < STRIDES.len() && STRIDES[layer] == stride {
            per_cell += ANCHORS_PER_LAYER;
            layer += 1;
        }

        let size = PALM_INPUT_SIZE.div_ceil(stride);
        for y in 0..size {
            for x in 0..size {
                let center = [
                    (x as f32 + 0.5) / size as f32,
                    (y as f32 + 0.5) / size as f32,
                ];
                anchors.extend(std::iter::repeat_n(center, per_cell));
            }
        }
    }

    anchors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anchor_count_matches_model_output() {
        assert_eq!(generate().len(), NUM_ANCHORS);
    }

    #[test]
    fn first_and_last_anchor_centres() {
        let anchors = generate();
        assert_eq!(anchors[0], [0.5 / 24.0, 0.5 / 24.0]);
        assert_eq!(anchors[1], anchors[0]);
        assert_eq!(anchors[NUM_ANCHORS - 1], [11.5 / 12.0, 11.5 / 12.0]);
        // first anchor of the stride-16 map
        assert_eq!(anchors[24 * 24 * 2], [0.5 / 12.0, 0.5 / 12.0]);
    }
}
