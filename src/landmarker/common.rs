use anyhow::{Context, Result, anyhow};
use fast_image_resize as fir;
use ndarray::Array4;
use rayon::prelude::*;

use crate::types::{Frame, Landmark, NUM_LANDMARKS};

pub const HANDPOSE_INPUT_SIZE: u32 = 224;
pub const PALM_INPUT_SIZE: u32 = 192;

#[derive(Clone, Debug)]
pub struct LetterboxInfo {
    pub scale: f32,
    pub pad_x: f32,
    pub pad_y: f32,
    pub orig_w: u32,
    pub orig_h: u32,
}

/// Maps points of a square, rotated crop back into the source frame.
#[derive(Clone, Debug)]
pub struct CropTransform {
    pub center: (f32, f32),
    pub side: f32,
    pub angle: f32,
    pub output_size: u32,
}

fn check_frame(frame: &Frame) -> Result<()> {
    let expected_len = (frame.width as usize)
        .saturating_mul(frame.height as usize)
        .saturating_mul(3);
    if frame.rgb.len() != expected_len || expected_len == 0 {
        return Err(anyhow!(
            "frame buffer size mismatch: got {}, expected {} for {}x{}",
            frame.rgb.len(),
            expected_len,
            frame.width,
            frame.height
        ));
    }
    Ok(())
}

/// Letterboxes `frame` into a `target_size` square NHWC tensor scaled to [0, 1].
pub fn prepare_frame_with_size(
    frame: &Frame,
    target_size: u32,
) -> Result<(Array4<f32>, LetterboxInfo)> {
    check_frame(frame)?;

    let scale = target_size as f32 / (frame.width.max(frame.height) as f32);
    let new_w = ((frame.width as f32 * scale).round() as u32).clamp(1, target_size);
    let new_h = ((frame.height as f32 * scale).round() as u32).clamp(1, target_size);

    let src_image = fir::images::Image::from_vec_u8(
        frame.width,
        frame.height,
        frame.rgb.clone(),
        fir::PixelType::U8x3,
    )?;
    let mut dst_image = fir::images::Image::new(new_w, new_h, fir::PixelType::U8x3);
    let mut resizer = fir::Resizer::new();
    let resize_options = fir::ResizeOptions::new()
        .resize_alg(fir::ResizeAlg::Interpolation(fir::FilterType::Bilinear));
    resizer
        .resize(&src_image, &mut dst_image, Some(&resize_options))
        .context("fast resize failed")?;
    let resized = dst_image.into_vec();

    let pad_x = ((target_size - new_w) / 2) as usize;
    let pad_y = ((target_size - new_h) / 2) as usize;
    let mut canvas = vec![0u8; (target_size as usize) * (target_size as usize) * 3];
    let dst_stride = target_size as usize * 3;
    let src_stride = new_w as usize * 3;
    for row in 0..(new_h as usize) {
        let dst_offset = (pad_y + row) * dst_stride + pad_x * 3;
        let src_offset = row * src_stride;
        canvas[dst_offset..dst_offset + src_stride]
            .copy_from_slice(&resized[src_offset..src_offset + src_stride]);
    }

    let normalized: Vec<f32> = canvas.par_iter().map(|v| *v as f32 / 255.0).collect();
    let input = Array4::<f32>::from_shape_vec(
        (1, target_size as usize, target_size as usize, 3),
        normalized,
    )
    .map_err(|err| anyhow!("failed to build input tensor: {err}"))?;

    let letterbox = LetterboxInfo {
        scale,
        pad_x: pad_x as f32,
        pad_y: pad_y as f32,
        orig_w: frame.width,
        orig_h: frame.height,
    };

    Ok((input, letterbox))
}

pub fn decode_landmarks(flat: &[f32]) -> Result<[[f32; 3]; NUM_LANDMARKS]> {
    if flat.len() < NUM_LANDMARKS * 3 {
        return Err(anyhow!(
            "unexpected landmarks length: got {}, need {}",
            flat.len(),
            NUM_LANDMARKS * 3
        ));
    }

    let mut landmarks = [[0.0; 3]; NUM_LANDMARKS];
    for (slot, chunk) in landmarks.iter_mut().zip(flat.chunks_exact(3)) {
        *slot = [chunk[0], chunk[1], chunk[2]];
    }
    Ok(landmarks)
}

/// Samples a rotated square of `side` pixels around `center` into an
/// `output_size` NHWC tensor, bilinear, black outside the frame.
pub fn prepare_rotated_crop(
    frame: &Frame,
    center: (f32, f32),
    side: f32,
    angle: f32,
    output_size: u32,
) -> Result<(Array4<f32>, CropTransform)> {
    check_frame(frame)?;

    let half = output_size as f32 / 2.0;
    let scale = side / output_size as f32;
    let cos = angle.cos();
    let sin = angle.sin();

    let row_len = output_size as usize * 3;
    let mut data = vec![0.0f32; row_len * output_size as usize];
    data.par_chunks_mut(row_len)
        .enumerate()
        .for_each(|(y, row)| {
            let dy = (y as f32 + 0.5 - half) * scale;
            for (x, px) in row.chunks_exact_mut(3).enumerate() {
                let dx = (x as f32 + 0.5 - half) * scale;
                let src_x = center.0 + dx * cos - dy * sin;
                let src_y = center.1 + dx * sin + dy * cos;
                px.copy_from_slice(&sample_rgb(frame, src_x, src_y));
            }
        });

    let array =
        Array4::<f32>::from_shape_vec((1, output_size as usize, output_size as usize, 3), data)
            .map_err(|err| anyhow!("failed to build rotated crop tensor: {err}"))?;

    let transform = CropTransform {
        center,
        side,
        angle,
        output_size,
    };

    Ok((array, transform))
}

impl CropTransform {
    /// Crop pixel coordinates to frame pixel coordinates; `z` is rescaled by
    /// the same factor as `x` and `y`.
    pub fn project(&self, point: [f32; 3]) -> Landmark {
        let half = self.output_size as f32 / 2.0;
        let scale = self.side / self.output_size as f32;
        let dx = (point[0] - half) * scale;
        let dy = (point[1] - half) * scale;
        let cos = self.angle.cos();
        let sin = self.angle.sin();
        Landmark {
            x: self.center.0 + dx * cos - dy * sin,
            y: self.center.1 + dx * sin + dy * cos,
            z: point[2] * scale,
        }
    }

    /// Undoes the crop rotation on metric landmarks.
    pub fn rotate_world(&self, point: [f32; 3]) -> Landmark {
        let cos = self.angle.cos();
        let sin = self.angle.sin();
        Landmark {
            x: point[0] * cos - point[1] * sin,
            y: point[0] * sin + point[1] * cos,
            z: point[2],
        }
    }
}

fn sample_rgb(frame: &Frame, x: f32, y: f32) -> [f32; 3] {
    if x.is_nan() || y.is_nan() {
        return [0.0, 0.0, 0.0];
    }
    let x0 = x.floor();
    let y0 = y.floor();
    let x1 = x0 + 1.0;
    let y1 = y0 + 1.0;

    let (w, h) = (frame.width as i32, frame.height as i32);
    let fetch = |cx: f32, cy: f32| -> [f32; 3] {
        let ix = cx as i32;
        let iy = cy as i32;
        if ix < 0 || iy < 0 || ix >= w || iy >= h {
            return [0.0, 0.0, 0.0];
        }
        let idx = (iy as usize * frame.width as usize + ix as usize) * 3;
        [
            frame.rgb[idx] as f32 / 255.0,
            frame.rgb[idx + 1] as f32 / 255.0,
            frame.rgb[idx + 2] as f32 / 255.0,
        ]
    };

    let fx = x - x0;
    let fy = y - y0;
    let c00 = fetch(x0, y0);
    let c10 = fetch(x1, y0);
    let c01 = fetch(x0, y1);
    let c11 = fetch(x1, y1);

    let lerp = |a: f32, b: f32, t: f32| a + (b - a) * t;
    [
        lerp(lerp(c00[0], c10[0], fx), lerp(c01[0], c11[0], fx), fy),
        lerp(lerp(c00[1], c10[1], fx), lerp(c01[1], c11[1], fx), fy),
        lerp(lerp(c00[2], c10[2], fx), lerp(c01[2], c11[2], fx), fy),
    ]
}
