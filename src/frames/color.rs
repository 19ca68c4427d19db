use anyhow::{Result, anyhow};
use rayon::prelude::*;
use yuv::{
    YuvBiPlanarImage, YuvConversionMode, YuvPlanarImage, YuvRange, YuvStandardMatrix,
    yuv_nv12_to_rgb, yuv420_to_rgb,
};

#[derive(Clone, Copy, Debug)]
pub struct Plane<'a> {
    pub data: &'a [u8],
    pub stride: usize,
}

/// Decoded pixels as handed over by a decoder, before conversion to packed RGB.
#[derive(Clone, Copy, Debug)]
pub enum SourcePixels<'a> {
    Yuv420 {
        y: Plane<'a>,
        u: Plane<'a>,
        v: Plane<'a>,
        full_range: bool,
    },
    Nv12 {
        y: Plane<'a>,
        uv: Plane<'a>,
        full_range: bool,
    },
    Rgb24(Plane<'a>),
    Bgr24(Plane<'a>),
    Gray8(Plane<'a>),
}

pub fn convert_to_rgb(src: &SourcePixels<'_>, width: u32, height: u32) -> Result<Vec<u8>> {
    match *src {
        SourcePixels::Yuv420 {
            y,
            u,
            v,
            full_range,
        } => yuv420_planes_to_rgb(y, u, v, full_range, width, height),
        SourcePixels::Nv12 { y, uv, full_range } => {
            nv12_to_rgb(y, uv, full_range, width, height)
        }
        SourcePixels::Rgb24(plane) => rgb_like_to_rgb(plane, width, height, false),
        SourcePixels::Bgr24(plane) => rgb_like_to_rgb(plane, width, height, true),
        SourcePixels::Gray8(plane) => gray_to_rgb(plane, width, height),
    }
}

fn yuv_range(full_range: bool) -> YuvRange {
    if full_range {
        YuvRange::Full
    } else {
        YuvRange::Limited
    }
}

fn check_plane(name: &str, plane: Plane<'_>, row_len: usize, rows: usize) -> Result<()> {
    if plane.stride < row_len {
        return Err(anyhow!(
            "{name} stride {} shorter than row length {row_len}",
            plane.stride
        ));
    }
    let needed = plane.stride * rows.saturating_sub(1) + row_len;
    if rows > 0 && plane.data.len() < needed {
        return Err(anyhow!(
            "{name} buffer too small: got {}, expected {needed}",
            plane.data.len()
        ));
    }
    Ok(())
}

fn yuv420_planes_to_rgb(
    y: Plane<'_>,
    u: Plane<'_>,
    v: Plane<'_>,
    full_range: bool,
    width: u32,
    height: u32,
) -> Result<Vec<u8>> {
    let (w, h) = (width as usize, height as usize);
    let (cw, ch) = (w.div_ceil(2), h.div_ceil(2));
    check_plane("Y plane", y, w, h)?;
    check_plane("U plane", u, cw, ch)?;
    check_plane("V plane", v, cw, ch)?;

    let mut rgb = vec![0u8; w * h * 3];
    let image = YuvPlanarImage {
        y_plane: y.data,
        y_stride: y.stride as u32,
        u_plane: u.data,
        u_stride: u.stride as u32,
        v_plane: v.data,
        v_stride: v.stride as u32,
        width,
        height,
    };

    yuv420_to_rgb(
        &image,
        &mut rgb,
        width * 3,
        yuv_range(full_range),
        YuvStandardMatrix::Bt601,
    )
    .map_err(|err| anyhow!("YUV420→RGB failed: {err:?}"))?;

    Ok(rgb)
}

fn nv12_to_rgb(
    y: Plane<'_>,
    uv: Plane<'_>,
    full_range: bool,
    width: u32,
    height: u32,
) -> Result<Vec<u8>> {
    let (w, h) = (width as usize, height as usize);
    check_plane("Y plane", y, w, h)?;
    check_plane("UV plane", uv, w.div_ceil(2) * 2, h.div_ceil(2))?;

    let mut rgb = vec![0u8; w * h * 3];
    let image = YuvBiPlanarImage {
        y_plane: y.data,
        y_stride: y.stride as u32,
        uv_plane: uv.data,
        uv_stride: uv.stride as u32,
        width,
        height,
    };

    yuv_nv12_to_rgb(
        &image,
        &mut rgb,
        width * 3,
        yuv_range(full_range),
        YuvStandardMatrix::Bt601,
        YuvConversionMode::Balanced,
    )
    .map_err(|err| anyhow!("NV12→RGB failed: {err:?}"))?;

    Ok(rgb)
}

fn rgb_like_to_rgb(plane: Plane<'_>, width: u32, height: u32, swap_rb: bool) -> Result<Vec<u8>> {
    let row_len = width as usize * 3;
    check_plane("RGB plane", plane, row_len, height as usize)?;

    let mut rgb = vec![0u8; row_len * height as usize];
    if row_len == 0 {
        return Ok(rgb);
    }
    rgb.par_chunks_mut(row_len)
        .enumerate()
        .for_each(|(row, dst_row)| {
            let offset = row * plane.stride;
            let src_row = &plane.data[offset..offset + row_len];
            if swap_rb {
                for (dst, src) in dst_row.chunks_exact_mut(3).zip(src_row.chunks_exact(3)) {
                    dst[0] = src[2];
                    dst[1] = src[1];
                    dst[2] = src[0];
                }
            } else {
                dst_row.copy_from_slice(src_row);
            }
        });

    Ok(rgb)
}

fn gray_to_rgb(plane: Plane<'_>, width: u32, height: u32) -> Result<Vec<u8>> {
    let row_len = width as usize;
    check_plane("GRAY plane", plane, row_len, height as usize)?;

    let mut rgb = vec![0u8; row_len * height as usize * 3];
    if row_len == 0 {
        return Ok(rgb);
    }
    rgb.par_chunks_mut(row_len * 3)
        .enumerate()
        .for_each(|(row, dst_row)| {
            let offset = row * plane.stride;
            let src_row = &plane.data[offset..offset + row_len];
            for (dst, value) in dst_row.chunks_exact_mut(3).zip(src_row.iter().copied()) {
                dst[0] = value;
                dst[1] = value;
                dst[2] = value;
            }
        });

    Ok(rgb)
}
