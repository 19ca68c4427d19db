use std::{
    fs,
    iter::FusedIterator,
    path::{Path, PathBuf},
    vec,
};

use anyhow::{Context, Result};

use crate::types::Frame;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// Frames read from a directory of still images, in file-name order.
///
/// Images are decoded lazily; the first one that fails to decode ends the
/// sequence.
pub struct ImageSequence {
    files: Option<vec::IntoIter<PathBuf>>,
    next_index: usize,
}

impl ImageSequence {
    pub fn open(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        match list_images(dir) {
            Ok(files) => {
                log::debug!("reading {} images from {}", files.len(), dir.display());
                Self {
                    files: Some(files.into_iter()),
                    next_index: 0,
                }
            }
            Err(err) => {
                log::warn!("{err:#}, no frames will be produced");
                Self {
                    files: None,
                    next_index: 0,
                }
            }
        }
    }
}

fn list_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("failed to read image directory {}", dir.display()))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry
            .with_context(|| format!("failed to list {}", dir.display()))?
            .path();
        let is_image = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                IMAGE_EXTENSIONS
                    .iter()
                    .any(|known| ext.eq_ignore_ascii_case(known))
            });
        if is_image && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn decode_image(path: &Path) -> Result<(Vec<u8>, u32, u32)> {
    let image = image::open(path)
        .with_context(|| format!("failed to decode {}", path.display()))?
        .to_rgb8();
    let (width, height) = image.dimensions();
    Ok((image.into_raw(), width, height))
}

impl Iterator for ImageSequence {
    type Item = Frame;

    fn next(&mut self) -> Option<Frame> {
        let path = self.files.as_mut()?.next();
        let Some(path) = path else {
            self.files = None;
            return None;
        };

        match decode_image(&path) {
            Ok((rgb, width, height)) => {
                let frame = Frame {
                    index: self.next_index,
                    rgb,
                    width,
                    height,
                };
                self.next_index += 1;
                Some(frame)
            }
            Err(err) => {
                log::warn!("stopping image sequence at frame {}: {err:#}", self.next_index);
                self.files = None;
                None
            }
        }
    }
}

impl FusedIterator for ImageSequence {}
