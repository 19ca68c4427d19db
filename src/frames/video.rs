use std::{
    iter::FusedIterator,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow};
use ffmpeg_next as ffmpeg;
use ffmpeg_next::{
    format::Pixel,
    software::scaling::{context::Context as Scaler, flag::Flags},
    util::{color::Range, error::EAGAIN, frame::video::Video as VideoFrame},
};
use thiserror::Error;

use super::color::{self, Plane, SourcePixels};
use crate::types::Frame;

#[derive(Debug, Error)]
pub enum VideoError {
    #[error("failed to initialise ffmpeg")]
    Init(#[source] ffmpeg::Error),
    #[error("failed to open {}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: ffmpeg::Error,
    },
    #[error("{} has no video stream", .path.display())]
    NoVideoStream { path: PathBuf },
    #[error("failed to set up a decoder for {}", .path.display())]
    Decoder {
        path: PathBuf,
        #[source]
        source: ffmpeg::Error,
    },
}

/// Sequential frames of a video file, decoded with ffmpeg and converted to RGB.
///
/// The sequence is lazy and cannot be restarted. A file that cannot be opened
/// yields no frames; a read or decode failure ends the sequence early.
pub struct VideoFrames {
    state: Option<Decoding>,
    next_index: usize,
}

impl VideoFrames {
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Decoding::open(path) {
            Ok(decoding) => {
                log::debug!(
                    "decoding {} ({}x{} {:?})",
                    path.display(),
                    decoding.decoder.width(),
                    decoding.decoder.height(),
                    decoding.decoder.format()
                );
                Self {
                    state: Some(decoding),
                    next_index: 0,
                }
            }
            Err(err) => {
                log::warn!(
                    "{:#}, no frames will be produced",
                    anyhow::Error::from(err)
                );
                Self {
                    state: None,
                    next_index: 0,
                }
            }
        }
    }

    /// Number of frames produced so far.
    pub fn frames_read(&self) -> usize {
        self.next_index
    }
}

impl Iterator for VideoFrames {
    type Item = Frame;

    fn next(&mut self) -> Option<Frame> {
        let decoding = self.state.as_mut()?;
        match decoding.next_rgb() {
            Ok(Some((rgb, width, height))) => {
                let frame = Frame {
                    index: self.next_index,
                    rgb,
                    width,
                    height,
                };
                self.next_index += 1;
                Some(frame)
            }
            Ok(None) => {
                log::debug!("end of video after {} frames", self.next_index);
                self.state = None;
                None
            }
            Err(err) => {
                log::warn!("stopping video at frame {}: {err:?}", self.next_index);
                self.state = None;
                None
            }
        }
    }
}

impl FusedIterator for VideoFrames {}

struct Decoding {
    input: ffmpeg::format::context::Input,
    stream_index: usize,
    decoder: ffmpeg::decoder::Video,
    scaler: Option<Scaler>,
    input_done: bool,
}

impl Decoding {
    fn open(path: &Path) -> Result<Self, VideoError> {
        ffmpeg::init().map_err(VideoError::Init)?;

        let input = ffmpeg::format::input(&path).map_err(|source| VideoError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        let (stream_index, decoder) = {
            let stream = input
                .streams()
                .best(ffmpeg::media::Type::Video)
                .ok_or_else(|| VideoError::NoVideoStream {
                    path: path.to_path_buf(),
                })?;
            let decoder = ffmpeg::codec::context::Context::from_parameters(stream.parameters())
                .and_then(|context| context.decoder().video())
                .map_err(|source| VideoError::Decoder {
                    path: path.to_path_buf(),
                    source,
                })?;
            (stream.index(), decoder)
        };

        Ok(Self {
            input,
            stream_index,
            decoder,
            scaler: None,
            input_done: false,
        })
    }

    fn next_rgb(&mut self) -> Result<Option<(Vec<u8>, u32, u32)>> {
        let mut decoded = VideoFrame::empty();
        loop {
            match self.decoder.receive_frame(&mut decoded) {
                Ok(()) => return self.convert(&decoded).map(Some),
                Err(ffmpeg::Error::Eof) => return Ok(None),
                Err(ffmpeg::Error::Other { errno }) if errno == EAGAIN => {}
                Err(err) => return Err(err).context("failed to decode frame"),
            }

            if self.input_done {
                return Ok(None);
            }
            self.feed()?;
        }
    }

    /// Sends the next packet of the video stream, or flushes the decoder once
    /// the container is exhausted.
    fn feed(&mut self) -> Result<()> {
        let mut packet = ffmpeg::Packet::empty();
        loop {
            match packet.read(&mut self.input) {
                Ok(()) if packet.stream() == self.stream_index => {
                    return self
                        .decoder
                        .send_packet(&packet)
                        .context("failed to send packet to decoder");
                }
                Ok(()) => continue,
                Err(ffmpeg::Error::Eof) => {
                    self.input_done = true;
                    return self.decoder.send_eof().context("failed to flush decoder");
                }
                Err(err) => return Err(err).context("failed to read packet"),
            }
        }
    }

    fn convert(&mut self, decoded: &VideoFrame) -> Result<(Vec<u8>, u32, u32)> {
        let (width, height) = (decoded.width(), decoded.height());
        let plane = |index: usize| Plane {
            data: decoded.data(index),
            stride: decoded.stride(index),
        };
        let full_range = decoded.color_range() == Range::JPEG;

        let src = match decoded.format() {
            Pixel::YUV420P => SourcePixels::Yuv420 {
                y: plane(0),
                u: plane(1),
                v: plane(2),
                full_range,
            },
            Pixel::YUVJ420P => SourcePixels::Yuv420 {
                y: plane(0),
                u: plane(1),
                v: plane(2),
                full_range: true,
            },
            Pixel::NV12 => SourcePixels::Nv12 {
                y: plane(0),
                uv: plane(1),
                full_range,
            },
            Pixel::RGB24 => SourcePixels::Rgb24(plane(0)),
            Pixel::BGR24 => SourcePixels::Bgr24(plane(0)),
            Pixel::GRAY8 => SourcePixels::Gray8(plane(0)),
            other => return self.scale_to_rgb(decoded, other),
        };

        let rgb = color::convert_to_rgb(&src, width, height)?;
        Ok((rgb, width, height))
    }

    fn scale_to_rgb(
        &mut self,
        decoded: &VideoFrame,
        format: Pixel,
    ) -> Result<(Vec<u8>, u32, u32)> {
        let (width, height) = (decoded.width(), decoded.height());
        let stale = self.scaler.as_ref().is_none_or(|scaler| {
            let input = scaler.input();
            input.format != format || input.width != width || input.height != height
        });
        if stale {
            log::debug!("converting {format:?} frames through the software scaler");
            let scaler = Scaler::get(
                format,
                width,
                height,
                Pixel::RGB24,
                width,
                height,
                Flags::BILINEAR,
            )
            .with_context(|| format!("no RGB24 conversion available for {format:?}"))?;
            self.scaler = Some(scaler);
        }
        let Some(scaler) = self.scaler.as_mut() else {
            return Err(anyhow!("software scaler unavailable"));
        };

        let mut converted = VideoFrame::empty();
        scaler
            .run(decoded, &mut converted)
            .context("software scaling to RGB24 failed")?;

        let src = SourcePixels::Rgb24(Plane {
            data: converted.data(0),
            stride: converted.stride(0),
        });
        let rgb = color::convert_to_rgb(&src, width, height)?;
        Ok((rgb, width, height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_no_frames() {
        let mut frames = VideoFrames::open("/definitely/not/here/input.avi");
        assert!(frames.next().is_none());
        assert!(frames.next().is_none());
        assert_eq!(frames.frames_read(), 0);
    }

    #[test]
    fn non_video_file_yields_no_frames() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.avi");
        std::fs::write(&path, b"this is not a video container").unwrap();

        assert_eq!(VideoFrames::open(&path).count(), 0);
    }
}
