pub mod color;
pub mod sequence;
#[cfg(feature = "video-ffmpeg")]
pub mod video;

use std::path::Path;

pub use sequence::ImageSequence;
#[cfg(feature = "video-ffmpeg")]
pub use video::{VideoError, VideoFrames};

use crate::types::Frame;

/// Opens a frame source for `path`: a directory is read as an image sequence,
/// anything else as a video file.
pub fn open(path: impl AsRef<Path>) -> Box<dyn Iterator<Item = Frame>> {
    let path = path.as_ref();
    if path.is_dir() {
        return Box::new(ImageSequence::open(path));
    }
    open_video(path)
}

#[cfg(feature = "video-ffmpeg")]
fn open_video(path: &Path) -> Box<dyn Iterator<Item = Frame>> {
    Box::new(VideoFrames::open(path))
}

#[cfg(not(feature = "video-ffmpeg"))]
fn open_video(path: &Path) -> Box<dyn Iterator<Item = Frame>> {
    log::error!(
        "cannot decode {}: built without the video-ffmpeg feature",
        path.display()
    );
    Box::new(std::iter::empty())
}
