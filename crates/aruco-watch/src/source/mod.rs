//! Frame sources.
//!
//! Every source hands out RGB frames until it runs dry. Opening a source is
//! where device and file problems surface; [`SourceError::Open`] is the
//! error the binary turns into `Error: Could not open <what>.`.

mod ffmpeg;
mod sequence;
mod still;

pub use ffmpeg::{read_ppm_frame, FfmpegSource, VideoInput};
pub use sequence::SequenceSource;
pub use still::StillImageSource;

use image::RgbImage;
use std::collections::VecDeque;

/// Errors produced while opening or reading a frame source.
#[derive(thiserror::Error, Debug)]
pub enum SourceError {
    #[error("could not open {what}: {reason}")]
    Open { what: String, reason: String },

    #[error(transparent)]
    Decode(#[from] image::ImageError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SourceError {
    pub fn open(what: impl Into<String>, reason: impl ToString) -> Self {
        Self::Open {
            what: what.into(),
            reason: reason.to_string(),
        }
    }
}

/// A frame with its 1-based position in the stream.
#[derive(Clone, Debug)]
pub struct Frame {
    pub index: u64,
    pub image: RgbImage,
}

/// Something that yields RGB frames.
pub trait FrameSource {
    /// Short human-readable description, e.g. `webcam 0`.
    fn describe(&self) -> String;

    /// Next frame, or `Ok(None)` at end of stream.
    fn next_frame(&mut self) -> Result<Option<RgbImage>, SourceError>;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn describe(&self) -> String {
        (**self).describe()
    }

    fn next_frame(&mut self) -> Result<Option<RgbImage>, SourceError> {
        (**self).next_frame()
    }
}

/// In-memory frames, handed out in order.
#[derive(Clone, Debug, Default)]
pub struct VecSource {
    frames: VecDeque<RgbImage>,
}

impl VecSource {
    pub fn new(frames: impl IntoIterator<Item = RgbImage>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl FrameSource for VecSource {
    fn describe(&self) -> String {
        format!("{} in-memory frames", self.frames.len())
    }

    fn next_frame(&mut self) -> Result<Option<RgbImage>, SourceError> {
        Ok(self.frames.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vec_source_drains_in_order() {
        let frames = (0..3u8).map(|v| RgbImage::from_pixel(2, 2, image::Rgb([v, v, v])));
        let mut src = VecSource::new(frames);
        assert_eq!(src.remaining(), 3);
        for v in 0..3u8 {
            let f = src.next_frame().expect("frame").expect("some");
            assert_eq!(f.get_pixel(0, 0).0, [v, v, v]);
        }
        assert!(src.next_frame().expect("end").is_none());
    }

    #[test]
    fn boxed_sources_forward() {
        let mut src: Box<dyn FrameSource> = Box::new(VecSource::new([RgbImage::new(1, 1)]));
        assert_eq!(src.describe(), "1 in-memory frames");
        assert!(src.next_frame().expect("frame").is_some());
        assert!(src.next_frame().expect("end").is_none());
    }
}
