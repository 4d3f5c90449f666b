use super::{FrameSource, SourceError};
use image::RgbImage;
use log::debug;
use std::path::{Path, PathBuf};

/// A single image file, yielded once.
#[derive(Debug)]
pub struct StillImageSource {
    path: PathBuf,
    image: Option<RgbImage>,
}

impl StillImageSource {
    /// Read and decode `path`. A missing or undecodable file is
    /// [`SourceError::Open`].
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref().to_path_buf();
        let image = image::open(&path)
            .map_err(|e| SourceError::open("image", format!("{}: {e}", path.display())))?
            .to_rgb8();
        debug!(
            "loaded {} ({}x{})",
            path.display(),
            image.width(),
            image.height()
        );
        Ok(Self {
            path,
            image: Some(image),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FrameSource for StillImageSource {
    fn describe(&self) -> String {
        format!("image {}", self.path.display())
    }

    fn next_frame(&mut self) -> Result<Option<RgbImage>, SourceError> {
        Ok(self.image.take())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_an_open_error() {
        let err = StillImageSource::open("/definitely/not/here.png").unwrap_err();
        assert!(matches!(err, SourceError::Open { ref what, .. } if what == "image"));
    }

    #[test]
    fn yields_exactly_one_frame() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("one.png");
        RgbImage::from_pixel(3, 2, image::Rgb([10, 20, 30]))
            .save(&path)
            .expect("save");

        let mut src = StillImageSource::open(&path).expect("open");
        let frame = src.next_frame().expect("read").expect("frame");
        assert_eq!(frame.dimensions(), (3, 2));
        assert_eq!(frame.get_pixel(2, 1).0, [10, 20, 30]);
        assert!(src.next_frame().expect("read").is_none());
    }
}
