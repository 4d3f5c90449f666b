use super::{FrameSource, SourceError};
use image::RgbImage;
use log::{debug, info};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

const FRAME_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "pgm", "ppm", "tif", "tiff"];

/// A directory of still frames, read in lexical file-name order.
#[derive(Debug)]
pub struct SequenceSource {
    dir: PathBuf,
    pending: VecDeque<PathBuf>,
}

impl SequenceSource {
    /// List the frames in `dir`. A missing directory or one without any
    /// image files is [`SourceError::Open`].
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, SourceError> {
        let dir = dir.as_ref().to_path_buf();
        let entries = std::fs::read_dir(&dir)
            .map_err(|e| SourceError::open("sequence", format!("{}: {e}", dir.display())))?;

        let mut files = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.is_file() && has_frame_extension(&path) {
                files.push(path);
            }
        }
        if files.is_empty() {
            return Err(SourceError::open(
                "sequence",
                format!("{} holds no image files", dir.display()),
            ));
        }
        files.sort();
        info!("{} frames in {}", files.len(), dir.display());

        Ok(Self {
            dir,
            pending: files.into(),
        })
    }

    pub fn remaining(&self) -> usize {
        self.pending.len()
    }
}

fn has_frame_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| FRAME_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

impl FrameSource for SequenceSource {
    fn describe(&self) -> String {
        format!("sequence {}", self.dir.display())
    }

    fn next_frame(&mut self) -> Result<Option<RgbImage>, SourceError> {
        let Some(path) = self.pending.pop_front() else {
            return Ok(None);
        };
        debug!("reading {}", path.display());
        Ok(Some(image::open(&path)?.to_rgb8()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_come_in_lexical_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        for (name, v) in [("frame_002.png", 2u8), ("frame_001.png", 1), ("frame_010.png", 10)] {
            RgbImage::from_pixel(2, 2, image::Rgb([v, v, v]))
                .save(dir.path().join(name))
                .expect("save");
        }
        std::fs::write(dir.path().join("notes.txt"), "not a frame").expect("write");

        let mut src = SequenceSource::open(dir.path()).expect("open");
        assert_eq!(src.remaining(), 3);
        let mut seen = Vec::new();
        while let Some(frame) = src.next_frame().expect("read") {
            seen.push(frame.get_pixel(0, 0).0[0]);
        }
        assert_eq!(seen, vec![1, 2, 10]);
    }

    #[test]
    fn empty_or_missing_directory_fails_to_open() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(matches!(
            SequenceSource::open(dir.path()),
            Err(SourceError::Open { .. })
        ));
        assert!(matches!(
            SequenceSource::open(dir.path().join("missing")),
            Err(SourceError::Open { .. })
        ));
    }
}
