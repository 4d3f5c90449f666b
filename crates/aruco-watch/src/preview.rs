//! Preview windows.

use image::codecs::pnm::{PnmEncoder, PnmSubtype, SampleEncoding};
use image::{ExtendedColorType, ImageEncoder, RgbImage};
use log::{debug, warn};
use std::io::{self, BufWriter, ErrorKind, Write};
use std::process::{Child, ChildStdin, Command, Stdio};

pub const WINDOW_TITLE: &str = "Aruco Marker Detection";

#[derive(thiserror::Error, Debug)]
pub enum PreviewError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Encode(#[from] image::ImageError),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Whether the viewer is still up after a frame was shown.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PreviewState {
    Open,
    /// The user closed the window (or pressed `q`).
    Closed,
}

pub trait Preview {
    fn show(&mut self, frame: &RgbImage) -> Result<PreviewState, PreviewError>;

    /// Keep the last frame up until the viewer is closed.
    fn hold(&mut self) -> Result<(), PreviewError>;
}

/// Headless runs.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoPreview;

impl Preview for NoPreview {
    fn show(&mut self, _frame: &RgbImage) -> Result<PreviewState, PreviewError> {
        Ok(PreviewState::Open)
    }

    fn hold(&mut self) -> Result<(), PreviewError> {
        Ok(())
    }
}

/// An `ffplay` window fed with binary PPM frames over stdin.
pub struct FfplayPreview {
    child: Child,
    stdin: Option<BufWriter<ChildStdin>>,
}

impl FfplayPreview {
    pub fn spawn(title: &str) -> Result<Self, PreviewError> {
        Self::spawn_with("ffplay", title)
    }

    pub fn spawn_with(program: &str, title: &str) -> Result<Self, PreviewError> {
        let mut child = Command::new(program)
            .args(["-hide_banner", "-loglevel", "error", "-window_title", title])
            .args(["-fflags", "nobuffer", "-f", "image2pipe", "-vcodec", "ppm", "-"])
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| PreviewError::Spawn {
                program: program.to_string(),
                source,
            })?;
        let stdin = child.stdin.take().map(BufWriter::new);
        debug!("{program} preview started (pid {})", child.id());
        Ok(Self { child, stdin })
    }

    fn viewer_exited(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(Some(_)))
    }
}

impl Preview for FfplayPreview {
    fn show(&mut self, frame: &RgbImage) -> Result<PreviewState, PreviewError> {
        if self.viewer_exited() {
            return Ok(PreviewState::Closed);
        }
        let Some(stdin) = self.stdin.as_mut() else {
            return Ok(PreviewState::Closed);
        };

        let encoded = PnmEncoder::new(&mut *stdin)
            .with_subtype(PnmSubtype::Pixmap(SampleEncoding::Binary))
            .write_image(
                frame.as_raw(),
                frame.width(),
                frame.height(),
                ExtendedColorType::Rgb8,
            );
        let written = match encoded {
            Ok(()) => stdin.flush().map_err(PreviewError::from),
            Err(e) => Err(PreviewError::from(e)),
        };

        match written {
            Ok(()) => Ok(PreviewState::Open),
            Err(e) if is_broken_pipe(&e) => {
                self.stdin = None;
                Ok(PreviewState::Closed)
            }
            Err(e) => Err(e),
        }
    }

    fn hold(&mut self) -> Result<(), PreviewError> {
        // ffplay keeps the last frame on screen after end of input.
        if let Some(mut stdin) = self.stdin.take() {
            if let Err(e) = stdin.flush() {
                warn!("preview flush failed: {e}");
            }
        }
        self.child.wait()?;
        Ok(())
    }
}

fn is_broken_pipe(e: &PreviewError) -> bool {
    match e {
        PreviewError::Io(io) => io.kind() == ErrorKind::BrokenPipe,
        PreviewError::Encode(image::ImageError::IoError(io)) => io.kind() == ErrorKind::BrokenPipe,
        _ => false,
    }
}

impl Drop for FfplayPreview {
    fn drop(&mut self) {
        self.stdin = None;
        if !self.viewer_exited() {
            let _ = self.child.kill();
        }
        let _ = self.child.wait();
    }
}
