//! Image and stream pipelines.

use crate::annotate::annotate;
use crate::core::{rgb_to_gray, ImageError};
use crate::markers::{ArucoDetector, DetectionResult};
use crate::preview::{Preview, PreviewError, PreviewState};
use crate::sightings::SightingLog;
use crate::source::{Frame, FrameSource, SourceError};
use image::RgbImage;
use log::{debug, info};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[cfg(feature = "tracing")]
use tracing::instrument;

#[derive(thiserror::Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Preview(#[from] PreviewError),

    #[error(transparent)]
    Image(#[from] ImageError),

    #[error("failed to save {path}: {source}")]
    Save {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to write report: {0}")]
    Report(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Grayscale, detect and annotate one frame in place.
pub fn process_frame(
    detector: &ArucoDetector,
    frame: &mut RgbImage,
) -> Result<DetectionResult, ImageError> {
    let (w, h) = (frame.width() as usize, frame.height() as usize);
    let gray = rgb_to_gray(frame.as_raw(), w, h)?;
    let result = detector.detect(&gray.view());
    annotate(frame, &result.markers);
    Ok(result)
}

/// Detect markers in one image, save the annotated copy to `output` and
/// show it until the viewer is closed.
pub fn run_image(
    detector: &ArucoDetector,
    mut frame: RgbImage,
    output: &Path,
    preview: &mut dyn Preview,
    out: &mut dyn Write,
) -> Result<DetectionResult, RunError> {
    let result = process_frame(detector, &mut frame)?;

    writeln!(out, "Detected {} markers", result.len())?;
    if result.is_empty() {
        writeln!(out, "No markers found.")?;
    }

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    frame.save(output).map_err(|source| RunError::Save {
        path: output.to_path_buf(),
        source,
    })?;
    writeln!(out, "Saved output image to {}", output.display())?;

    preview.show(&frame)?;
    preview.hold()?;
    Ok(result)
}

/// Write `result` as pretty JSON.
pub fn write_report(path: &Path, result: &DetectionResult) -> Result<(), RunError> {
    let file = std::fs::File::create(path)?;
    serde_json::to_writer_pretty(io::BufWriter::new(file), result)?;
    Ok(())
}

#[derive(Clone, Copy, Debug, Default)]
pub struct StreamOptions {
    /// Print `Frame N: Detected K markers` (and `No markers found.`).
    pub print_frame_counts: bool,
    pub max_frames: Option<u64>,
}

/// Why a stream run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    EndOfStream,
    PreviewClosed,
    FrameLimit,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunSummary {
    /// Frames processed.
    pub frames: u64,
    /// `(frame index, marker id)` in logging order.
    pub first_sightings: Vec<(u64, u32)>,
    pub stopped: StopReason,
}

/// Run the detector over every frame of `source`.
///
/// Frames are numbered from 1. Stops at the end of the stream, when the
/// preview is closed or after `options.max_frames` frames.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip_all, fields(source = %source.describe()))
)]
pub fn run_stream<W: Write>(
    source: &mut dyn FrameSource,
    detector: &ArucoDetector,
    sightings: &mut SightingLog<W>,
    preview: &mut dyn Preview,
    options: StreamOptions,
    out: &mut dyn Write,
) -> Result<RunSummary, RunError> {
    info!("reading {}", source.describe());
    let mut summary = RunSummary {
        frames: 0,
        first_sightings: Vec::new(),
        stopped: StopReason::EndOfStream,
    };

    loop {
        if options.max_frames.is_some_and(|max| summary.frames >= max) {
            summary.stopped = StopReason::FrameLimit;
            break;
        }
        let Some(image) = source.next_frame()? else {
            break;
        };
        summary.frames += 1;
        let mut frame = Frame {
            index: summary.frames,
            image,
        };

        let result = process_frame(detector, &mut frame.image)?;
        debug!("frame {}: {} markers", frame.index, result.len());
        if options.print_frame_counts {
            writeln!(out, "Frame {}: Detected {} markers", frame.index, result.len())?;
            if result.is_empty() {
                writeln!(out, "No markers found.")?;
            }
        }

        for id in sightings.record(frame.index, &result.ids())? {
            info!("frame {}: first sighting of id {id}", frame.index);
            summary.first_sightings.push((frame.index, id));
        }

        if preview.show(&frame.image)? == PreviewState::Closed {
            summary.stopped = StopReason::PreviewClosed;
            break;
        }
    }

    info!(
        "{} frames, {} distinct markers ({:?})",
        summary.frames,
        summary.first_sightings.len(),
        summary.stopped
    );
    Ok(summary)
}
