//! Marker watching front end for the `aruco-watch-*` crates.
//!
//! This crate provides:
//! - frame sources for still images, image sequences and `ffmpeg`-backed
//!   video files, webcams and screen captures,
//! - annotation of detected markers (outline, first corner, `ID: K` label),
//! - a first-sighting log (`Frame N: Detected ID: K`),
//! - an `ffplay` preview window,
//! - the per-frame pipeline used by the `aruco-watch` binary.
//!
//! ## Quickstart
//!
//! ```no_run
//! use aruco_watch::markers::{builtins, ArucoDetector, DetectorParams};
//! use aruco_watch::run::process_frame;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut frame = image::open("markers.png")?.to_rgb8();
//! let detector = ArucoDetector::new(builtins::DICT_ARUCO_ORIGINAL, DetectorParams::default());
//! let result = process_frame(&detector, &mut frame)?;
//! println!("Detected {} markers", result.len());
//! frame.save("detected_markers.jpg")?;
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `aruco_watch::core`: gray images, colour conversion, homographies, logging.
//! - `aruco_watch::markers`: the ArUco detector and dictionaries.
//! - `aruco_watch::source`: frame sources.
//! - `aruco_watch::annotate`: drawing detections onto RGB frames.
//! - `aruco_watch::sightings`: first-sighting log.
//! - `aruco_watch::preview`: preview windows.
//! - `aruco_watch::config`: JSON run configuration and per-mode defaults.
//! - `aruco_watch::run`: image and stream pipelines.

pub use aruco_watch_core as core;
pub use aruco_watch_markers as markers;

pub mod annotate;
pub mod config;
pub mod preview;
pub mod run;
pub mod sightings;
pub mod source;

pub use config::{ConfigError, Mode, RunConfig};
pub use preview::{FfplayPreview, NoPreview, Preview, PreviewError, PreviewState};
pub use run::{process_frame, run_image, run_stream, RunError, RunSummary, StreamOptions};
pub use sightings::SightingLog;
pub use source::{
    FfmpegSource, Frame, FrameSource, SequenceSource, SourceError, StillImageSource, VecSource,
    VideoInput,
};
