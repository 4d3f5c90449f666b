//! ArUco marker detection in plain Rust.
//!
//! The detector follows the classic pipeline:
//! - adaptive thresholding at several window sizes,
//! - outer-contour tracing and polygon approximation into convex quads,
//! - perspective removal and bit sampling of each quad,
//! - dictionary matching over the four rotations,
//! - optional sub-pixel corner refinement.
//!
//! ```
//! use aruco_watch_markers::{builtins, render_marker, ArucoDetector, DetectorParams};
//!
//! let dict = builtins::DICT_ARUCO_ORIGINAL;
//! let marker = render_marker(dict, 42, 10, 2).expect("known id");
//! let detector = ArucoDetector::new(dict, DetectorParams::default());
//! let result = detector.detect(&marker.view());
//! assert_eq!(result.ids(), vec![42]);
//! ```

pub mod builtins;
mod candidates;
mod contour;
mod decode;
mod detector;
mod dictionary;
mod matcher;
mod params;
mod refine;
mod render;
mod threshold;

pub use candidates::{find_candidates, Candidate};
pub use contour::{approx_polygon_closed, trace_outer_contours, Contour};
pub use decode::{decode_candidate, DecodedMarker};
pub use detector::{ArucoDetector, DetectedMarker, DetectionResult};
pub use dictionary::Dictionary;
pub use matcher::{rotate_code_u64, Match, Matcher};
pub use params::{CornerRefinement, DetectorParams};
pub use refine::refine_corner_subpix;
pub use render::{render_marker, RenderError};
pub use threshold::{adaptive_threshold_mean_inv, otsu_threshold_from_samples, BinaryImage};
