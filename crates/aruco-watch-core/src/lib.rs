//! Image, colour and geometry primitives shared by the aruco-watch crates.
//!
//! Nothing in here knows about markers. The detector in
//! `aruco-watch-markers` and the frame pipeline in `aruco-watch` build on
//! these types.

mod color;
mod homography;
mod image;
mod logger;

pub use color::{rgb_to_gray, ImageError};
pub use homography::{homography_from_quad, warp_perspective_gray, Homography};
pub use image::{sample_bilinear, sample_bilinear_u8, GrayImage, GrayImageView};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_with_level;
