//! Colour conversion for captured frames.

use crate::GrayImage;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ImageError {
    #[error("invalid {channels}-channel buffer length (expected {expected} bytes, got {got})")]
    BufferLength {
        channels: usize,
        expected: usize,
        got: usize,
    },
}

// BT.601 luma in 14-bit fixed point.
const R_WEIGHT: u32 = 4899;
const G_WEIGHT: u32 = 9617;
const B_WEIGHT: u32 = 1868;
const SHIFT: u32 = 14;

fn check_len(channels: usize, width: usize, height: usize, got: usize) -> Result<(), ImageError> {
    let expected = width * height * channels;
    if got != expected {
        return Err(ImageError::BufferLength {
            channels,
            expected,
            got,
        });
    }
    Ok(())
}

/// Packed RGB24 to luminance (`0.299 R + 0.587 G + 0.114 B`).
pub fn rgb_to_gray(rgb: &[u8], width: usize, height: usize) -> Result<GrayImage, ImageError> {
    check_len(3, width, height, rgb.len())?;
    let data = rgb
        .chunks_exact(3)
        .map(|px| {
            let acc = px[0] as u32 * R_WEIGHT + px[1] as u32 * G_WEIGHT + px[2] as u32 * B_WEIGHT;
            ((acc + (1 << (SHIFT - 1))) >> SHIFT) as u8
        })
        .collect();
    Ok(GrayImage {
        width,
        height,
        data,
    })
}
