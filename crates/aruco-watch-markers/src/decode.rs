//! Perspective removal and bit extraction for quad candidates.

use crate::threshold::otsu_threshold_from_samples;
use crate::{Candidate, DetectorParams, Matcher};
use aruco_watch_core::{homography_from_quad, warp_perspective_gray, GrayImage, GrayImageView};
use nalgebra::Point2;

/// A candidate that decoded to a dictionary marker.
#[derive(Clone, Debug, PartialEq)]
pub struct DecodedMarker {
    pub id: u32,
    /// Corners in marker order: `corners[0]` is the marker's top-left.
    pub corners: [Point2<f32>; 4],
    /// Quarter turns between the dictionary code and the candidate's corner order.
    pub rotation: u8,
    pub hamming: u8,
    /// Observed inner bits (row-major, black = 1) in candidate orientation.
    pub code: u64,
    /// White-on-black marker.
    pub inverted: bool,
}

/// Sample the candidate's cells, check the black border, and match the inner
/// bits against the dictionary.
pub fn decode_candidate(
    img: &GrayImageView<'_>,
    candidate: &Candidate,
    params: &DetectorParams,
    matcher: &Matcher,
) -> Option<DecodedMarker> {
    let bits = matcher.dictionary().marker_size;
    let border = params.marker_border_bits;
    let cells = bits + 2 * border;
    let cell_px = params.perspective_remove_pixel_per_cell.max(1);
    let side = cells * cell_px;

    let s = side as f32;
    let canonical = [
        Point2::new(0.0, 0.0),
        Point2::new(s, 0.0),
        Point2::new(s, s),
        Point2::new(0.0, s),
    ];
    let h = homography_from_quad(&canonical, &candidate.corners)?;
    let patch = warp_perspective_gray(img, &h, side, side);

    let white = classify_cells(&patch, cells, cell_px, params);

    let border_total = cells * cells - bits * bits;
    let max_errors = (border_total as f64 * params.max_erroneous_bits_in_border_rate) as usize;
    let white_in_border = (0..cells * cells)
        .filter(|&i| is_border_cell(i % cells, i / cells, cells, border) && white[i])
        .count();

    let inverted = if white_in_border <= max_errors {
        false
    } else if params.detect_inverted_marker && border_total - white_in_border <= max_errors {
        true
    } else {
        return None;
    };

    let mut code = 0u64;
    for by in 0..bits {
        for bx in 0..bits {
            let is_white = white[(by + border) * cells + bx + border];
            if is_white == inverted {
                code |= 1u64 << (by * bits + bx);
            }
        }
    }

    let m = matcher.match_code(code)?;
    let r = m.rotation as usize;
    let corners = std::array::from_fn(|i| candidate.corners[(i + r) % 4]);

    Some(DecodedMarker {
        id: m.id,
        corners,
        rotation: m.rotation,
        hamming: m.hamming,
        code,
        inverted,
    })
}

#[inline]
fn is_border_cell(cx: usize, cy: usize, cells: usize, border: usize) -> bool {
    cx < border || cy < border || cx >= cells - border || cy >= cells - border
}

/// Per-cell white/black classification of the perspective-removed patch.
fn classify_cells(
    patch: &GrayImage,
    cells: usize,
    cell_px: usize,
    params: &DetectorParams,
) -> Vec<bool> {
    let n = patch.data.len() as f64;
    let mean = patch.data.iter().map(|&v| v as f64).sum::<f64>() / n;
    let var = patch
        .data
        .iter()
        .map(|&v| (v as f64 - mean).powi(2))
        .sum::<f64>()
        / n;
    if var.sqrt() < params.min_otsu_std_dev {
        return vec![mean > 127.0; cells * cells];
    }

    let thr = otsu_threshold_from_samples(&patch.data);
    let margin = (cell_px as f64 * params.perspective_remove_ignored_margin_per_cell) as usize;
    let inner = cell_px.saturating_sub(2 * margin).max(1);
    let margin = (cell_px - inner) / 2;

    let mut white = Vec::with_capacity(cells * cells);
    for cy in 0..cells {
        for cx in 0..cells {
            let (x0, y0) = (cx * cell_px + margin, cy * cell_px + margin);
            let bright = (y0..y0 + inner)
                .flat_map(|y| (x0..x0 + inner).map(move |x| (x, y)))
                .filter(|&(x, y)| patch.get(x, y) > thr)
                .count();
            white.push(bright > inner * inner / 2);
        }
    }
    white
}
