//! Quad candidates from thresholded contours.

use crate::contour::{approx_polygon_closed, trace_outer_contours, Contour};
use crate::threshold::adaptive_threshold_mean_inv;
use crate::DetectorParams;
use aruco_watch_core::GrayImageView;
use log::trace;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// A convex quad that may hold a marker.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Corners in clockwise image order (y down); the start corner is arbitrary.
    pub corners: [Point2<f32>; 4],
    /// Length of the contour the quad was fitted to, in pixels.
    pub perimeter: f32,
}

impl Candidate {
    /// Mean squared corner distance to `other`, minimised over the four
    /// cyclic corner correspondences.
    pub fn mean_sq_distance(&self, other: &Candidate) -> f32 {
        (0..4)
            .map(|shift| {
                (0..4)
                    .map(|k| (self.corners[k] - other.corners[(k + shift) % 4]).norm_squared())
                    .sum::<f32>()
                    / 4.0
            })
            .fold(f32::INFINITY, f32::min)
    }
}

/// Collect marker candidates over all adaptive threshold passes.
#[cfg_attr(
    feature = "tracing",
    tracing::instrument(level = "debug", skip(img, params), fields(width = img.width, height = img.height))
)]
pub fn find_candidates(img: &GrayImageView<'_>, params: &DetectorParams) -> Vec<Candidate> {
    if img.is_empty() {
        return Vec::new();
    }

    let max_dim = img.width.max(img.height) as f64;
    let min_len = ((params.min_marker_perimeter_rate * max_dim) as usize).max(4);
    let max_len = (params.max_marker_perimeter_rate * max_dim) as usize;

    let mut all = Vec::new();
    for win in params.threshold_windows() {
        let bin = adaptive_threshold_mean_inv(img, win, params.adaptive_thresh_constant);
        let contours = trace_outer_contours(&bin, min_len, max_len);
        let before = all.len();
        all.extend(
            contours
                .iter()
                .filter_map(|c| quad_from_contour(c, params, img.width, img.height)),
        );
        trace!(
            "threshold window {win}: {} contours, {} quads",
            contours.len(),
            all.len() - before
        );
    }

    merge_close_candidates(all, params.min_marker_distance_rate as f32)
}

fn quad_from_contour(
    contour: &Contour,
    params: &DetectorParams,
    width: usize,
    height: usize,
) -> Option<Candidate> {
    let len = contour.len() as f32;
    let poly = approx_polygon_closed(contour, len * params.polygonal_approx_accuracy_rate as f32);
    let mut corners: [Point2<f32>; 4] = poly.try_into().ok()?;
    if !is_convex(&corners) {
        return None;
    }

    let min_side_sq = (0..4)
        .map(|k| (corners[k] - corners[(k + 1) % 4]).norm_squared())
        .fold(f32::INFINITY, f32::min);
    let min_side = len * params.min_corner_distance_rate as f32;
    if min_side_sq < min_side * min_side {
        return None;
    }

    let d = params.min_distance_to_border as f32;
    let (max_x, max_y) = (width as f32 - 1.0 - d, height as f32 - 1.0 - d);
    if corners
        .iter()
        .any(|p| p.x < d || p.y < d || p.x > max_x || p.y > max_y)
    {
        return None;
    }

    if cross(corners[1] - corners[0], corners[2] - corners[0]) < 0.0 {
        corners.swap(1, 3);
    }

    Some(Candidate {
        corners,
        perimeter: len,
    })
}

#[inline]
fn cross(a: nalgebra::Vector2<f32>, b: nalgebra::Vector2<f32>) -> f32 {
    a.x * b.y - a.y * b.x
}

fn is_convex(corners: &[Point2<f32>; 4]) -> bool {
    let turns = (0..4).map(|k| {
        let a = corners[(k + 1) % 4] - corners[k];
        let b = corners[(k + 2) % 4] - corners[(k + 1) % 4];
        cross(a, b)
    });
    let mut sign = 0.0f32;
    for t in turns {
        if t == 0.0 {
            return false;
        }
        if sign == 0.0 {
            sign = t.signum();
        } else if t.signum() != sign {
            return false;
        }
    }
    true
}

/// Drop candidates that sit on top of a larger one.
fn merge_close_candidates(mut candidates: Vec<Candidate>, rate: f32) -> Vec<Candidate> {
    candidates.sort_by(|a, b| b.perimeter.total_cmp(&a.perimeter));
    let mut kept: Vec<Candidate> = Vec::with_capacity(candidates.len());
    for c in candidates {
        let duplicate = kept.iter().any(|k| {
            let limit = k.perimeter.min(c.perimeter) * rate;
            c.mean_sq_distance(k) < limit * limit
        });
        if !duplicate {
            kept.push(c);
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use aruco_watch_core::GrayImage;

    fn dark_square(w: usize, h: usize, x0: usize, y0: usize, side: usize) -> GrayImage {
        let mut img = GrayImage::filled(w, h, 255);
        for y in y0..y0 + side {
            for x in x0..x0 + side {
                img.set(x, y, 0);
            }
        }
        img
    }

    #[test]
    fn dark_square_gives_one_clockwise_candidate() {
        let img = dark_square(120, 100, 30, 20, 50);
        let cands = find_candidates(&img.view(), &DetectorParams::default());
        assert_eq!(cands.len(), 1, "{cands:?}");
        let c = &cands[0];
        assert!(cross(c.corners[1] - c.corners[0], c.corners[2] - c.corners[0]) > 0.0);
        for expected in [(30.0, 20.0), (79.0, 20.0), (79.0, 69.0), (30.0, 69.0)] {
            assert!(
                c.corners
                    .iter()
                    .any(|p| (p.x - expected.0).abs() < 1.0 && (p.y - expected.1).abs() < 1.0),
                "missing corner {expected:?} in {:?}",
                c.corners
            );
        }
    }

    #[test]
    fn blank_image_has_no_candidates() {
        let img = GrayImage::filled(64, 48, 200);
        assert!(find_candidates(&img.view(), &DetectorParams::default()).is_empty());
    }

    #[test]
    fn squares_touching_the_border_are_rejected() {
        let img = dark_square(100, 100, 1, 1, 40);
        assert!(find_candidates(&img.view(), &DetectorParams::default()).is_empty());
    }

    #[test]
    fn near_duplicates_keep_the_larger_quad() {
        let quad = |off: f32, perimeter: f32| Candidate {
            corners: [
                Point2::new(10.0 + off, 10.0),
                Point2::new(50.0 + off, 10.0),
                Point2::new(50.0 + off, 50.0),
                Point2::new(10.0 + off, 50.0),
            ],
            perimeter,
        };
        let far = Candidate {
            corners: quad(0.0, 0.0).corners.map(|p| p + nalgebra::Vector2::new(100.0, 0.0)),
            perimeter: 150.0,
        };
        let merged = merge_close_candidates(vec![quad(0.5, 150.0), quad(0.0, 160.0), far], 0.05);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].perimeter, 160.0);
    }

    #[test]
    fn distance_ignores_corner_start() {
        let a = Candidate {
            corners: [
                Point2::new(0.0, 0.0),
                Point2::new(10.0, 0.0),
                Point2::new(10.0, 10.0),
                Point2::new(0.0, 10.0),
            ],
            perimeter: 40.0,
        };
        let mut b = a.clone();
        b.corners.rotate_left(1);
        assert_eq!(a.mean_sq_distance(&b), 0.0);
    }
}
