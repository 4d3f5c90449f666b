//! Sub-pixel corner refinement.

use aruco_watch_core::{sample_bilinear, GrayImageView};
use nalgebra::{Matrix2, Point2, Vector2};

/// Move `corner` to the point where the image gradients inside the
/// `(2 * win + 1)^2` window are orthogonal to the offsets from it.
///
/// Iterates until a step is shorter than `min_accuracy` pixels or
/// `max_iterations` is reached. A result that leaves the search window is
/// discarded in favour of the input corner.
pub fn refine_corner_subpix(
    img: &GrayImageView<'_>,
    corner: Point2<f32>,
    win: usize,
    max_iterations: usize,
    min_accuracy: f64,
) -> Point2<f32> {
    let win = win.max(1) as i32;
    let coeff = 1.0 / (win * win) as f64;
    let weights: Vec<f64> = (-win..=win)
        .map(|d| (-(d * d) as f64 * coeff).exp())
        .collect();

    let sample = |x: f64, y: f64| sample_bilinear(img, x as f32, y as f32) as f64;
    let start = Vector2::new(corner.x as f64, corner.y as f64);
    let mut c = start;

    for _ in 0..max_iterations.max(1) {
        let mut normal = Matrix2::<f64>::zeros();
        let mut rhs = Vector2::<f64>::zeros();

        for (wy, dy) in (-win..=win).enumerate() {
            for (wx, dx) in (-win..=win).enumerate() {
                let (px, py) = (c.x + dx as f64, c.y + dy as f64);
                let g = Vector2::new(
                    sample(px + 1.0, py) - sample(px - 1.0, py),
                    sample(px, py + 1.0) - sample(px, py - 1.0),
                );
                let ggt = g * g.transpose() * (weights[wx] * weights[wy]);
                normal += ggt;
                rhs += ggt * Vector2::new(dx as f64, dy as f64);
            }
        }

        if normal.determinant().abs() <= f64::EPSILON {
            break;
        }
        let Some(step) = normal.try_inverse().map(|inv| inv * rhs) else {
            break;
        };
        c += step;
        if step.norm_squared() <= min_accuracy * min_accuracy {
            break;
        }
    }

    let drift = c - start;
    if drift.x.abs() > win as f64 || drift.y.abs() > win as f64 || !c.iter().all(|v| v.is_finite())
    {
        return corner;
    }
    Point2::new(c.x as f32, c.y as f32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use aruco_watch_core::GrayImage;

    fn dark_quadrant() -> GrayImage {
        let mut img = GrayImage::filled(40, 40, 255);
        for y in 0..20 {
            for x in 0..20 {
                img.set(x, y, 0);
            }
        }
        img
    }

    #[test]
    fn converges_on_step_corner() {
        let img = dark_quadrant();
        for start in [Point2::new(18.0, 21.0), Point2::new(21.5, 17.2)] {
            let p = refine_corner_subpix(&img.view(), start, 5, 30, 0.1);
            assert_abs_diff_eq!(p.x, 19.5, epsilon = 0.15);
            assert_abs_diff_eq!(p.y, 19.5, epsilon = 0.15);
        }
    }

    #[test]
    fn flat_region_keeps_the_input() {
        let img = GrayImage::filled(40, 40, 90);
        let start = Point2::new(20.0, 20.0);
        assert_eq!(refine_corner_subpix(&img.view(), start, 5, 30, 0.1), start);
    }
}
