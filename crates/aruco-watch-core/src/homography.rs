use crate::{sample_bilinear_u8, GrayImage, GrayImageView};
use nalgebra::{Matrix3, Point2, SMatrix, SVector, Vector3};

/// Projective map between two planes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Homography {
    pub h: Matrix3<f64>,
}

impl Homography {
    pub fn new(h: Matrix3<f64>) -> Self {
        Self { h }
    }

    #[inline]
    pub fn apply(&self, p: Point2<f32>) -> Point2<f32> {
        let v = self.h * Vector3::new(p.x as f64, p.y as f64, 1.0);
        let w = v[2];
        Point2::new((v[0] / w) as f32, (v[1] / w) as f32)
    }

    pub fn inverse(&self) -> Option<Self> {
        self.h.try_inverse().map(Self::new)
    }
}

/// Translate the quad centroid to the origin and scale it to a mean
/// distance of sqrt(2).
fn normalize_quad(pts: &[Point2<f32>; 4]) -> ([Point2<f64>; 4], Matrix3<f64>) {
    let cx = pts.iter().map(|p| p.x as f64).sum::<f64>() / 4.0;
    let cy = pts.iter().map(|p| p.y as f64).sum::<f64>() / 4.0;
    let mean_dist = pts
        .iter()
        .map(|p| (p.x as f64 - cx).hypot(p.y as f64 - cy))
        .sum::<f64>()
        / 4.0;

    let s = if mean_dist > 1e-12 {
        std::f64::consts::SQRT_2 / mean_dist
    } else {
        1.0
    };
    let t = Matrix3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0);

    let out = pts.map(|p| {
        let v = t * Vector3::new(p.x as f64, p.y as f64, 1.0);
        Point2::new(v[0], v[1])
    });
    (out, t)
}

/// Compute `H` such that `dst ~ H * src` from four correspondences.
///
/// Corner order must match between `src` and `dst`. Returns `None` for
/// degenerate configurations (three collinear points, repeated corners).
pub fn homography_from_quad(src: &[Point2<f32>; 4], dst: &[Point2<f32>; 4]) -> Option<Homography> {
    let (src_n, t_src) = normalize_quad(src);
    let (dst_n, t_dst) = normalize_quad(dst);

    // Unknowns [h11 h12 h13 h21 h22 h23 h31 h32], h33 = 1.
    let mut a = SMatrix::<f64, 8, 8>::zeros();
    let mut b = SVector::<f64, 8>::zeros();
    for (k, (s, d)) in src_n.iter().zip(dst_n.iter()).enumerate() {
        let r0 = 2 * k;
        a[(r0, 0)] = s.x;
        a[(r0, 1)] = s.y;
        a[(r0, 2)] = 1.0;
        a[(r0, 6)] = -d.x * s.x;
        a[(r0, 7)] = -d.x * s.y;
        b[r0] = d.x;

        let r1 = r0 + 1;
        a[(r1, 3)] = s.x;
        a[(r1, 4)] = s.y;
        a[(r1, 5)] = 1.0;
        a[(r1, 6)] = -d.y * s.x;
        a[(r1, 7)] = -d.y * s.y;
        b[r1] = d.y;
    }

    let x = a.lu().solve(&b)?;
    let hn = Matrix3::new(x[0], x[1], x[2], x[3], x[4], x[5], x[6], x[7], 1.0);

    let h = t_dst.try_inverse()? * hn * t_src;
    let scale = h[(2, 2)];
    if scale.abs() < 1e-12 || !h.iter().all(|v| v.is_finite()) {
        return None;
    }
    Some(Homography::new(h / scale))
}

/// Resample `src` into an `out_w x out_h` image. Output pixel `(x, y)` reads
/// the source at `h_src_from_out * (x + 0.5, y + 0.5)`.
pub fn warp_perspective_gray(
    src: &GrayImageView<'_>,
    h_src_from_out: &Homography,
    out_w: usize,
    out_h: usize,
) -> GrayImage {
    let mut out = Vec::with_capacity(out_w * out_h);
    for y in 0..out_h {
        for x in 0..out_w {
            let p = h_src_from_out.apply(Point2::new(x as f32 + 0.5, y as f32 + 0.5));
            out.push(sample_bilinear_u8(src, p.x, p.y));
        }
    }
    GrayImage {
        width: out_w,
        height: out_h,
        data: out,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn square(s: f32) -> [Point2<f32>; 4] {
        [
            Point2::new(0.0, 0.0),
            Point2::new(s, 0.0),
            Point2::new(s, s),
            Point2::new(0.0, s),
        ]
    }

    #[test]
    fn quad_solve_recovers_known_map() {
        let truth = Homography::new(Matrix3::new(
            0.8, 0.05, 120.0, //
            -0.02, 1.1, 80.0, //
            0.0009, -0.0004, 1.0,
        ));
        let src = square(28.0);
        let dst = src.map(|p| truth.apply(p));

        let h = homography_from_quad(&src, &dst).expect("solvable");
        for p in [
            Point2::new(3.0_f32, 4.0),
            Point2::new(14.0, 14.0),
            Point2::new(27.0, 1.0),
        ] {
            let a = h.apply(p);
            let b = truth.apply(p);
            assert_abs_diff_eq!(a.x, b.x, epsilon = 1e-3);
            assert_abs_diff_eq!(a.y, b.y, epsilon = 1e-3);
        }
    }

    #[test]
    fn inverse_maps_back() {
        let dst = [
            Point2::new(40.0_f32, 30.0),
            Point2::new(110.0, 35.0),
            Point2::new(105.0, 100.0),
            Point2::new(38.0, 96.0),
        ];
        let h = homography_from_quad(&square(28.0), &dst).expect("solvable");
        let inv = h.inverse().expect("invertible");
        let back = inv.apply(h.apply(Point2::new(7.0, 21.0)));
        assert_abs_diff_eq!(back.x, 7.0, epsilon = 1e-3);
        assert_abs_diff_eq!(back.y, 21.0, epsilon = 1e-3);
    }

    #[test]
    fn collapsed_quad_is_rejected() {
        let dst = [Point2::new(5.0_f32, 5.0); 4];
        assert!(homography_from_quad(&square(10.0), &dst).is_none());
    }

    #[test]
    fn warp_copies_an_axis_aligned_window() {
        let mut img = GrayImage::filled(8, 8, 0);
        for y in 2..6 {
            for x in 2..6 {
                img.set(x, y, 200);
            }
        }
        // Output pixel centre (x + 0.5) lands on source pixel centre x + 2.
        let h = Homography::new(Matrix3::new(1.0, 0.0, 1.5, 0.0, 1.0, 1.5, 0.0, 0.0, 1.0));
        let out = warp_perspective_gray(&img.view(), &h, 4, 4);
        assert!(out.data.iter().all(|&v| v == 200));
    }
}
