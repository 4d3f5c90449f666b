//! Outer-contour tracing and polygon approximation on binary masks.

use crate::BinaryImage;
use nalgebra::Point2;

/// Clockwise neighbour offsets (image coordinates, y down), starting east.
const DIRS: [(i32, i32); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];
const WEST: usize = 4;

fn dir_index(dx: i32, dy: i32) -> usize {
    DIRS.iter()
        .position(|&d| d == (dx, dy))
        .unwrap_or(WEST)
}

/// Closed outer boundary of one 8-connected foreground component, in
/// clockwise order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Contour {
    pub points: Vec<[i32; 2]>,
}

impl Contour {
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Trace the outer boundary of every 8-connected foreground component whose
/// boundary length lies in `min_len..=max_len`.
pub fn trace_outer_contours(bin: &BinaryImage, min_len: usize, max_len: usize) -> Vec<Contour> {
    let (w, h) = (bin.width, bin.height);
    let mut labelled = vec![false; w * h];
    let mut stack = Vec::new();
    let mut out = Vec::new();

    for y in 0..h {
        for x in 0..w {
            let idx = y * w + x;
            if !bin.data[idx] || labelled[idx] {
                continue;
            }

            // Raster order makes (x, y) the top-left pixel of a new component.
            labelled[idx] = true;
            stack.push((x as i32, y as i32));
            while let Some((cx, cy)) = stack.pop() {
                for (dx, dy) in DIRS {
                    let (nx, ny) = (cx + dx, cy + dy);
                    if !bin.is_set(nx, ny) {
                        continue;
                    }
                    let nidx = ny as usize * w + nx as usize;
                    if !labelled[nidx] {
                        labelled[nidx] = true;
                        stack.push((nx, ny));
                    }
                }
            }

            let contour = trace_from(bin, x as i32, y as i32, max_len);
            if (min_len..=max_len).contains(&contour.len()) {
                out.push(contour);
            }
        }
    }

    out
}

/// Moore-neighbour tracing from a component's top-left pixel, stopping when
/// the start pixel is left towards the same neighbour a second time. Gives up
/// once the boundary exceeds `max_len`.
fn trace_from(bin: &BinaryImage, sx: i32, sy: i32, max_len: usize) -> Contour {
    let start = [sx, sy];
    let mut points = vec![start];
    let mut p = start;
    let mut back = WEST;
    let mut first_step: Option<[i32; 2]> = None;

    loop {
        let step = (1..=8).find_map(|k| {
            let d = (back + k) % 8;
            let q = [p[0] + DIRS[d].0, p[1] + DIRS[d].1];
            bin.is_set(q[0], q[1]).then_some((d, (back + k - 1) % 8, q))
        });
        let Some((d, prev, q)) = step else {
            // Isolated pixel.
            return Contour { points };
        };

        if p == start {
            match first_step {
                None => first_step = Some(q),
                Some(f) if f == q => {
                    points.pop();
                    return Contour { points };
                }
                Some(_) => {}
            }
        }

        back = dir_index(DIRS[prev].0 - DIRS[d].0, DIRS[prev].1 - DIRS[d].1);
        p = q;
        points.push(p);
        if points.len() > max_len + 1 {
            return Contour { points };
        }
    }
}

fn point_segment_distance(p: Point2<f32>, a: Point2<f32>, b: Point2<f32>) -> f32 {
    let ab = b - a;
    let len = ab.norm();
    if len <= f32::EPSILON {
        return (p - a).norm();
    }
    (ab.x * (p.y - a.y) - ab.y * (p.x - a.x)).abs() / len
}

/// Douglas-Peucker over the open chain `pts`; returns kept indices in order,
/// including both endpoints.
fn douglas_peucker(pts: &[Point2<f32>], epsilon: f32) -> Vec<usize> {
    let last = pts.len() - 1;
    let mut keep = vec![false; pts.len()];
    keep[0] = true;
    keep[last] = true;

    let mut ranges = vec![(0usize, last)];
    while let Some((i, j)) = ranges.pop() {
        let mut best = (0usize, -1.0f32);
        for k in (i + 1)..j {
            let d = point_segment_distance(pts[k], pts[i], pts[j]);
            if d > best.1 {
                best = (k, d);
            }
        }
        if best.1 > epsilon {
            keep[best.0] = true;
            ranges.push((i, best.0));
            ranges.push((best.0, j));
        }
    }

    keep.iter()
        .enumerate()
        .filter_map(|(i, &k)| k.then_some(i))
        .collect()
}

/// Approximate a closed contour by a polygon whose vertices lie on the
/// contour, within `epsilon` pixels.
///
/// The contour is split at two far-apart points and each half is simplified
/// separately. Vertices keep the contour's winding order.
pub fn approx_polygon_closed(contour: &Contour, epsilon: f32) -> Vec<Point2<f32>> {
    let pts: Vec<Point2<f32>> = contour
        .points
        .iter()
        .map(|p| Point2::new(p[0] as f32, p[1] as f32))
        .collect();
    if pts.len() < 3 {
        return pts;
    }

    let farthest_from = |origin: Point2<f32>| {
        (0..pts.len())
            .max_by(|&a, &b| {
                let da = (pts[a] - origin).norm_squared();
                let db = (pts[b] - origin).norm_squared();
                da.total_cmp(&db)
            })
            .unwrap_or(0)
    };
    let a = farthest_from(pts[0]);
    let b = farthest_from(pts[a]);
    if a == b {
        return vec![pts[a]];
    }
    let (lo, hi) = (a.min(b), a.max(b));

    let first: Vec<Point2<f32>> = pts[lo..=hi].to_vec();
    let second: Vec<Point2<f32>> = pts[hi..].iter().chain(&pts[..=lo]).copied().collect();

    let mut out = Vec::new();
    for chain in [&first, &second] {
        let kept = douglas_peucker(chain, epsilon);
        // The last vertex of each chain starts the other one.
        out.extend(kept[..kept.len() - 1].iter().map(|&i| chain[i]));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask(w: usize, h: usize, set: impl Fn(usize, usize) -> bool) -> BinaryImage {
        let mut data = Vec::with_capacity(w * h);
        for y in 0..h {
            for x in 0..w {
                data.push(set(x, y));
            }
        }
        BinaryImage {
            width: w,
            height: h,
            data,
        }
    }

    #[test]
    fn traces_filled_square_clockwise() {
        let bin = mask(12, 12, |x, y| (2..=6).contains(&x) && (3..=7).contains(&y));
        let contours = trace_outer_contours(&bin, 1, 100);
        assert_eq!(contours.len(), 1);
        let c = &contours[0];
        assert_eq!(c.len(), 16);
        assert_eq!(c.points[0], [2, 3]);
        assert_eq!(c.points[1], [3, 3]);
        assert_eq!(*c.points.last().expect("non-empty"), [2, 4]);
    }

    #[test]
    fn ring_boundary_ignores_the_hole() {
        let bin = mask(20, 20, |x, y| {
            let inside = (3..=15).contains(&x) && (3..=15).contains(&y);
            let hole = (5..=13).contains(&x) && (5..=13).contains(&y);
            inside && !hole
        });
        let contours = trace_outer_contours(&bin, 1, 1000);
        assert_eq!(contours.len(), 1);
        assert_eq!(contours[0].len(), 48);
    }

    #[test]
    fn length_filter_drops_specks() {
        let bin = mask(10, 10, |x, y| x == 4 && y == 4);
        assert!(trace_outer_contours(&bin, 2, 100).is_empty());
        let single = trace_outer_contours(&bin, 1, 100);
        assert_eq!(single[0].points, vec![[4, 4]]);
    }

    #[test]
    fn square_outline_simplifies_to_its_corners() {
        let bin = mask(40, 40, |x, y| (5..=30).contains(&x) && (8..=33).contains(&y));
        let contours = trace_outer_contours(&bin, 1, 1000);
        let c = &contours[0];
        let poly = approx_polygon_closed(c, c.len() as f32 * 0.03);
        assert_eq!(poly.len(), 4);
        for corner in [(5.0, 8.0), (30.0, 8.0), (30.0, 33.0), (5.0, 33.0)] {
            assert!(
                poly.iter().any(|p| p.x == corner.0 && p.y == corner.1),
                "missing corner {corner:?} in {poly:?}"
            );
        }
    }
}
