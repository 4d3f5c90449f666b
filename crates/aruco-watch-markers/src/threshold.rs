//! Global and adaptive thresholding.

use aruco_watch_core::GrayImageView;

/// Row-major binary mask; `true` is foreground.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BinaryImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<bool>,
}

impl BinaryImage {
    /// Foreground test that treats everything outside the image as background.
    #[inline]
    pub fn is_set(&self, x: i32, y: i32) -> bool {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return false;
        }
        self.data[y as usize * self.width + x as usize]
    }

    pub fn count_set(&self) -> usize {
        self.data.iter().filter(|&&v| v).count()
    }
}

/// Otsu threshold of a set of intensities. Pixels `> t` are the bright class.
pub fn otsu_threshold_from_samples(samples: &[u8]) -> u8 {
    if samples.is_empty() {
        return 127;
    }

    let mut hist = [0u32; 256];
    let (mut min_v, mut max_v) = (u8::MAX, u8::MIN);
    for &v in samples {
        hist[v as usize] += 1;
        min_v = min_v.min(v);
        max_v = max_v.max(v);
    }
    if min_v == max_v {
        return min_v;
    }

    let total = samples.len() as f64;
    let sum_total: f64 = hist
        .iter()
        .enumerate()
        .map(|(i, &h)| i as f64 * h as f64)
        .sum();

    let mut sum_b = 0f64;
    let mut w_b = 0f64;
    let mut best_var = -1f64;
    let mut best_t = 0u8;

    for (t, &h) in hist.iter().enumerate() {
        w_b += h as f64;
        if w_b < 1.0 {
            continue;
        }
        let w_f = total - w_b;
        if w_f < 1.0 {
            break;
        }

        sum_b += t as f64 * h as f64;
        let m_b = sum_b / w_b;
        let m_f = (sum_total - sum_b) / w_f;
        let var_between = w_b * w_f * (m_b - m_f) * (m_b - m_f);
        if var_between > best_var {
            best_var = var_between;
            best_t = t as u8;
        }
    }

    best_t
}

/// Inverted mean adaptive threshold.
///
/// A pixel is foreground when it is at least `c` darker than the rounded mean
/// of the `win x win` window around it. Windows are clipped at the image
/// border. Even `win` values are bumped to the next odd size.
pub fn adaptive_threshold_mean_inv(img: &GrayImageView<'_>, win: usize, c: f64) -> BinaryImage {
    let (w, h) = (img.width, img.height);
    let radius = (win | 1) / 2;

    // Summed-area table with a zero top row and left column.
    let stride = w + 1;
    let mut integral = vec![0u64; stride * (h + 1)];
    for y in 0..h {
        let mut row_sum = 0u64;
        for x in 0..w {
            row_sum += img.data[y * w + x] as u64;
            integral[(y + 1) * stride + x + 1] = integral[y * stride + x + 1] + row_sum;
        }
    }

    let mut data = Vec::with_capacity(w * h);
    for y in 0..h {
        let y0 = y.saturating_sub(radius);
        let y1 = (y + radius + 1).min(h);
        for x in 0..w {
            let x0 = x.saturating_sub(radius);
            let x1 = (x + radius + 1).min(w);
            let sum = integral[y1 * stride + x1] + integral[y0 * stride + x0]
                - integral[y0 * stride + x1]
                - integral[y1 * stride + x0];
            let n = ((y1 - y0) * (x1 - x0)) as u64;
            let mean = ((sum + n / 2) / n) as f64;
            data.push(img.data[y * w + x] as f64 <= mean - c);
        }
    }

    BinaryImage {
        width: w,
        height: h,
        data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aruco_watch_core::GrayImage;

    #[test]
    fn otsu_splits_bimodal_samples() {
        let mut samples = vec![20u8; 50];
        samples.extend(std::iter::repeat(220u8).take(50));
        let t = otsu_threshold_from_samples(&samples);
        assert!((20..220).contains(&t), "threshold {t}");
        assert!(samples.iter().filter(|&&v| v > t).count() == 50);
    }

    #[test]
    fn otsu_of_constant_samples_is_that_value() {
        assert_eq!(otsu_threshold_from_samples(&[90; 16]), 90);
        assert_eq!(otsu_threshold_from_samples(&[]), 127);
    }

    #[test]
    fn flat_image_has_no_foreground() {
        let img = GrayImage::filled(32, 24, 128);
        let bin = adaptive_threshold_mean_inv(&img.view(), 13, 7.0);
        assert_eq!(bin.count_set(), 0);
    }

    #[test]
    fn dark_side_of_an_edge_is_foreground() {
        let mut img = GrayImage::filled(20, 10, 255);
        for y in 0..10 {
            for x in 0..10 {
                img.set(x, y, 0);
            }
        }
        let bin = adaptive_threshold_mean_inv(&img.view(), 3, 7.0);
        assert!(bin.is_set(9, 5));
        assert!(!bin.is_set(10, 5));
        assert!(!bin.is_set(4, 5));
        assert!(!bin.is_set(-1, 5));
    }
}
