use crate::{
    decode_candidate, find_candidates, refine_corner_subpix, Candidate, CornerRefinement,
    DecodedMarker, DetectorParams, Dictionary, Matcher,
};
use aruco_watch_core::GrayImageView;
use log::debug;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// One identified marker in image coordinates.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectedMarker {
    pub id: u32,
    /// Marker corners, clockwise from the marker's own top-left.
    pub corners: [Point2<f32>; 4],
    pub rotation: u8,
    pub hamming: u8,
}

impl DetectedMarker {
    /// Mean of the four corners.
    pub fn center(&self) -> Point2<f32> {
        let sum = self
            .corners
            .iter()
            .fold(nalgebra::Vector2::zeros(), |acc, p| acc + p.coords);
        Point2::from(sum / 4.0)
    }
}

/// Output of one detection run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub markers: Vec<DetectedMarker>,
    /// Quads that looked like markers but did not decode.
    pub rejected: Vec<Candidate>,
}

impl DetectionResult {
    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    /// Marker ids in detection order.
    pub fn ids(&self) -> Vec<u32> {
        self.markers.iter().map(|m| m.id).collect()
    }
}

/// ArUco detector for a fixed dictionary and parameter set.
#[derive(Clone, Debug)]
pub struct ArucoDetector {
    params: DetectorParams,
    matcher: Matcher,
}

impl ArucoDetector {
    pub fn new(dict: Dictionary, params: DetectorParams) -> Self {
        let max_hamming =
            (dict.max_correction_bits as f64 * params.error_correction_rate.clamp(0.0, 1.0)) as u8;
        Self {
            params,
            matcher: Matcher::new(dict, max_hamming),
        }
    }

    pub fn dictionary(&self) -> Dictionary {
        self.matcher.dictionary()
    }

    /// Detect markers in a grayscale image.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "info", skip(self, img), fields(width = img.width, height = img.height))
    )]
    pub fn detect(&self, img: &GrayImageView<'_>) -> DetectionResult {
        let candidates = find_candidates(img, &self.params);

        #[cfg(feature = "rayon")]
        let decoded: Vec<Option<DecodedMarker>> = candidates
            .par_iter()
            .map(|c| decode_candidate(img, c, &self.params, &self.matcher))
            .collect();
        #[cfg(not(feature = "rayon"))]
        let decoded: Vec<Option<DecodedMarker>> = candidates
            .iter()
            .map(|c| decode_candidate(img, c, &self.params, &self.matcher))
            .collect();

        let mut result = DetectionResult::default();
        for (candidate, decoded) in candidates.into_iter().zip(decoded) {
            match decoded {
                Some(m) if self.is_repeat(&result.markers, &m) => {
                    debug!("dropping repeated detection of id {}", m.id);
                }
                Some(m) => result.markers.push(self.finish(img, m)),
                None => result.rejected.push(candidate),
            }
        }

        debug!(
            "{} markers, {} rejected candidates",
            result.markers.len(),
            result.rejected.len()
        );
        result
    }

    /// Same id with nearly the same corners as an already accepted marker.
    fn is_repeat(&self, kept: &[DetectedMarker], m: &DecodedMarker) -> bool {
        let perimeter = quad_perimeter(&m.corners);
        let limit = perimeter * self.params.min_marker_distance_rate as f32;
        kept.iter().filter(|k| k.id == m.id).any(|k| {
            let msd = (0..4)
                .map(|i| (k.corners[i] - m.corners[i]).norm_squared())
                .sum::<f32>()
                / 4.0;
            msd < limit * limit
        })
    }

    fn finish(&self, img: &GrayImageView<'_>, m: DecodedMarker) -> DetectedMarker {
        let p = &self.params;
        let corners = match p.corner_refinement_method {
            CornerRefinement::None => m.corners,
            CornerRefinement::Subpix => m.corners.map(|c| {
                refine_corner_subpix(
                    img,
                    c,
                    p.corner_refinement_win_size,
                    p.corner_refinement_max_iterations,
                    p.corner_refinement_min_accuracy,
                )
            }),
        };
        DetectedMarker {
            id: m.id,
            corners,
            rotation: m.rotation,
            hamming: m.hamming,
        }
    }
}

fn quad_perimeter(corners: &[Point2<f32>; 4]) -> f32 {
    (0..4)
        .map(|k| (corners[(k + 1) % 4] - corners[k]).norm())
        .sum()
}
