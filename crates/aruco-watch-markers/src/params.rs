use serde::{Deserialize, Serialize};

/// Corner refinement applied to decoded markers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CornerRefinement {
    /// Keep the polygon-approximation corners (integer pixel positions).
    #[default]
    None,
    /// Iterative sub-pixel refinement on the gray image.
    Subpix,
}

/// Configuration for [`crate::ArucoDetector`].
///
/// Every field has a default, so a JSON config only needs the values it
/// changes. Rates are relative to the larger image side (perimeters) or to
/// the candidate contour length (distances).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorParams {
    /// Smallest adaptive threshold window.
    pub adaptive_thresh_win_size_min: usize,
    /// Largest adaptive threshold window.
    pub adaptive_thresh_win_size_max: usize,
    /// Window size increment between threshold passes.
    pub adaptive_thresh_win_size_step: usize,
    /// A pixel is foreground when it is this much darker than its window mean.
    pub adaptive_thresh_constant: f64,
    /// Minimum contour length as a fraction of `max(width, height)`.
    pub min_marker_perimeter_rate: f64,
    /// Maximum contour length as a fraction of `max(width, height)`.
    pub max_marker_perimeter_rate: f64,
    /// Polygon approximation tolerance as a fraction of the contour length.
    pub polygonal_approx_accuracy_rate: f64,
    /// Shortest allowed quad side as a fraction of the contour length.
    pub min_corner_distance_rate: f64,
    /// Candidates closer than this fraction of the smaller perimeter merge.
    pub min_marker_distance_rate: f64,
    /// Corners closer than this many pixels to the image border are rejected.
    pub min_distance_to_border: u32,
    /// Width of the black marker border in cells.
    pub marker_border_bits: usize,
    /// Below this standard deviation the warped patch is classified by mean.
    pub min_otsu_std_dev: f64,
    /// Pixels per cell in the perspective-removed patch.
    pub perspective_remove_pixel_per_cell: usize,
    /// Fraction of each cell side ignored when counting pixels.
    pub perspective_remove_ignored_margin_per_cell: f64,
    /// Fraction of border cells allowed to read white.
    pub max_erroneous_bits_in_border_rate: f64,
    /// Fraction of the dictionary's correction capacity used when matching.
    pub error_correction_rate: f64,
    /// Also try white-on-black markers.
    pub detect_inverted_marker: bool,
    pub corner_refinement_method: CornerRefinement,
    /// Half-size of the sub-pixel search window.
    pub corner_refinement_win_size: usize,
    pub corner_refinement_max_iterations: usize,
    /// Stop refining once a step moves the corner less than this (pixels).
    pub corner_refinement_min_accuracy: f64,
}

impl Default for DetectorParams {
    fn default() -> Self {
        Self {
            adaptive_thresh_win_size_min: 3,
            adaptive_thresh_win_size_max: 23,
            adaptive_thresh_win_size_step: 10,
            adaptive_thresh_constant: 7.0,
            min_marker_perimeter_rate: 0.03,
            max_marker_perimeter_rate: 4.0,
            polygonal_approx_accuracy_rate: 0.03,
            min_corner_distance_rate: 0.05,
            min_marker_distance_rate: 0.05,
            min_distance_to_border: 3,
            marker_border_bits: 1,
            min_otsu_std_dev: 5.0,
            perspective_remove_pixel_per_cell: 4,
            perspective_remove_ignored_margin_per_cell: 0.13,
            max_erroneous_bits_in_border_rate: 0.35,
            error_correction_rate: 0.6,
            detect_inverted_marker: false,
            corner_refinement_method: CornerRefinement::None,
            corner_refinement_win_size: 5,
            corner_refinement_max_iterations: 30,
            corner_refinement_min_accuracy: 0.1,
        }
    }
}

impl DetectorParams {
    /// Parameter set used for video, webcam and screen streams: the default
    /// threshold windows spelled out, plus sub-pixel corners.
    pub fn streaming() -> Self {
        Self {
            adaptive_thresh_win_size_min: 3,
            adaptive_thresh_win_size_max: 23,
            adaptive_thresh_win_size_step: 10,
            corner_refinement_method: CornerRefinement::Subpix,
            ..Self::default()
        }
    }

    /// Odd window sizes visited by the threshold passes.
    pub fn threshold_windows(&self) -> Vec<usize> {
        let min = self.adaptive_thresh_win_size_min.max(3);
        let max = self.adaptive_thresh_win_size_max.max(min);
        let step = self.adaptive_thresh_win_size_step.max(1);
        (min..=max).step_by(step).map(|w| w | 1).collect()
    }
}
