//! JSON run configuration and per-mode defaults.

use crate::markers::{builtins, DetectorParams, Dictionary};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

pub const DEFAULT_IMAGE_PATH: &str = "video/test_image.png";
pub const DEFAULT_OUTPUT_IMAGE: &str = "detected_markers.jpg";
pub const DEFAULT_VIDEO_PATH: &str = "video/test_video2.mp4";
pub const DEFAULT_WEBCAM_INDEX: u32 = 0;
pub const DEFAULT_LOG_PATH: &str = "output/detected_markers.txt";

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("unknown dictionary {0:?} (known: {known})", known = builtins::BUILTIN_DICTIONARY_NAMES.join(", "))]
    UnknownDictionary(String),
}

/// Input kind of a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Image,
    Video,
    Webcam,
    Screen,
    Sequence,
}

impl Mode {
    pub fn is_stream(self) -> bool {
        self != Mode::Image
    }
}

/// Settings shared by all modes. Unset fields fall back to the mode's
/// defaults, so a config file only needs the values it changes.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Detector fields to change in image mode, applied over
    /// [`DetectorParams::default`].
    pub image_detector: Option<Map<String, Value>>,
    /// Detector fields to change in the stream modes, applied over
    /// [`DetectorParams::streaming`].
    pub stream_detector: Option<Map<String, Value>>,
    /// Dictionary name, `DICT_ARUCO_ORIGINAL` when unset.
    pub dictionary: Option<String>,
    /// Annotated output of image mode.
    pub output_image: Option<PathBuf>,
    /// First-sighting log of stream modes.
    pub log_path: Option<PathBuf>,
    /// Show the preview window; on when unset.
    pub preview: Option<bool>,
    /// Print `Frame N: Detected K markers` for every frame.
    pub print_frame_counts: Option<bool>,
    /// Stop after this many frames.
    pub max_frames: Option<u64>,
}

impl RunConfig {
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// The mode's base parameters with the matching override applied.
    pub fn detector_params(&self, mode: Mode) -> Result<DetectorParams, ConfigError> {
        let (base, patch) = if mode.is_stream() {
            (DetectorParams::streaming(), &self.stream_detector)
        } else {
            (DetectorParams::default(), &self.image_detector)
        };
        let Some(patch) = patch else {
            return Ok(base);
        };
        let mut fields = params_object(&base)?;
        fields.extend(patch.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(serde_json::from_value(Value::Object(fields))?)
    }

    /// Copy with both detector overrides spelled out in full.
    pub fn with_resolved_detectors(self) -> Result<Self, ConfigError> {
        let image = params_object(&self.detector_params(Mode::Image)?)?;
        let stream = params_object(&self.detector_params(Mode::Webcam)?)?;
        Ok(Self {
            image_detector: Some(image),
            stream_detector: Some(stream),
            ..self
        })
    }

    pub fn dictionary(&self) -> Result<Dictionary, ConfigError> {
        match &self.dictionary {
            None => Ok(builtins::DICT_ARUCO_ORIGINAL),
            Some(name) => builtins::builtin_dictionary(name)
                .ok_or_else(|| ConfigError::UnknownDictionary(name.clone())),
        }
    }

    pub fn output_image(&self) -> PathBuf {
        self.output_image
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_IMAGE))
    }

    /// Video files print per-frame counts and keep no log; webcam, screen
    /// and sequence runs log first sightings.
    pub fn log_path(&self, mode: Mode) -> Option<PathBuf> {
        match mode {
            Mode::Image => None,
            Mode::Video => self.log_path.clone(),
            Mode::Webcam | Mode::Screen | Mode::Sequence => Some(
                self.log_path
                    .clone()
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_PATH)),
            ),
        }
    }

    pub fn print_frame_counts(&self, mode: Mode) -> bool {
        self.print_frame_counts.unwrap_or(mode == Mode::Video)
    }

    pub fn preview(&self) -> bool {
        self.preview.unwrap_or(true)
    }
}

fn params_object(params: &DetectorParams) -> Result<Map<String, Value>, ConfigError> {
    Ok(serde_json::from_value(serde_json::to_value(params)?)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markers::CornerRefinement;

    #[test]
    fn defaults_follow_the_mode() {
        let cfg = RunConfig::default();
        assert_eq!(cfg.output_image(), PathBuf::from("detected_markers.jpg"));
        assert_eq!(cfg.log_path(Mode::Image), None);
        assert_eq!(cfg.log_path(Mode::Video), None);
        assert_eq!(
            cfg.log_path(Mode::Webcam),
            Some(PathBuf::from("output/detected_markers.txt"))
        );
        assert!(cfg.print_frame_counts(Mode::Video));
        assert!(!cfg.print_frame_counts(Mode::Screen));
        assert!(cfg.preview());
        assert_eq!(
            cfg.detector_params(Mode::Image).expect("params"),
            DetectorParams::default()
        );
        assert_eq!(
            cfg.detector_params(Mode::Webcam).expect("params"),
            DetectorParams::streaming()
        );
        assert_eq!(cfg.dictionary().expect("dict").name, "DICT_ARUCO_ORIGINAL");
    }

    #[test]
    fn partial_json_keeps_other_defaults() {
        let cfg: RunConfig = serde_json::from_str(
            r#"{"log_path":"run/ids.txt","stream_detector":{"adaptive_thresh_constant":5.0},"max_frames":10}"#,
        )
        .expect("parse");
        assert_eq!(cfg.log_path(Mode::Screen), Some(PathBuf::from("run/ids.txt")));
        assert_eq!(cfg.max_frames, Some(10));
        assert_eq!(cfg.detector_params(Mode::Image).expect("params"), DetectorParams::default());
    }

    #[test]
    fn stream_override_keeps_subpixel_corners() {
        let cfg: RunConfig =
            serde_json::from_str(r#"{"stream_detector":{"adaptive_thresh_constant":5.0}}"#)
                .expect("parse");
        for mode in [Mode::Video, Mode::Webcam, Mode::Screen, Mode::Sequence] {
            let params = cfg.detector_params(mode).expect("params");
            assert_eq!(params.adaptive_thresh_constant, 5.0);
            assert_eq!(params.corner_refinement_method, CornerRefinement::Subpix);
        }
    }

    #[test]
    fn image_override_stays_out_of_stream_modes() {
        let cfg: RunConfig = serde_json::from_str(
            r#"{"image_detector":{"corner_refinement_method":"subpix","detect_inverted_marker":true}}"#,
        )
        .expect("parse");
        let image = cfg.detector_params(Mode::Image).expect("params");
        assert_eq!(image.corner_refinement_method, CornerRefinement::Subpix);
        assert!(image.detect_inverted_marker);
        assert!(!cfg.detector_params(Mode::Webcam).expect("params").detect_inverted_marker);
    }

    #[test]
    fn bad_override_value_is_a_parse_error() {
        let cfg: RunConfig =
            serde_json::from_str(r#"{"stream_detector":{"corner_refinement_win_size":"wide"}}"#)
                .expect("parse");
        assert!(matches!(cfg.detector_params(Mode::Webcam), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn resolved_config_keeps_each_mode_base() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("full.json");
        RunConfig::default()
            .with_resolved_detectors()
            .expect("resolve")
            .write_json(&path)
            .expect("write");

        let cfg = RunConfig::load_json(&path).expect("load");
        assert_eq!(cfg.detector_params(Mode::Image).expect("params"), DetectorParams::default());
        assert_eq!(cfg.detector_params(Mode::Webcam).expect("params"), DetectorParams::streaming());
    }

    #[test]
    fn unknown_dictionary_is_reported() {
        let cfg = RunConfig {
            dictionary: Some("DICT_4X4_50".to_string()),
            ..RunConfig::default()
        };
        let err = cfg.dictionary().unwrap_err();
        assert!(matches!(err, ConfigError::UnknownDictionary(_)));
        assert_eq!(
            err.to_string(),
            r#"unknown dictionary "DICT_4X4_50" (known: DICT_ARUCO_ORIGINAL)"#
        );
    }

    #[test]
    fn json_file_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("run.json");
        let cfg = RunConfig {
            preview: Some(false),
            max_frames: Some(3),
            ..RunConfig::default()
        };
        cfg.write_json(&path).expect("write");
        assert_eq!(RunConfig::load_json(&path).expect("load"), cfg);
        assert!(matches!(
            RunConfig::load_json(dir.path().join("missing.json")),
            Err(ConfigError::Read { .. })
        ));
    }
}
