//! Runtime configuration, loaded from a TOML file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_CONFIG_FILENAME: &str = "gesture-mouse.toml";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub camera: CameraConfig,
    pub detection: DetectionConfig,
    pub gestures: GestureThresholds,
    pub models: ModelConfig,
    pub actions: ActionConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Capture device index as reported by `gesture-mouse cameras`.
    pub index: u32,
    /// Flip frames horizontally so the preview behaves like a mirror.
    pub mirror: bool,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            index: 0,
            mirror: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Hands detected with lower confidence are ignored.
    pub min_detection_confidence: f32,
    /// Palm candidates scoring below this are discarded before NMS.
    pub palm_score_threshold: f32,
    pub palm_nms_threshold: f32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            min_detection_confidence: 0.7,
            palm_score_threshold: 0.5,
            palm_nms_threshold: 0.3,
        }
    }
}

/// Gesture decision thresholds. Distances use the rescaled `0..1000` unit,
/// angles are in degrees. The defaults are empirically tuned.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureThresholds {
    /// Thumb tip to index base separation below which the cursor follows.
    pub near_distance: f32,
    /// Joint angle below which a finger counts as bent.
    pub bent_angle: f32,
    /// Joint angle above which a finger counts as extended.
    pub extended_angle: f32,
    /// Fingertip to base separation splitting curled from stretched fingers.
    pub reach_distance: f32,
}

impl Default for GestureThresholds {
    fn default() -> Self {
        Self {
            near_distance: 50.0,
            bent_angle: 50.0,
            extended_angle: 90.0,
            reach_distance: 50.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub dir: PathBuf,
    pub handpose_url: String,
    pub palm_detector_url: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("models"),
            handpose_url: "https://github.com/opencv/opencv_zoo/raw/main/models/handpose_estimation_mediapipe/handpose_estimation_mediapipe_2023feb.onnx".to_string(),
            palm_detector_url: "https://github.com/opencv/opencv_zoo/raw/main/models/palm_detection_mediapipe/palm_detection_mediapipe_2023feb.onnx".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionConfig {
    /// Log actions instead of driving the real mouse.
    pub dry_run: bool,
    pub screenshot_dir: PathBuf,
    pub screenshot_prefix: String,
}

impl Default for ActionConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            screenshot_dir: PathBuf::from("."),
            screenshot_prefix: "my_screenshot".to_string(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.detection.min_detection_confidence) {
            return Err(ConfigError::Invalid(format!(
                "min_detection_confidence must be in [0, 1], got {}",
                self.detection.min_detection_confidence
            )));
        }
        if !(0.0..=1.0).contains(&self.detection.palm_score_threshold) {
            return Err(ConfigError::Invalid(format!(
                "palm_score_threshold must be in [0, 1], got {}",
                self.detection.palm_score_threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.detection.palm_nms_threshold) {
            return Err(ConfigError::Invalid(format!(
                "palm_nms_threshold must be in [0, 1], got {}",
                self.detection.palm_nms_threshold
            )));
        }

        let g = &self.gestures;
        for (name, value) in [
            ("near_distance", g.near_distance),
            ("reach_distance", g.reach_distance),
        ] {
            if !(0.0..=1000.0).contains(&value) {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be in [0, 1000], got {value}"
                )));
            }
        }
        for (name, value) in [
            ("bent_angle", g.bent_angle),
            ("extended_angle", g.extended_angle),
        ] {
            if !(0.0..=360.0).contains(&value) {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be in [0, 360], got {value}"
                )));
            }
        }
        if g.bent_angle > g.extended_angle {
            return Err(ConfigError::Invalid(format!(
                "bent_angle ({}) must not exceed extended_angle ({})",
                g.bent_angle, g.extended_angle
            )));
        }

        if self.actions.screenshot_prefix.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "screenshot_prefix must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `gesture-mouse.toml` from the working directory when present.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = Path::new(DEFAULT_CONFIG_FILENAME);
        if path.exists() {
            log::info!("loading config from {}", path.display());
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = self.to_toml()?;
        let write_err = |source: std::io::Error| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        std::fs::write(path, content).map_err(write_err)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn handpose_model_path(&self) -> PathBuf {
        self.models
            .dir
            .join(crate::model_download::ModelKind::HandposeEstimator.filename())
    }

    pub fn palm_detector_model_path(&self) -> PathBuf {
        self.models
            .dir
            .join(crate::model_download::ModelKind::PalmDetector.filename())
    }
}
