use std::path::Path;

use anyhow::{Context, Result, anyhow};
use ort::session::{Session, builder::GraphOptimizationLevel};
use ort::value::Tensor;

use super::{
    HandposeEngine,
    common::{self, HandposeOutput},
    palm::{PalmDetector, PalmDetectorConfig, crop_from_palm, pick_primary_region},
};
use crate::{
    config::Config,
    model_download::{ModelKind, ensure_model_ready_with_progress},
    types::Frame,
};

/// Palm detector followed by the handpose estimator on the best palm.
pub struct OrtEngine {
    handpose: Session,
    palm_detector: PalmDetector,
}

impl OrtEngine {
    /// Fetches missing model files and loads both sessions.
    pub fn from_config(config: &Config) -> Result<Self> {
        let handpose_path = config.handpose_model_path();
        let palm_path = config.palm_detector_model_path();

        ensure_model_ready_with_progress(
            ModelKind::HandposeEstimator,
            &handpose_path,
            &config.models.handpose_url,
        )?;
        ensure_model_ready_with_progress(
            ModelKind::PalmDetector,
            &palm_path,
            &config.models.palm_detector_url,
        )?;

        let palm_cfg = PalmDetectorConfig {
            score_threshold: config.detection.palm_score_threshold,
            nms_threshold: config.detection.palm_nms_threshold,
            ..PalmDetectorConfig::default()
        };
        let engine = Self::new(&handpose_path, &palm_path, palm_cfg)?;
        log::info!(
            "handpose ORT backend ready using {} and palm detector {}",
            handpose_path.display(),
            palm_path.display()
        );
        Ok(engine)
    }

    pub fn new(
        handpose_path: &Path,
        palm_detector_path: &Path,
        palm_cfg: PalmDetectorConfig,
    ) -> Result<Self> {
        let handpose = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(2)?
            .commit_from_file(handpose_path)
            .with_context(|| {
                format!(
                    "failed to load ORT session from {}",
                    handpose_path.display()
                )
            })?;

        Ok(Self {
            handpose,
            palm_detector: PalmDetector::new(palm_detector_path, palm_cfg)?,
        })
    }
}

impl HandposeEngine for OrtEngine {
    fn infer(&mut self, frame: &Frame) -> Result<HandposeOutput> {
        let palm_regions = self.palm_detector.detect(frame).unwrap_or_else(|err| {
            log::warn!("palm detection failed: {err:?}");
            Vec::new()
        });

        let Some(selected) = pick_primary_region(&palm_regions).cloned() else {
            return Ok(HandposeOutput {
                palm_regions,
                ..HandposeOutput::default()
            });
        };
        let (center, side, angle) = crop_from_palm(&selected);

        let (input, transform) =
            common::prepare_rotated_crop(frame, center, side, angle, common::INPUT_SIZE)?;
        let tensor = Tensor::from_array(input)?;
        let outputs = self
            .handpose
            .run(ort::inputs![tensor])
            .context("failed to run ORT session")?;

        if outputs.len() < 1 {
            return Err(anyhow!("model returned no outputs"));
        }

        let coords = outputs[0].try_extract_array::<f32>()?;
        let flattened: Vec<f32> = coords.iter().copied().collect();
        let landmarks = common::decode_landmarks(&flattened)?;

        let confidence = if outputs.len() > 1 {
            outputs[1]
                .try_extract_array::<f32>()
                .ok()
                .and_then(|arr| arr.iter().next().copied())
                .unwrap_or(0.0)
        } else {
            0.0
        };

        let projected_landmarks = landmarks
            .iter()
            .map(|&(x, y)| transform.project(x, y))
            .collect();

        Ok(HandposeOutput {
            projected_landmarks,
            confidence: (confidence * selected.score).clamp(0.0, 1.0),
            palm_regions,
        })
    }
}
