pub mod common;
pub mod ort;
pub mod palm;

use anyhow::Result;

use crate::types::{Frame, HandDetection, NUM_LANDMARKS};

use self::common::HandposeOutput;

pub use self::ort::OrtEngine;

/// Landmark model producing pixel coordinates for one frame.
pub trait HandposeEngine {
    fn infer(&mut self, frame: &Frame) -> Result<HandposeOutput>;
}

/// Per-frame source of at most one normalized hand.
pub trait HandDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Option<HandDetection>>;
}

/// Turns engine output into normalized detections, dropping weak ones.
pub struct HandRecognizer<E> {
    engine: E,
    min_confidence: f32,
}

impl<E: HandposeEngine> HandRecognizer<E> {
    pub fn new(engine: E, min_confidence: f32) -> Self {
        Self {
            engine,
            min_confidence,
        }
    }

    /// Raw engine output alongside the filtered detection.
    pub fn detect_with_output(
        &mut self,
        frame: &Frame,
    ) -> Result<(HandposeOutput, Option<HandDetection>)> {
        let output = self.engine.infer(frame)?;
        let detection = to_detection(&output, frame, self.min_confidence);
        Ok((output, detection))
    }
}

impl<E: HandposeEngine> HandDetector for HandRecognizer<E> {
    fn detect(&mut self, frame: &Frame) -> Result<Option<HandDetection>> {
        Ok(self.detect_with_output(frame)?.1)
    }
}

fn to_detection(output: &HandposeOutput, frame: &Frame, min_confidence: f32) -> Option<HandDetection> {
    if output.confidence < min_confidence || output.projected_landmarks.len() < NUM_LANDMARKS {
        return None;
    }
    Some(HandDetection {
        landmarks: common::normalize_landmarks(
            &output.projected_landmarks,
            frame.width,
            frame.height,
        ),
        confidence: output.confidence,
    })
}
