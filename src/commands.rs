//! Subcommand handlers.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use image::RgbaImage;

use crate::{
    config::Config,
    gesture::GestureClassifier,
    pipeline::{HandRecognizer, OrtEngine, skeleton},
    types::{Frame, Gesture},
};

/// Command-line flags layered over the loaded config.
pub fn apply_run_overrides(config: &mut Config, camera: Option<u32>, dry_run: bool) {
    if let Some(index) = camera {
        config.camera.index = index;
    }
    if dry_run {
        config.actions.dry_run = true;
    }
}

#[cfg(feature = "camera-nokhwa")]
pub fn run(config: &Config) -> Result<()> {
    use crossbeam_channel::bounded;

    use crate::{
        actions::{DesktopActions, Dispatcher, DryRunActions, MouseActions},
        pipeline::CameraSource,
        runner::{self, RunSummary, Runner, StopReason},
        types::GestureKind,
    };

    fn drive<A: MouseActions>(
        config: &Config,
        source: CameraSource,
        detector: HandRecognizer<OrtEngine>,
        actions: A,
        stop_rx: crossbeam_channel::Receiver<StopReason>,
    ) -> RunSummary {
        let classifier = GestureClassifier::new(config.gestures.clone());
        let dispatcher = Dispatcher::new(actions, &config.actions);
        Runner::new(source, detector, classifier, dispatcher, stop_rx).run()
    }

    let engine = OrtEngine::from_config(config)?;
    let detector = HandRecognizer::new(engine, config.detection.min_detection_confidence);
    let source = CameraSource::open(config.camera.index, config.camera.mirror)
        .with_context(|| format!("failed to open camera {}", config.camera.index))?;

    let (stop_tx, stop_rx) = bounded(1);
    runner::spawn_stdin_watcher(stop_tx.clone())?;
    runner::install_interrupt_handler(stop_tx)?;

    println!("Tracking hand gestures. Type q and press Enter (or Ctrl-C) to quit.");
    let summary = if config.actions.dry_run {
        drive(config, source, detector, DryRunActions::default(), stop_rx)
    } else {
        let actions = DesktopActions::new().context("failed to set up mouse control")?;
        drive(config, source, detector, actions, stop_rx)
    };

    log::info!(
        "stopped ({:?}) after {} frames, {} without hand, {} skipped, {} failed actions, worst latency {:?}",
        summary.stop,
        summary.frames,
        summary.frames_without_hand,
        summary.skipped_frames,
        summary.failed_actions,
        summary.max_latency
    );
    for kind in GestureKind::ALL {
        log::info!("{}: {}", kind.display_name(), summary.count(kind));
    }
    Ok(())
}

#[cfg(not(feature = "camera-nokhwa"))]
pub fn run(_config: &Config) -> Result<()> {
    anyhow::bail!("built without camera support, enable the `camera-nokhwa` feature")
}

#[cfg(feature = "camera-nokhwa")]
pub fn cameras() -> Result<()> {
    let devices = crate::pipeline::available_cameras().context("failed to query cameras")?;
    if devices.is_empty() {
        println!("No cameras found.");
    }
    for device in devices {
        println!("{}: {}", device.index, device.label);
    }
    Ok(())
}

#[cfg(not(feature = "camera-nokhwa"))]
pub fn cameras() -> Result<()> {
    anyhow::bail!("built without camera support, enable the `camera-nokhwa` feature")
}

pub fn frame_from_image(image: &RgbaImage) -> Frame {
    Frame {
        rgba: image.as_raw().clone(),
        width: image.width(),
        height: image.height(),
        timestamp: Instant::now(),
    }
}

/// `<dir>/<stem>_annotated.png`
pub fn annotated_path(dir: &Path, image: &Path) -> PathBuf {
    let stem = image
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "frame".to_string());
    dir.join(format!("{stem}_annotated.png"))
}

pub fn describe(gesture: Option<&Gesture>) -> String {
    match gesture {
        Some(gesture) => {
            let kind = gesture.kind();
            match gesture {
                Gesture::Move(p) => {
                    format!("{}{} ({:.3}, {:.3})", kind.emoji(), kind.display_name(), p.x, p.y)
                }
                _ => format!("{}{}", kind.emoji(), kind.display_name()),
            }
        }
        None => "no gesture".to_string(),
    }
}

pub fn classify(config: &Config, images: &[PathBuf], annotate_dir: Option<&Path>) -> Result<()> {
    let engine = OrtEngine::from_config(config)?;
    let mut recognizer = HandRecognizer::new(engine, config.detection.min_detection_confidence);
    let classifier = GestureClassifier::new(config.gestures.clone());

    if let Some(dir) = annotate_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
    }

    for path in images {
        let mut image = image::open(path)
            .with_context(|| format!("failed to open {}", path.display()))?
            .to_rgba8();
        let frame = frame_from_image(&image);
        let (output, detection) = recognizer
            .detect_with_output(&frame)
            .with_context(|| format!("hand detection failed on {}", path.display()))?;

        let gesture = detection
            .as_ref()
            .and_then(|d| classifier.classify(&d.landmarks));
        match &detection {
            Some(d) => println!(
                "{}: {} (confidence {:.2})",
                path.display(),
                describe(gesture.as_ref()),
                d.confidence
            ),
            None => println!("{}: no hand", path.display()),
        }

        if let Some(dir) = annotate_dir {
            skeleton::draw_palm_regions(&mut image, &output.palm_regions);
            if detection.is_some() {
                skeleton::draw_skeleton(&mut image, &output.projected_landmarks);
            }
            if let Some(gesture) = gesture {
                skeleton::draw_gesture_banner(&mut image, gesture.kind());
            }
            let out = annotated_path(dir, path);
            image
                .save(&out)
                .with_context(|| format!("failed to write {}", out.display()))?;
            log::info!("annotated image written to {}", out.display());
        }
    }
    Ok(())
}

pub fn config(config: &Config, write: Option<&Path>) -> Result<()> {
    match write {
        Some(path) => {
            config.save(path)?;
            println!("config written to {}", path.display());
        }
        None => print!("{}", config.to_toml()?),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use image::Rgba;

    use super::*;
    use crate::types::Point;

    #[test]
    fn overrides_only_touch_given_flags() {
        let mut config = Config::default();
        apply_run_overrides(&mut config, None, false);
        assert_eq!(config, Config::default());

        apply_run_overrides(&mut config, Some(3), true);
        assert_eq!(config.camera.index, 3);
        assert!(config.actions.dry_run);
    }

    #[test]
    fn image_becomes_frame() {
        let mut image = RgbaImage::new(3, 2);
        image.put_pixel(2, 1, Rgba([1, 2, 3, 4]));
        let frame = frame_from_image(&image);
        assert_eq!((frame.width, frame.height), (3, 2));
        assert_eq!(frame.rgba.len(), 3 * 2 * 4);
        assert_eq!(&frame.rgba[20..24], &[1, 2, 3, 4]);
    }

    #[test]
    fn annotated_output_name() {
        assert_eq!(
            annotated_path(Path::new("out"), Path::new("shots/hand.jpg")),
            Path::new("out").join("hand_annotated.png")
        );
    }

    #[test]
    fn descriptions() {
        assert_eq!(describe(None), "no gesture");
        assert!(describe(Some(&Gesture::LeftClick)).ends_with("Left Click"));
        assert!(describe(Some(&Gesture::Move(Point::new(0.5, 0.25)))).ends_with("(0.500, 0.250)"));
    }

    #[test]
    fn config_is_written_as_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("gesture-mouse.toml");
        config(&Config::default(), Some(&path)).unwrap();
        assert_eq!(Config::load(&path).unwrap(), Config::default());
    }
}
