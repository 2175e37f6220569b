use std::{
    fs,
    io::{self, Write},
    path::Path,
    time::Duration,
};

use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::blocking::Client;

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelKind {
    HandposeEstimator,
    PalmDetector,
}

impl ModelKind {
    pub fn filename(&self) -> &'static str {
        match self {
            ModelKind::HandposeEstimator => "handpose_estimation_mediapipe_2023feb.onnx",
            ModelKind::PalmDetector => "palm_detection_mediapipe_2023feb.onnx",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ModelKind::HandposeEstimator => "handpose estimator",
            ModelKind::PalmDetector => "palm detector",
        }
    }
}

#[derive(Clone, Debug)]
pub enum ModelDownloadEvent {
    AlreadyPresent {
        model: ModelKind,
    },
    Started {
        model: ModelKind,
        total: Option<u64>,
    },
    Progress {
        model: ModelKind,
        downloaded: u64,
        total: Option<u64>,
    },
    Finished {
        model: ModelKind,
    },
}

/// Makes sure `model_path` exists, downloading it from `url` otherwise.
pub fn ensure_model_ready<F>(
    model: ModelKind,
    model_path: &Path,
    url: &str,
    mut on_event: F,
) -> anyhow::Result<()>
where
    F: FnMut(ModelDownloadEvent),
{
    if model_path.exists() {
        on_event(ModelDownloadEvent::AlreadyPresent { model });
        on_event(ModelDownloadEvent::Finished { model });
        return Ok(());
    }

    if let Some(parent) = model_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create model directory {}", parent.display()))?;
    }

    download_to_path(model, url, model_path, &mut on_event).with_context(|| {
        format!(
            "failed to download {} model to {}",
            model.label(),
            model_path.display()
        )
    })
}

/// [`ensure_model_ready`] with a terminal progress bar.
pub fn ensure_model_ready_with_progress(
    model: ModelKind,
    model_path: &Path,
    url: &str,
) -> anyhow::Result<()> {
    let mut progress = DownloadProgress::default();
    ensure_model_ready(model, model_path, url, |event| {
        if let ModelDownloadEvent::AlreadyPresent { model } = &event {
            log::debug!("{} model already at {}", model.label(), model_path.display());
        }
        progress.handle(event);
    })
}

/// Drives one progress bar per model from download events.
#[derive(Default)]
struct DownloadProgress {
    bar: Option<ProgressBar>,
}

impl DownloadProgress {
    fn handle(&mut self, event: ModelDownloadEvent) {
        match event {
            ModelDownloadEvent::AlreadyPresent { .. } => {}
            ModelDownloadEvent::Started { model, total } => {
                let bar = create_progress_bar(total);
                bar.set_message(model.label());
                self.bar = Some(bar);
            }
            ModelDownloadEvent::Progress {
                model,
                downloaded,
                total,
            } => {
                let bar = self.bar.get_or_insert_with(|| {
                    let bar = create_progress_bar(total);
                    bar.set_message(model.label());
                    bar
                });
                if let Some(total) = total {
                    if bar.length() != Some(total) {
                        bar.set_length(total);
                    }
                }
                bar.set_position(downloaded);
            }
            ModelDownloadEvent::Finished { model } => {
                if let Some(bar) = self.bar.take() {
                    bar.finish_with_message(format!("{} model ready", model.label()));
                }
            }
        }
    }
}

/// File writer that reports the running byte count after every chunk.
struct ReportingWriter<'a, W, F> {
    inner: W,
    model: ModelKind,
    written: u64,
    total: Option<u64>,
    on_event: &'a mut F,
}

impl<W: Write, F: FnMut(ModelDownloadEvent)> Write for ReportingWriter<'_, W, F> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.written += n as u64;
        (self.on_event)(ModelDownloadEvent::Progress {
            model: self.model,
            downloaded: self.written,
            total: self.total,
        });
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

fn download_to_path<F>(
    model: ModelKind,
    url: &str,
    dest: &Path,
    on_event: &mut F,
) -> anyhow::Result<()>
where
    F: FnMut(ModelDownloadEvent),
{
    log::info!("fetching {} from {url}", model.label());

    let mut response = Client::builder()
        .timeout(DOWNLOAD_TIMEOUT)
        .build()
        .context("failed to build HTTP client")?
        .get(url)
        .send()
        .context("model request failed")?
        .error_for_status()
        .context("model server refused the request")?;

    let total = response.content_length();
    on_event(ModelDownloadEvent::Started { model, total });

    let partial = dest.with_extension("download");
    let file = fs::File::create(&partial)
        .with_context(|| format!("failed to create {}", partial.display()))?;
    let mut writer = ReportingWriter {
        inner: io::BufWriter::new(file),
        model,
        written: 0,
        total,
        on_event: &mut *on_event,
    };
    let copied = io::copy(&mut response, &mut writer);
    let flushed = writer.flush();
    if let Err(err) = copied.and(flushed) {
        let _ = fs::remove_file(&partial);
        return Err(err).context("model transfer interrupted");
    }
    let written = writer.written;
    drop(writer);

    fs::rename(&partial, dest).with_context(|| {
        format!("failed to move {} to {}", partial.display(), dest.display())
    })?;
    log::info!("{} saved ({written} bytes)", model.label());

    on_event(ModelDownloadEvent::Finished { model });
    Ok(())
}

fn create_progress_bar(total_size: Option<u64>) -> ProgressBar {
    match total_size {
        Some(total) if total > 0 => {
            let pb = ProgressBar::new(total);
            if let Ok(style) = ProgressStyle::with_template(
                "{spinner:.green} {msg} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({eta})",
            ) {
                pb.set_style(style.progress_chars("=>-"));
            }
            pb
        }
        _ => {
            let pb = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::with_template("{spinner:.green} downloading {msg} {bytes}") {
                pb.set_style(style);
            }
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn existing_model_is_not_downloaded() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(ModelKind::PalmDetector.filename());
        fs::write(&path, b"onnx").unwrap();

        let mut events = Vec::new();
        ensure_model_ready(
            ModelKind::PalmDetector,
            &path,
            "http://127.0.0.1:9/unreachable",
            |evt| events.push(evt),
        )
        .unwrap();

        assert!(matches!(
            events.as_slice(),
            [
                ModelDownloadEvent::AlreadyPresent {
                    model: ModelKind::PalmDetector
                },
                ModelDownloadEvent::Finished {
                    model: ModelKind::PalmDetector
                }
            ]
        ));
    }

    #[test]
    fn unreachable_url_reports_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("models").join("missing.onnx");
        let result = ensure_model_ready(
            ModelKind::HandposeEstimator,
            &path,
            "http://127.0.0.1:9/unreachable",
            |_| {},
        );
        assert!(result.is_err());
        assert!(!path.exists());
    }

    #[test]
    fn progress_follows_download_events() {
        let model = ModelKind::HandposeEstimator;
        let mut progress = DownloadProgress::default();

        progress.handle(ModelDownloadEvent::Started { model, total: None });
        progress.handle(ModelDownloadEvent::Progress {
            model,
            downloaded: 40,
            total: Some(100),
        });
        let bar = progress.bar.as_ref().unwrap();
        assert_eq!(bar.position(), 40);
        assert_eq!(bar.length(), Some(100));
        assert_eq!(bar.message(), model.label());

        progress.handle(ModelDownloadEvent::Finished { model });
        assert!(progress.bar.is_none());
    }

    #[test]
    fn progress_without_start_creates_bar() {
        let model = ModelKind::PalmDetector;
        let mut progress = DownloadProgress::default();
        progress.handle(ModelDownloadEvent::Progress {
            model,
            downloaded: 7,
            total: Some(10),
        });
        let bar = progress.bar.as_ref().unwrap();
        assert_eq!((bar.position(), bar.length()), (7, Some(10)));
    }

    #[test]
    fn filenames_are_distinct_onnx_files() {
        let a = ModelKind::HandposeEstimator.filename();
        let b = ModelKind::PalmDetector.filename();
        assert_ne!(a, b);
        assert!(a.ends_with(".onnx") && b.ends_with(".onnx"));
    }
}
