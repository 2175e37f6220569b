use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid config value: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum ActionError {
    #[error("input backend error: {0}")]
    Input(String),
    #[error("no monitor available for screenshot")]
    NoMonitor,
    #[error("screen capture failed: {0}")]
    Capture(String),
    #[error("failed to save screenshot to {path}: {source}")]
    Save {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Outcome of a failed frame read: skip the frame, or stop the loop.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("frame unusable: {0:#}")]
    Unusable(anyhow::Error),
    #[error("camera read failed: {0:#}")]
    Fatal(anyhow::Error),
}
