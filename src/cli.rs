use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Control the mouse cursor with hand gestures in front of a webcam
#[derive(Parser, Debug)]
#[command(name = "gesture-mouse")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Log at debug level (RUST_LOG still wins)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file path (default: ./gesture-mouse.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Track the hand and drive the mouse until `q` + Enter or Ctrl-C
    Run {
        /// Camera index, overrides the config file
        #[arg(long)]
        camera: Option<u32>,

        /// Log actions instead of moving the real cursor
        #[arg(long)]
        dry_run: bool,
    },

    /// List capture devices
    Cameras,

    /// Detect and classify gestures in still images
    Classify {
        /// Image files (PNG or JPEG)
        #[arg(required = true)]
        images: Vec<PathBuf>,

        /// Write annotated PNGs into this directory
        #[arg(long)]
        annotate_dir: Option<PathBuf>,
    },

    /// Print the effective configuration as TOML
    Config {
        /// Write it to this path instead of stdout
        #[arg(long)]
        write: Option<PathBuf>,
    },
}
