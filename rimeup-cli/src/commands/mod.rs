//! CLI subcommands.

pub mod config;
pub mod deploy;
pub mod status;
pub mod update;

use clap::ValueEnum;
use rimeup::updater::ArtifactKind;

/// Artifact selection for CLI arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ArtifactArg {
    /// Input scheme archive
    Scheme,
    /// Dictionary archive
    Dict,
    /// Language model file
    Model,
}

impl From<ArtifactArg> for ArtifactKind {
    fn from(arg: ArtifactArg) -> Self {
        match arg {
            ArtifactArg::Scheme => ArtifactKind::Scheme,
            ArtifactArg::Dict => ArtifactKind::Dict,
            ArtifactArg::Model => ArtifactKind::Model,
        }
    }
}

/// Format a byte count as a human-readable string.
pub fn format_bytes(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;

    let b = bytes as f64;
    if b >= GB {
        format!("{:.2} GB", b / GB)
    } else if b >= MB {
        format!("{:.1} MB", b / MB)
    } else if b >= KB {
        format!("{:.1} KB", b / KB)
    } else {
        format!("{} B", bytes)
    }
}
