//! Error taxonomy shared by the resolver, installer, and launcher.
//!
//! Every variant is fatal and aborts before the target command is started.
//! Binaries map all of them to [`EXIT_PRE_LAUNCH`] so orchestration layers can
//! tell "the wrapper never started the app" apart from "the app failed".

use std::path::PathBuf;
use thiserror::Error;

/// Reserved exit status for any failure before process replacement (EX_SOFTWARE).
pub const EXIT_PRE_LAUNCH: i32 = 70;

pub type Result<T> = std::result::Result<T, BootstrapError>;

#[derive(Error, Debug)]
pub enum BootstrapError {
    #[error("catalog error: {0}")]
    Catalog(String),

    #[error("manifest error: {0}")]
    Manifest(String),

    #[error("launch error: {0}")]
    Launch(String),

    #[error("plugin install failed: {0}")]
    Install(String),

    #[error("library discovery failed: {0}")]
    Discovery(String),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl BootstrapError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BootstrapError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        BootstrapError::Json {
            path: path.into(),
            source,
        }
    }

    /// Exit status reported to the invoking shell.
    pub fn exit_code(&self) -> i32 {
        EXIT_PRE_LAUNCH
    }
}

/// Exit status for an error surfaced through `anyhow` in a binary's `run()`.
///
/// Anything that is not a [`BootstrapError`] still happened before launch, so
/// it shares the reserved code.
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<BootstrapError>()
        .map(BootstrapError::exit_code)
        .unwrap_or(EXIT_PRE_LAUNCH)
}
