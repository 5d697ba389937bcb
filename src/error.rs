use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Everything that can abort an injection run.
///
/// None of these are recovered from: the build cannot go on without a
/// complete configuration, so the error is surfaced to the host as-is.
#[derive(Debug, Error)]
pub enum InjectError {
    #[error("configuration file not found: {}", path.display())]
    ConfigMissing { path: PathBuf },

    #[error("configuration file {} is not valid JSON", path.display())]
    ConfigMalformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("missing configuration field `{0}`")]
    ConfigFieldMissing(String),

    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    #[error("filesystem error on {}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write rendered output")]
    Output(#[source] io::Error),

    #[error("value of `{name}` cannot be emitted for the {target} target")]
    Unrepresentable { name: String, target: &'static str },

    #[error("usage: {0}")]
    Usage(String),
}

impl InjectError {
    pub(crate) fn filesystem(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Filesystem {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, InjectError>;
