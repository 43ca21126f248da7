use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SoxError {
    #[error("Invalid path: {0:?} (file paths must be non-empty and contain no whitespace)")]
    InvalidPath(String),

    #[error("Invalid fade curve: {0:?} (expected one of q, h, t, l, p)")]
    InvalidFadeCurve(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Failed to launch {binary}: {source}")]
    Launch {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("sox exited with code {exit_code}")]
    EngineFailed { exit_code: i32 },

    #[error("Output not found after successful run: {}", .0.display())]
    ArtifactMissing(PathBuf),
}

impl SoxError {
    /// True for errors raised before the engine was invoked.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            SoxError::InvalidPath(_) | SoxError::InvalidFadeCurve(_) | SoxError::InvalidParameter(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, SoxError>;
