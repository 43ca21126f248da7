//! Turning exit status, parsed values and output artifacts into one result.

use crate::error::{Result, SoxError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Failure {
    /// The engine exited non-zero.
    Engine { exit_code: i32 },
    /// The engine exited zero but the declared output is not on disk.
    ArtifactMissing { path: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub exit_code: i32,
    /// Scalar extracted from output, e.g. a probed duration.
    pub value: Option<f64>,
    /// Output artifact; `None` whenever the run failed.
    pub output: Option<PathBuf>,
    pub failure: Option<Failure>,
}

impl ExecutionResult {
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    /// Convert a failed result into the matching error.
    pub fn into_result(self) -> Result<Self> {
        match self.failure {
            None => Ok(self),
            Some(Failure::Engine { exit_code }) => Err(SoxError::EngineFailed { exit_code }),
            Some(Failure::ArtifactMissing { path }) => Err(SoxError::ArtifactMissing(path)),
        }
    }
}

/// Combine a run's outcome into an [`ExecutionResult`].
///
/// A non-zero exit is a failure whatever exists on disk. A zero exit
/// succeeds only if `declared_output`, when given, exists.
pub fn map_result(
    exit_code: i32,
    value: Option<f64>,
    declared_output: Option<&Path>,
) -> ExecutionResult {
    if exit_code != 0 {
        return ExecutionResult {
            exit_code,
            value,
            output: None,
            failure: Some(Failure::Engine { exit_code }),
        };
    }

    match declared_output {
        Some(path) if !path.exists() => {
            warn!("sox exited cleanly but {} is missing", path.display());
            ExecutionResult {
                exit_code,
                value,
                output: None,
                failure: Some(Failure::ArtifactMissing {
                    path: path.to_path_buf(),
                }),
            }
        }
        _ => ExecutionResult {
            exit_code,
            value,
            output: declared_output.map(Path::to_path_buf),
            failure: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_nonzero_exit_fails_even_with_artifact() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("out.wav");
        fs::write(&out, b"partial").unwrap();

        let result = map_result(1, None, Some(&out));
        assert!(!result.is_success());
        assert_eq!(result.output, None);
        assert!(matches!(
            result.into_result(),
            Err(SoxError::EngineFailed { exit_code: 1 })
        ));
    }

    #[test]
    fn test_zero_exit_with_missing_artifact_fails() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("missing.wav");

        let result = map_result(0, None, Some(&out));
        assert!(!result.is_success());
        assert_eq!(result.failure, Some(Failure::ArtifactMissing { path: out.clone() }));
        assert!(matches!(result.into_result(), Err(SoxError::ArtifactMissing(p)) if p == out));
    }

    #[test]
    fn test_zero_exit_with_artifact_succeeds() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("out.wav");
        fs::write(&out, b"RIFF").unwrap();

        let result = map_result(0, None, Some(&out));
        assert!(result.is_success());
        assert_eq!(result.output, Some(out));
    }

    #[test]
    fn test_zero_exit_without_output_keeps_value() {
        let result = map_result(0, Some(3.25), None);
        assert!(result.is_success());
        assert_eq!(result.value, Some(3.25));
        assert_eq!(result.output, None);
    }
}
