//! Result reader for the JSON artifacts written by the reference solver.

use std::fs;
use std::path::Path;

use log::debug;

use crate::errors::{CaseError, ConfigurationError};
use crate::registry::EntityKind;
use crate::results::ResultDatabase;
use crate::services::ResultService;

/// Reads result artifacts from disk.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonResultStore;

impl ResultService for JsonResultStore {
    fn open(&mut self, path: &Path) -> Result<ResultDatabase, CaseError> {
        if !path.is_file() {
            return Err(CaseError::not_found(
                EntityKind::ResultArtifact,
                path.display().to_string(),
            ));
        }
        let unreadable = |reason: String| {
            CaseError::from(ConfigurationError::UnreadableArtifact {
                path: path.display().to_string(),
                reason,
            })
        };
        let text = fs::read_to_string(path).map_err(|error| unreadable(error.to_string()))?;
        let result: ResultDatabase =
            serde_json::from_str(&text).map_err(|error| unreadable(error.to_string()))?;
        debug!(path:? = path, frames = result.frames.len(); "Read result artifact");
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_artifacts_are_not_found() {
        let dir = tempfile::tempdir().expect("temporary directory");
        let path = dir.path().join("CantileverBeamJob.json");
        assert_eq!(
            JsonResultStore.open(&path),
            Err(CaseError::not_found(
                EntityKind::ResultArtifact,
                path.display().to_string()
            ))
        );
    }

    #[test]
    fn corrupt_artifacts_are_reported() {
        let dir = tempfile::tempdir().expect("temporary directory");
        let path = dir.path().join("Broken.json");
        fs::write(&path, "{ not json").expect("write artifact");
        assert!(matches!(
            JsonResultStore.open(&path),
            Err(CaseError::Configuration(
                ConfigurationError::UnreadableArtifact { .. }
            ))
        ));
    }

    #[test]
    fn written_artifacts_round_back() {
        let dir = tempfile::tempdir().expect("temporary directory");
        let path = dir.path().join("Job.json");
        fs::write(&path, r#"{"job":"Job","model":"Model","frames":[]}"#)
            .expect("write artifact");
        let result = JsonResultStore.open(&path).expect("artifact readable");
        assert_eq!(result.job, "Job");
        assert!(result.frames.is_empty());
    }
}
