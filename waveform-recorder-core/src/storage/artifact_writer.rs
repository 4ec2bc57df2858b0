//! Persist finished recordings.
//!
//! ```text
//! <dir>/recording.<ext>                 encoded audio
//! <dir>/recording.<ext>.metadata.json   ArtifactMetadata
//! ```

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::models::artifact::RecordingArtifact;
use crate::models::error::RecordError;

/// JSON sidecar describing a saved recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactMetadata {
    pub id: String,
    pub mime_type: String,
    pub size: usize,
    pub duration_secs: f64,
    pub checksum: String,
    pub created_at: String,
}

impl ArtifactMetadata {
    pub fn for_artifact(artifact: &RecordingArtifact) -> Self {
        Self {
            id: artifact.id.clone(),
            mime_type: artifact.mime_type.clone(),
            size: artifact.size(),
            duration_secs: artifact.duration.as_secs_f64(),
            checksum: artifact.checksum.clone(),
            created_at: artifact.created_at.clone(),
        }
    }
}

/// Write `artifact` and its metadata sidecar into `dir`, creating it if needed.
///
/// Returns the path of the audio file.
pub fn save_artifact(artifact: &RecordingArtifact, dir: &Path) -> Result<PathBuf, RecordError> {
    fs::create_dir_all(dir)
        .map_err(|e| RecordError::Storage(format!("failed to create {}: {}", dir.display(), e)))?;

    let path = dir.join(artifact.file_name());
    fs::write(&path, &artifact.data)
        .map_err(|e| RecordError::Storage(format!("failed to write recording: {}", e)))?;
    write_metadata(&ArtifactMetadata::for_artifact(artifact), &path)?;

    log::info!("saved {} bytes to {}", artifact.size(), path.display());
    Ok(path)
}

/// Write metadata as `{recording_path}.metadata.json`.
pub fn write_metadata(metadata: &ArtifactMetadata, recording_path: &Path) -> Result<(), RecordError> {
    let json = serde_json::to_string_pretty(metadata)
        .map_err(|e| RecordError::Storage(format!("failed to serialize metadata: {}", e)))?;
    fs::write(metadata_path(recording_path), json)
        .map_err(|e| RecordError::Storage(format!("failed to write metadata: {}", e)))?;
    Ok(())
}

/// Read the sidecar written next to `recording_path`.
pub fn read_metadata(recording_path: &Path) -> Result<ArtifactMetadata, RecordError> {
    let json = fs::read_to_string(metadata_path(recording_path))
        .map_err(|e| RecordError::Storage(format!("failed to read metadata: {}", e)))?;
    serde_json::from_str(&json).map_err(|e| RecordError::Storage(format!("failed to parse metadata: {}", e)))
}

pub fn metadata_path(recording_path: &Path) -> PathBuf {
    let mut name = OsString::from(recording_path.as_os_str());
    name.push(".metadata.json");
    PathBuf::from(name)
}
