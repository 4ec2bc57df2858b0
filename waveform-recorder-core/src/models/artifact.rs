use std::time::Duration;

use sha2::{Digest, Sha256};

/// Extension used when the MIME type carries no subtype.
pub const DEFAULT_EXTENSION: &str = "webm";

/// The encoded output of a completed recording.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingArtifact {
    pub id: String,
    pub data: Vec<u8>,
    pub mime_type: String,
    pub duration: Duration,
    pub created_at: String,
    pub checksum: String,
}

impl RecordingArtifact {
    /// Assemble the accumulated encoder chunks, in order, into one artifact.
    pub fn assemble(chunks: Vec<Vec<u8>>, mime_type: &str, duration: Duration) -> Self {
        let total = chunks.iter().map(Vec::len).sum();
        let mut data = Vec::with_capacity(total);
        for chunk in chunks {
            data.extend_from_slice(&chunk);
        }
        let checksum = hex_digest(&Sha256::digest(&data));

        Self {
            id: uuid::Uuid::new_v4().to_string(),
            data,
            mime_type: mime_type.to_string(),
            duration,
            created_at: chrono::Utc::now().to_rfc3339(),
            checksum,
        }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// File extension from the MIME subtype: `audio/webm;codecs=opus` → `webm`.
    pub fn extension(&self) -> &str {
        extension_for(&self.mime_type)
    }

    /// Download name, `recording.<extension>`.
    pub fn file_name(&self) -> String {
        format!("recording.{}", self.extension())
    }
}

pub fn extension_for(mime_type: &str) -> &str {
    let essence = mime_type.split(';').next().unwrap_or_default().trim();
    match essence.split_once('/') {
        Some((_, subtype)) if !subtype.is_empty() => subtype,
        _ => DEFAULT_EXTENSION,
    }
}

fn hex_digest(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
