use std::sync::Arc;

use crate::models::artifact::RecordingArtifact;
use crate::models::error::RecordError;
use crate::processing::waveform::WaveformMode;

/// What a render request draws.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderSource {
    /// Live peaks supplied in the request; no media to load.
    Live,
    /// A finished recording to decode and display.
    Artifact(Arc<RecordingArtifact>),
}

/// One call into the waveform renderer: `(source, channels, duration)`.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderRequest {
    pub source: RenderSource,
    pub channels: Vec<Arc<[f32]>>,
    pub duration_secs: f64,
}

impl RenderRequest {
    pub fn live(samples: Arc<[f32]>, duration_secs: f64) -> Self {
        Self {
            source: RenderSource::Live,
            channels: vec![samples],
            duration_secs,
        }
    }

    pub fn artifact(artifact: Arc<RecordingArtifact>) -> Self {
        let duration_secs = artifact.duration.as_secs_f64();
        Self {
            source: RenderSource::Artifact(artifact),
            channels: Vec::new(),
            duration_secs,
        }
    }
}

/// Waveform display the recorder draws into.
pub trait WaveformRenderer: Send + Sync {
    /// Draw a request. Returns once it is rendered.
    fn load(&self, request: RenderRequest) -> Result<(), RecordError>;

    /// Move the playback cursor, in seconds.
    fn set_time(&self, _secs: f64) {}

    /// A live recording is about to draw; disable interaction and, for a
    /// scrolling waveform, hide the cursor. Options are saved for `end_live`.
    fn begin_live(&self, _mode: &WaveformMode) {}

    /// Restore the options saved by `begin_live`.
    fn end_live(&self) {}
}
