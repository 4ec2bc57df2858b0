use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::artifact::RecordingArtifact;
use crate::events::bus::BusEvent;

/// Notifications published by the recorder.
///
/// Every variant carries the data its subscribers need; nothing has to be
/// read back from the recorder inside a handler.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordEvent {
    RecordStart,
    /// Accumulated recording time, excluding paused intervals.
    RecordProgress(Duration),
    RecordPause(Duration),
    RecordResume,
    /// One encoded chunk, in encoder order.
    RecordDataAvailable(Vec<u8>),
    RecordEnd(Arc<RecordingArtifact>),
    Destroy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordEventKind {
    RecordStart,
    RecordProgress,
    RecordPause,
    RecordResume,
    RecordDataAvailable,
    RecordEnd,
    Destroy,
}

impl RecordEventKind {
    pub const ALL: [RecordEventKind; 7] = [
        Self::RecordStart,
        Self::RecordProgress,
        Self::RecordPause,
        Self::RecordResume,
        Self::RecordDataAvailable,
        Self::RecordEnd,
        Self::Destroy,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::RecordStart => "record-start",
            Self::RecordProgress => "record-progress",
            Self::RecordPause => "record-pause",
            Self::RecordResume => "record-resume",
            Self::RecordDataAvailable => "record-data-available",
            Self::RecordEnd => "record-end",
            Self::Destroy => "destroy",
        }
    }
}

impl fmt::Display for RecordEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl BusEvent for RecordEvent {
    type Kind = RecordEventKind;

    fn kind(&self) -> RecordEventKind {
        match self {
            Self::RecordStart => RecordEventKind::RecordStart,
            Self::RecordProgress(_) => RecordEventKind::RecordProgress,
            Self::RecordPause(_) => RecordEventKind::RecordPause,
            Self::RecordResume => RecordEventKind::RecordResume,
            Self::RecordDataAvailable(_) => RecordEventKind::RecordDataAvailable,
            Self::RecordEnd(_) => RecordEventKind::RecordEnd,
            Self::Destroy => RecordEventKind::Destroy,
        }
    }

    fn destroy() -> Self {
        Self::Destroy
    }
}

/// Format a progress duration as `mm:ss` for display.
///
/// Minutes wrap at one hour.
pub fn format_progress(duration: Duration) -> String {
    let millis = duration.as_millis();
    let minutes = (millis % 3_600_000) / 60_000;
    let seconds = (millis % 60_000) / 1000;
    format!("{:02}:{:02}", minutes, seconds)
}
