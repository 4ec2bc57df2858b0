use thiserror::Error;

/// Errors that can occur while recording.
///
/// Acquisition and format errors surface from `start_recording`; nothing is
/// retried automatically.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecordError {
    /// No capture stream was available and device access was not granted.
    #[error("capture acquisition failed: {0}")]
    Acquisition(String),

    /// None of the candidate encoding formats is supported by the platform.
    #[error("no supported encoding format among {0:?}")]
    UnsupportedFormat(Vec<String>),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("encoding failed: {0}")]
    Encoding(String),

    #[error("render failed: {0}")]
    Render(String),

    #[error("storage error: {0}")]
    Storage(String),

    /// The recording was stopped while its capture stream was still being acquired.
    #[error("acquisition cancelled")]
    Cancelled,
}
