use std::time::Duration;

use super::capture_provider::CaptureStream;
use crate::models::error::RecordError;

/// Settings passed to an encoder when a session starts.
#[derive(Debug, Clone, PartialEq)]
pub struct EncoderOptions {
    pub audio_bits_per_second: u32,
}

/// An audio encoder attached to one capture stream.
///
/// Encoders never call back into the recorder: encoded data is collected by
/// the session through [`take_chunks`](Self::take_chunks) on every tick and
/// through the return value of [`stop`](Self::stop).
pub trait MediaEncoder: Send {
    /// Actual output type, possibly with codec parameters.
    fn mime_type(&self) -> &str;

    /// Begin encoding. With a `timeslice`, data is made available in chunks
    /// of roughly that length; without one, everything arrives at stop.
    fn start(&mut self, timeslice: Option<Duration>) -> Result<(), RecordError>;

    fn pause(&mut self);

    fn resume(&mut self);

    /// Chunks completed since the last call, in order. Empty chunks are never returned.
    fn take_chunks(&mut self) -> Vec<Vec<u8>>;

    /// Stop and flush. Blocks until buffered data is encoded and returns the
    /// remaining chunks.
    fn stop(&mut self) -> Result<Vec<Vec<u8>>, RecordError>;
}

/// Platform encoder support.
pub trait EncoderFactory: Send + Sync {
    fn is_type_supported(&self, mime_type: &str) -> bool;

    fn create(
        &self,
        mime_type: &str,
        stream: &mut dyn CaptureStream,
        options: &EncoderOptions,
    ) -> Result<Box<dyn MediaEncoder>, RecordError>;
}
