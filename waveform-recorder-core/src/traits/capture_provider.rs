use std::fmt;
use std::sync::Arc;

use crate::models::device::DeviceDescriptor;
use crate::models::error::RecordError;

/// Callback invoked when raw capture audio is available.
///
/// Parameters:
/// - `samples`: Interleaved f32 samples.
/// - `sample_rate`: The actual sample rate of the delivered audio.
/// - `channels`: Number of channels (1 = mono, 2 = stereo interleaved).
pub type AudioBufferCallback = Arc<dyn Fn(&[f32], f64, u16) + Send + Sync + 'static>;

/// A live audio stream, owned by exactly one recording session.
pub trait CaptureStream: Send {
    /// Sample rate of the capture device.
    fn sample_rate(&self) -> f64;

    fn channels(&self) -> u16 {
        1
    }

    /// Whether the stream still carries at least one live audio track.
    fn has_live_audio(&self) -> bool;

    /// Fill `out` with the most recent time-domain samples (analysis tap).
    fn read_time_domain(&mut self, out: &mut [f32]);

    /// Deliver raw PCM to `callback` as it is captured. Used by encoders.
    ///
    /// The callback may fire on the platform's audio thread.
    fn add_pcm_listener(&mut self, callback: AudioBufferCallback);

    /// Stop every track and release the device.
    fn stop_tracks(&mut self);
}

/// Platform access to capture devices.
pub trait CaptureProvider: Send + Sync {
    /// Whether the user has granted access to capture devices.
    fn permission_granted(&self) -> bool;

    /// Open a capture stream on `device_id`, or the default input if `None`.
    ///
    /// Blocks until the platform grants or denies access.
    fn acquire(&self, device_id: Option<&str>) -> Result<Box<dyn CaptureStream>, RecordError>;

    /// Every media device the platform reports.
    fn list_devices(&self) -> Result<Vec<DeviceDescriptor>, RecordError>;
}

/// Where a recording takes its audio from.
pub enum CaptureSource {
    /// A stream the host already holds, e.g. one captured from a media element.
    Stream(Box<dyn CaptureStream>),
    /// A device opened through the [`CaptureProvider`]; `None` for the default input.
    Device(Option<String>),
}

impl fmt::Debug for CaptureSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stream(stream) => f
                .debug_struct("Stream")
                .field("sample_rate", &stream.sample_rate())
                .field("live", &stream.has_live_audio())
                .finish(),
            Self::Device(id) => f.debug_tuple("Device").field(id).finish(),
        }
    }
}
