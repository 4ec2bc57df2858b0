//! Built-in 16-bit PCM WAV encoder.
//!
//! Data flow:
//! ```text
//! [CaptureStream PCM listener] → [PCM byte queue] → take_chunks / stop → [WAV bytes]
//! ```

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use super::levels::convert_to_int16_pcm;
use super::wav_format;
use crate::models::error::RecordError;
use crate::traits::capture_provider::CaptureStream;
use crate::traits::encoder::{EncoderFactory, EncoderOptions, MediaEncoder};

pub const WAV_MIME_TYPE: &str = "audio/wav";

const BIT_DEPTH: u16 = 16;

#[derive(Default)]
struct PcmQueue {
    bytes: Vec<u8>,
    recording: bool,
    paused: bool,
}

/// Encodes a capture stream to WAV.
///
/// Without a timeslice, `stop` returns one chunk: an exact header followed
/// by all PCM data. With a timeslice, chunks leave as soon as a slice worth
/// of audio is queued; the first carries a streaming header whose size
/// fields are [`wav_format::UNKNOWN_SIZE`].
pub struct WavEncoder {
    queue: Arc<Mutex<PcmQueue>>,
    sample_rate: u32,
    channels: u16,
    slice_bytes: Option<usize>,
    header_sent: bool,
    started: bool,
    stopped: bool,
}

impl WavEncoder {
    /// Create an encoder fed by `stream`'s PCM.
    pub fn attach(stream: &mut dyn CaptureStream) -> Self {
        let queue = Arc::new(Mutex::new(PcmQueue::default()));
        let listener_queue = Arc::clone(&queue);
        stream.add_pcm_listener(Arc::new(move |samples: &[f32], _rate: f64, _channels: u16| {
            let pcm = convert_to_int16_pcm(samples);
            let mut q = listener_queue.lock();
            if q.recording && !q.paused {
                q.bytes.extend_from_slice(&pcm);
            }
        }));

        Self {
            queue,
            sample_rate: stream.sample_rate().round() as u32,
            channels: stream.channels().max(1),
            slice_bytes: None,
            header_sent: false,
            started: false,
            stopped: false,
        }
    }

    fn block_align(&self) -> usize {
        self.channels as usize * BIT_DEPTH as usize / 8
    }

    fn streaming_header(&self) -> [u8; wav_format::WAV_HEADER_SIZE] {
        wav_format::generate_streaming_header(self.sample_rate, BIT_DEPTH, self.channels)
    }

    /// Prefix the header to the first chunk that leaves the encoder.
    fn with_header(&mut self, pcm: Vec<u8>) -> Vec<u8> {
        if self.header_sent {
            return pcm;
        }
        self.header_sent = true;
        let mut chunk = Vec::with_capacity(wav_format::WAV_HEADER_SIZE + pcm.len());
        chunk.extend_from_slice(&self.streaming_header());
        chunk.extend_from_slice(&pcm);
        chunk
    }
}

impl MediaEncoder for WavEncoder {
    fn mime_type(&self) -> &str {
        WAV_MIME_TYPE
    }

    fn start(&mut self, timeslice: Option<Duration>) -> Result<(), RecordError> {
        if self.started {
            return Err(RecordError::InvalidState("encoder already started".into()));
        }
        self.started = true;

        let block_align = self.block_align();
        let sample_rate = self.sample_rate as f64;
        self.slice_bytes = timeslice.map(|slice| {
            let frames = (sample_rate * slice.as_secs_f64()).round() as usize;
            frames.max(1) * block_align
        });

        let mut q = self.queue.lock();
        q.recording = true;
        q.paused = false;
        Ok(())
    }

    fn pause(&mut self) {
        self.queue.lock().paused = true;
    }

    fn resume(&mut self) {
        self.queue.lock().paused = false;
    }

    fn take_chunks(&mut self) -> Vec<Vec<u8>> {
        let Some(slice_bytes) = self.slice_bytes else {
            return Vec::new();
        };
        if self.stopped {
            return Vec::new();
        }

        let pcm = {
            let mut q = self.queue.lock();
            if q.bytes.len() < slice_bytes {
                return Vec::new();
            }
            std::mem::take(&mut q.bytes)
        };
        vec![self.with_header(pcm)]
    }

    fn stop(&mut self) -> Result<Vec<Vec<u8>>, RecordError> {
        if !self.started {
            return Err(RecordError::Encoding("encoder was never started".into()));
        }
        if self.stopped {
            return Ok(Vec::new());
        }
        self.stopped = true;

        let pcm = {
            let mut q = self.queue.lock();
            q.recording = false;
            std::mem::take(&mut q.bytes)
        };

        if self.slice_bytes.is_some() {
            if pcm.is_empty() && self.header_sent {
                return Ok(Vec::new());
            }
            return Ok(vec![self.with_header(pcm)]);
        }

        let data_size = u32::try_from(pcm.len())
            .map_err(|_| RecordError::Encoding(format!("{} bytes exceed the WAV size limit", pcm.len())))?;
        let header = wav_format::generate_wav_header(self.sample_rate, BIT_DEPTH, self.channels, data_size);
        let mut file = Vec::with_capacity(wav_format::WAV_HEADER_SIZE + pcm.len());
        file.extend_from_slice(&header);
        file.extend_from_slice(&pcm);
        self.header_sent = true;
        Ok(vec![file])
    }
}

/// [`EncoderFactory`] offering only `audio/wav`.
#[derive(Debug, Default, Clone, Copy)]
pub struct WavEncoderFactory;

impl EncoderFactory for WavEncoderFactory {
    fn is_type_supported(&self, mime_type: &str) -> bool {
        let essence = mime_type.split(';').next().unwrap_or_default().trim();
        essence.eq_ignore_ascii_case(WAV_MIME_TYPE)
    }

    fn create(
        &self,
        mime_type: &str,
        stream: &mut dyn CaptureStream,
        options: &EncoderOptions,
    ) -> Result<Box<dyn MediaEncoder>, RecordError> {
        if !self.is_type_supported(mime_type) {
            return Err(RecordError::UnsupportedFormat(vec![mime_type.to_string()]));
        }
        log::debug!(
            "PCM output ignores the {} bps bit rate target",
            options.audio_bits_per_second
        );
        Ok(Box::new(WavEncoder::attach(stream)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeStream;

    fn started(stream: &mut FakeStream, timeslice: Option<Duration>) -> WavEncoder {
        let mut encoder = WavEncoder::attach(stream);
        encoder.start(timeslice).unwrap();
        encoder
    }

    #[test]
    fn factory_supports_only_wav() {
        let factory = WavEncoderFactory;
        assert!(factory.is_type_supported("audio/wav"));
        assert!(factory.is_type_supported("audio/WAV; codecs=1"));
        assert!(!factory.is_type_supported("audio/webm"));

        let mut stream = FakeStream::new(8000.0);
        let options = EncoderOptions { audio_bits_per_second: 128_000 };
        assert!(matches!(
            factory.create("audio/webm", &mut stream, &options),
            Err(RecordError::UnsupportedFormat(_))
        ));
        assert!(factory.create("audio/wav", &mut stream, &options).is_ok());
    }

    #[test]
    fn stop_without_timeslice_returns_one_exact_file() {
        let mut stream = FakeStream::new(8000.0);
        let mut encoder = started(&mut stream, None);

        stream.deliver_pcm(&[0.0, 0.5, -0.5]);
        stream.deliver_pcm(&[1.0]);
        assert!(encoder.take_chunks().is_empty());

        let chunks = encoder.stop().unwrap();
        assert_eq!(chunks.len(), 1);
        let file = &chunks[0];
        assert_eq!(file.len(), wav_format::WAV_HEADER_SIZE + 8);
        assert_eq!(&file[0..4], b"RIFF");
        assert_eq!(wav_format::data_size(file), Some(8));

        assert!(encoder.stop().unwrap().is_empty());
    }

    #[test]
    fn pcm_is_ignored_before_start_and_while_paused() {
        let mut stream = FakeStream::new(8000.0);
        let mut encoder = WavEncoder::attach(&mut stream);
        stream.deliver_pcm(&[0.5; 4]);

        encoder.start(None).unwrap();
        stream.deliver_pcm(&[0.5; 2]);
        encoder.pause();
        stream.deliver_pcm(&[0.5; 10]);
        encoder.resume();
        stream.deliver_pcm(&[0.5; 1]);

        let chunks = encoder.stop().unwrap();
        assert_eq!(wav_format::data_size(&chunks[0]), Some(6));
    }

    #[test]
    fn timeslice_streams_chunks_with_header_first() {
        let mut stream = FakeStream::new(1000.0);
        // 10 ms at 1 kHz mono 16-bit = 10 frames = 20 bytes
        let mut encoder = started(&mut stream, Some(Duration::from_millis(10)));

        stream.deliver_pcm(&[0.1; 5]);
        assert!(encoder.take_chunks().is_empty());

        stream.deliver_pcm(&[0.1; 5]);
        let first = encoder.take_chunks();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].len(), wav_format::WAV_HEADER_SIZE + 20);
        assert_eq!(wav_format::data_size(&first[0]), Some(wav_format::UNKNOWN_SIZE));

        stream.deliver_pcm(&[0.1; 12]);
        let second = encoder.take_chunks();
        assert_eq!(second[0].len(), 24);

        stream.deliver_pcm(&[0.1; 3]);
        let rest = encoder.stop().unwrap();
        assert_eq!(rest, vec![vec![0xCC, 0x0C, 0xCC, 0x0C, 0xCC, 0x0C]]);
    }

    #[test]
    fn timeslice_stop_with_nothing_left_is_empty() {
        let mut stream = FakeStream::new(1000.0);
        let mut encoder = started(&mut stream, Some(Duration::from_millis(10)));
        stream.deliver_pcm(&[0.1; 10]);
        assert_eq!(encoder.take_chunks().len(), 1);

        assert!(encoder.stop().unwrap().is_empty());
    }

    #[test]
    fn double_start_and_unstarted_stop_fail() {
        let mut stream = FakeStream::new(1000.0);
        let mut encoder = WavEncoder::attach(&mut stream);
        assert!(matches!(encoder.stop(), Err(RecordError::Encoding(_))));

        encoder.start(None).unwrap();
        assert!(matches!(encoder.start(None), Err(RecordError::InvalidState(_))));
    }
}
