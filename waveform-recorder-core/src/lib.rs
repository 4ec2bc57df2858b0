//! # waveform-recorder-core
//!
//! Platform-agnostic audio recording core with a live waveform.
//!
//! Captures audio from a platform stream, encodes it into a recording
//! artifact, samples the signal once per frame into a waveform buffer for a
//! renderer, and publishes lifecycle events. Platform backends implement the
//! `CaptureProvider`, `EncoderFactory` and `WaveformRenderer` traits and plug
//! into `RecordPlugin`.
//!
//! ## Architecture
//!
//! ```text
//! waveform-recorder-core (this crate)
//! ├── traits/       ← CaptureProvider, CaptureStream, EncoderFactory, MediaEncoder, WaveformRenderer
//! ├── models/       ← RecordError, RecordState, RecordConfiguration, RecordEvent, RecordingArtifact
//! ├── events/       ← EventBus (typed publish/subscribe)
//! ├── clock/        ← TickClock, frame schedulers, time sources
//! ├── processing/   ← WaveformBuilder, GrowableBuffer, levels, WAV encoder
//! ├── session/      ← CaptureSessionManager (recording lifecycle)
//! ├── storage/      ← artifact file output + metadata sidecar
//! └── plugin.rs     ← RecordPlugin (host facade)
//! ```

pub mod clock;
pub mod events;
pub mod models;
pub mod plugin;
pub mod processing;
pub mod session;
pub mod storage;
pub mod traits;

#[cfg(test)]
mod testing;

// Re-export key types at crate root for convenience.
pub use clock::frames::{FrameScheduler, IntervalFrames, ManualFrames};
pub use clock::tick_clock::TickClock;
pub use clock::time::{ManualTime, MonotonicTime, TimeSource};
pub use events::bus::{BusEvent, EventBus, ListenerId};
pub use models::artifact::RecordingArtifact;
pub use models::config::RecordConfiguration;
pub use models::device::{DeviceDescriptor, DeviceKind};
pub use models::error::RecordError;
pub use models::events::{RecordEvent, RecordEventKind};
pub use models::state::RecordState;
pub use plugin::{Platform, RecordPlugin};
pub use processing::wav_encoder::{WavEncoder, WavEncoderFactory};
pub use processing::waveform::{WaveformBuilder, WaveformMode, WaveformSnapshot, VISUAL_SAMPLE_RATE};
pub use session::recorder::CaptureSessionManager;
pub use storage::artifact_writer::{read_metadata, save_artifact, ArtifactMetadata};
pub use traits::capture_provider::{AudioBufferCallback, CaptureProvider, CaptureSource, CaptureStream};
pub use traits::encoder::{EncoderFactory, EncoderOptions, MediaEncoder};
pub use traits::renderer::{RenderRequest, RenderSource, WaveformRenderer};
