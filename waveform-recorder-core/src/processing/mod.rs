pub mod growable;
pub mod levels;
pub mod waveform;
pub mod wav_encoder;
pub mod wav_format;
