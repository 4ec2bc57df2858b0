use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::RecordError;
use crate::processing::waveform::{WaveformMode, VISUAL_SAMPLE_RATE};

/// Default target bit rate for the encoder.
pub const DEFAULT_BITS_PER_SECOND: u32 = 128_000;

/// Default scrolling window, in seconds.
pub const DEFAULT_SCROLLING_WAVEFORM_WINDOW: f64 = 5.0;

/// Longest accepted scrolling window, in seconds.
pub const MAX_SCROLLING_WAVEFORM_WINDOW: f64 = 600.0;

/// Longest accepted continuous waveform duration, in seconds (24 hours).
pub const MAX_CONTINUOUS_WAVEFORM_DURATION: f64 = 86_400.0;

/// Encoding formats probed in order when no explicit MIME type is set.
pub const MIME_TYPES: [&str; 5] = ["audio/webm", "audio/wav", "audio/mpeg", "audio/mp4", "audio/mp3"];

/// Configuration for a recorder.
///
/// Keys use the host's camelCase option names, so a JSON options object
/// deserializes directly; missing keys take their defaults. A session clones
/// the configuration when it starts and never reads it again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecordConfiguration {
    /// Target encoder bit rate (default: 128000).
    pub audio_bits_per_second: u32,

    /// Force a specific encoding format instead of probing the preference list.
    pub mime_type: Option<String>,

    /// Candidate encoding formats, first supported wins.
    pub mime_type_preferences: Vec<String>,

    /// Render a fixed-length window of the most recent samples.
    pub scrolling_waveform: bool,

    /// Length of the scrolling window in seconds (default: 5).
    pub scrolling_waveform_window: f64,

    /// Render a growing peak envelope of the whole recording.
    pub continuous_waveform: bool,

    /// Expected recording length in seconds; sizes the continuous envelope.
    /// Required when `continuous_waveform` is on.
    pub continuous_waveform_duration: Option<f64>,

    /// Hand the finished artifact to the renderer (default: true).
    pub render_recorded_audio: bool,

    /// Encoder chunking interval in milliseconds (None = one chunk at stop).
    pub media_recorder_timeslice: Option<u64>,
}

impl RecordConfiguration {
    /// Parse host options from JSON.
    pub fn from_json(json: &str) -> Result<Self, RecordError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| RecordError::InvalidConfiguration(format!("failed to parse options: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), RecordError> {
        if self.audio_bits_per_second == 0 {
            return Err(invalid("audio bit rate must be positive"));
        }
        if !self.scrolling_waveform_window.is_finite() || self.scrolling_waveform_window <= 0.0 {
            return Err(invalid(format!(
                "scrolling waveform window must be positive: {}",
                self.scrolling_waveform_window
            )));
        }
        if self.scrolling_waveform_window > MAX_SCROLLING_WAVEFORM_WINDOW {
            return Err(invalid(format!(
                "scrolling waveform window exceeds {} seconds: {}",
                MAX_SCROLLING_WAVEFORM_WINDOW, self.scrolling_waveform_window
            )));
        }
        if self.scrolling_waveform && self.continuous_waveform {
            return Err(invalid("scrolling and continuous waveforms are mutually exclusive"));
        }
        if self.continuous_waveform {
            match self.continuous_waveform_duration {
                None => {
                    return Err(invalid("continuous waveform requires continuousWaveformDuration"));
                }
                Some(d) if !d.is_finite() || d <= 0.0 => {
                    return Err(invalid(format!("continuous waveform duration must be positive: {}", d)));
                }
                Some(d) if d > MAX_CONTINUOUS_WAVEFORM_DURATION => {
                    return Err(invalid(format!(
                        "continuous waveform duration exceeds {} seconds: {}",
                        MAX_CONTINUOUS_WAVEFORM_DURATION, d
                    )));
                }
                Some(_) => {}
            }
        }
        if self.media_recorder_timeslice == Some(0) {
            return Err(invalid("timeslice must be positive"));
        }
        if self.mime_type.is_none() && self.mime_type_preferences.is_empty() {
            return Err(invalid("no encoding formats to choose from"));
        }
        Ok(())
    }

    /// Buffer shape selected by this configuration.
    pub fn waveform_mode(&self) -> WaveformMode {
        if self.scrolling_waveform {
            WaveformMode::Scrolling {
                window_secs: self.scrolling_waveform_window,
            }
        } else if self.continuous_waveform {
            let secs = self.continuous_waveform_duration.unwrap_or(0.0);
            WaveformMode::Continuous {
                initial_capacity: (secs * VISUAL_SAMPLE_RATE).round() as usize,
            }
        } else {
            WaveformMode::Static
        }
    }

    pub fn timeslice(&self) -> Option<Duration> {
        self.media_recorder_timeslice.map(Duration::from_millis)
    }

    /// Formats to probe, in order: the explicit type alone if set, else the preference list.
    pub fn format_candidates(&self) -> Vec<String> {
        match &self.mime_type {
            Some(mime) => vec![mime.clone()],
            None => self.mime_type_preferences.clone(),
        }
    }
}

impl Default for RecordConfiguration {
    fn default() -> Self {
        Self {
            audio_bits_per_second: DEFAULT_BITS_PER_SECOND,
            mime_type: None,
            mime_type_preferences: MIME_TYPES.iter().map(|m| m.to_string()).collect(),
            scrolling_waveform: false,
            scrolling_waveform_window: DEFAULT_SCROLLING_WAVEFORM_WINDOW,
            continuous_waveform: false,
            continuous_waveform_duration: None,
            render_recorded_audio: true,
            media_recorder_timeslice: None,
        }
    }
}

fn invalid(message: impl Into<String>) -> RecordError {
    RecordError::InvalidConfiguration(message.into())
}
