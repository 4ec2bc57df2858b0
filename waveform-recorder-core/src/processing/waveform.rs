//! Live waveform buffering.
//!
//! The recorder samples the capture stream once per frame and feeds the
//! analysis window to a [`WaveformBuilder`], which keeps one of three buffer
//! shapes. Whatever the capture sample rate, frames arrive at
//! [`VISUAL_SAMPLE_RATE`] per second.

use std::sync::Arc;

use super::growable::GrowableBuffer;
use super::levels::peak_level;

/// Frames per second the waveform is sampled at.
pub const VISUAL_SAMPLE_RATE: f64 = 100.0;

/// Upper bound on any buffer's length, in samples.
pub const MAX_BUFFER_SAMPLES: usize = 1 << 27;

/// Buffer shape, fixed for a builder's lifetime.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WaveformMode {
    /// Only the latest analysis window.
    Static,
    /// The most recent `window_secs` of capture-rate samples.
    Scrolling { window_secs: f64 },
    /// One peak value per frame since the start, in a growable buffer.
    Continuous { initial_capacity: usize },
}

/// An immutable copy of the buffer, safe to hand to a renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct WaveformSnapshot {
    pub samples: Arc<[f32]>,
    /// Time represented by `samples`, in seconds.
    pub span_secs: f64,
}

#[derive(Debug)]
enum Shape {
    Static(Vec<f32>),
    Scrolling { window: Vec<f32>, window_secs: f64 },
    Continuous(GrowableBuffer),
}

#[derive(Debug)]
pub struct WaveformBuilder {
    mode: WaveformMode,
    shape: Shape,
    capture_sample_rate: f64,
    paused: bool,
    frames: u64,
}

impl WaveformBuilder {
    pub fn new(mode: WaveformMode, capture_sample_rate: f64) -> Self {
        let shape = match mode {
            WaveformMode::Static => Shape::Static(Vec::new()),
            WaveformMode::Scrolling { window_secs } => {
                let len = ((window_secs * capture_sample_rate).floor().max(0.0) as usize)
                    .min(MAX_BUFFER_SAMPLES);
                Shape::Scrolling {
                    window: vec![0.0; len],
                    window_secs,
                }
            }
            WaveformMode::Continuous { initial_capacity } => {
                let capacity = initial_capacity.min(MAX_BUFFER_SAMPLES);
                Shape::Continuous(GrowableBuffer::with_capacity(capacity))
            }
        };

        Self {
            mode,
            shape,
            capture_sample_rate,
            paused: false,
            frames: 0,
        }
    }

    /// Consume one frame's analysis window.
    ///
    /// Returns `false` (and leaves the buffer untouched) while paused.
    pub fn push(&mut self, samples: &[f32]) -> bool {
        if self.paused {
            return false;
        }

        match &mut self.shape {
            Shape::Static(buffer) => {
                buffer.clear();
                buffer.extend_from_slice(samples);
            }
            Shape::Scrolling { window, .. } => shift_in(window, samples),
            Shape::Continuous(envelope) => envelope.push(peak_level(samples)),
        }
        self.frames += 1;
        true
    }

    /// Copy of the current buffer.
    pub fn buffer(&self) -> Arc<[f32]> {
        Arc::from(self.samples())
    }

    /// Seconds represented by the buffer.
    pub fn span(&self) -> f64 {
        match &self.shape {
            Shape::Scrolling { window_secs, .. } => *window_secs,
            _ => self.samples().len() as f64 / VISUAL_SAMPLE_RATE,
        }
    }

    pub fn snapshot(&self) -> WaveformSnapshot {
        WaveformSnapshot {
            samples: self.buffer(),
            span_secs: self.span(),
        }
    }

    pub fn len(&self) -> usize {
        self.samples().len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples().is_empty()
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn mode(&self) -> WaveformMode {
        self.mode
    }

    pub fn capture_sample_rate(&self) -> f64 {
        self.capture_sample_rate
    }

    /// Frames accepted so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    fn samples(&self) -> &[f32] {
        match &self.shape {
            Shape::Static(buffer) => buffer,
            Shape::Scrolling { window, .. } => window,
            Shape::Continuous(envelope) => envelope.as_slice(),
        }
    }
}

/// Shift `window` left by `incoming.len()` and write `incoming` at the tail.
fn shift_in(window: &mut [f32], incoming: &[f32]) {
    let len = window.len();
    if incoming.len() >= len {
        window.copy_from_slice(&incoming[incoming.len() - len..]);
        return;
    }
    let n = incoming.len();
    window.copy_within(n.., 0);
    window[len - n..].copy_from_slice(incoming);
}
