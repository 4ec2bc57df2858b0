//! Frame sources that drive the [`TickClock`](super::tick_clock::TickClock).
//!
//! A scheduler runs each requested callback once, on the next frame. The
//! clock re-requests a frame from inside every tick, which is what makes the
//! loop repeat.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use crate::models::error::RecordError;

/// Visual frame rate the recorder samples at.
pub const DEFAULT_FRAME_RATE: f64 = 100.0;

pub type FrameCallback = Box<dyn FnOnce() + Send + 'static>;

/// Injectable tick source: runs `callback` once on the next frame.
pub trait FrameScheduler: Send + Sync {
    fn request_frame(&self, callback: FrameCallback);
}

/// Deterministic scheduler: frames only happen when [`advance`](Self::advance) is called.
#[derive(Default)]
pub struct ManualFrames {
    pending: Mutex<Vec<FrameCallback>>,
}

impl ManualFrames {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run one frame: every callback requested before this call.
    ///
    /// Callbacks requested while the frame runs wait for the next one.
    /// Returns how many callbacks ran.
    pub fn advance(&self) -> usize {
        let frame = std::mem::take(&mut *self.pending.lock());
        let count = frame.len();
        for callback in frame {
            callback();
        }
        count
    }

    /// Run `frames` frames in a row.
    pub fn advance_by(&self, frames: usize) {
        for _ in 0..frames {
            self.advance();
        }
    }

    pub fn pending(&self) -> usize {
        self.pending.lock().len()
    }
}

impl FrameScheduler for ManualFrames {
    fn request_frame(&self, callback: FrameCallback) {
        self.pending.lock().push(callback);
    }
}

/// Fixed-rate scheduler backed by a dedicated thread.
///
/// Every `interval` the thread runs the callbacks queued since the last
/// frame. The thread exits when the scheduler is dropped.
pub struct IntervalFrames {
    queue: Arc<Mutex<Vec<FrameCallback>>>,
    running: Arc<AtomicBool>,
    handle: Mutex<Option<thread::JoinHandle<()>>>,
    interval: Duration,
}

impl IntervalFrames {
    pub fn new(interval: Duration) -> Result<Self, RecordError> {
        if interval.is_zero() {
            return Err(RecordError::InvalidConfiguration("frame interval must be positive".into()));
        }

        let queue: Arc<Mutex<Vec<FrameCallback>>> = Arc::new(Mutex::new(Vec::new()));
        let running = Arc::new(AtomicBool::new(true));

        let thread_queue = Arc::clone(&queue);
        let thread_running = Arc::clone(&running);
        let handle = thread::Builder::new()
            .name("frame-scheduler".into())
            .spawn(move || {
                while thread_running.load(Ordering::SeqCst) {
                    thread::sleep(interval);
                    let frame = std::mem::take(&mut *thread_queue.lock());
                    for callback in frame {
                        callback();
                    }
                }
            })
            .map_err(|e| RecordError::InvalidState(format!("failed to spawn frame thread: {}", e)))?;

        Ok(Self {
            queue,
            running,
            handle: Mutex::new(Some(handle)),
            interval,
        })
    }

    /// Scheduler firing `fps` frames per second.
    pub fn at_rate(fps: f64) -> Result<Self, RecordError> {
        if !fps.is_finite() || fps <= 0.0 {
            return Err(RecordError::InvalidConfiguration(format!("invalid frame rate: {}", fps)));
        }
        Self::new(Duration::from_secs_f64(1.0 / fps))
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl FrameScheduler for IntervalFrames {
    fn request_frame(&self, callback: FrameCallback) {
        self.queue.lock().push(callback);
    }
}

impl Drop for IntervalFrames {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        self.queue.lock().clear();
        if let Some(handle) = self.handle.lock().take() {
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
        }
    }
}
