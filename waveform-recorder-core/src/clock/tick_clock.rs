//! Cooperative repeating timer.
//!
//! Each frame the clock invokes its callbacks once, then asks the scheduler
//! for the next frame. Stopping only prevents future frames; a tick already
//! in progress runs to completion.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use super::frames::FrameScheduler;
use crate::events::bus::ListenerId;

pub type TickCallback = Arc<dyn Fn() + Send + Sync + 'static>;

struct ClockInner {
    running: bool,
    /// Bumped on every start so frames from an earlier run retire themselves.
    generation: u64,
    listeners: Vec<(ListenerId, TickCallback)>,
    next_id: u64,
    ticks: u64,
}

pub struct TickClock {
    inner: Arc<Mutex<ClockInner>>,
    scheduler: Arc<dyn FrameScheduler>,
}

impl TickClock {
    pub fn new(scheduler: Arc<dyn FrameScheduler>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ClockInner {
                running: false,
                generation: 0,
                listeners: Vec::new(),
                next_id: 0,
                ticks: 0,
            })),
            scheduler,
        }
    }

    /// Register a callback invoked once per tick while running.
    pub fn on_tick<F>(&self, callback: F) -> ListenerId
    where
        F: Fn() + Send + Sync + 'static,
    {
        let mut inner = self.inner.lock();
        let id = ListenerId(inner.next_id);
        inner.next_id += 1;
        inner.listeners.push((id, Arc::new(callback)));
        id
    }

    pub fn off_tick(&self, id: ListenerId) -> bool {
        let mut inner = self.inner.lock();
        let before = inner.listeners.len();
        inner.listeners.retain(|(i, _)| *i != id);
        before != inner.listeners.len()
    }

    /// Start ticking. The first tick runs immediately. No-op while running.
    pub fn start(&self) {
        let generation = {
            let mut inner = self.inner.lock();
            if inner.running {
                return;
            }
            inner.running = true;
            inner.generation += 1;
            inner.generation
        };
        log::debug!("tick clock started (generation {})", generation);

        Self::frame(Arc::clone(&self.inner), Arc::downgrade(&self.scheduler), generation);
    }

    pub fn stop(&self) {
        let mut inner = self.inner.lock();
        if inner.running {
            inner.running = false;
            log::debug!("tick clock stopped after {} ticks", inner.ticks);
        }
    }

    pub fn is_running(&self) -> bool {
        self.inner.lock().running
    }

    /// Ticks delivered since the clock was created.
    pub fn tick_count(&self) -> u64 {
        self.inner.lock().ticks
    }

    pub fn listener_count(&self) -> usize {
        self.inner.lock().listeners.len()
    }

    fn frame(inner: Arc<Mutex<ClockInner>>, scheduler: Weak<dyn FrameScheduler>, generation: u64) {
        let listeners: Vec<TickCallback> = {
            let mut guard = inner.lock();
            if !guard.running || guard.generation != generation {
                return;
            }
            guard.ticks += 1;
            guard.listeners.iter().map(|(_, cb)| Arc::clone(cb)).collect()
        };

        for listener in listeners {
            listener();
        }

        {
            let guard = inner.lock();
            if !guard.running || guard.generation != generation {
                return;
            }
        }
        let Some(scheduler_ref) = scheduler.upgrade() else {
            return;
        };
        scheduler_ref.request_frame(Box::new(move || Self::frame(inner, scheduler, generation)));
    }
}
