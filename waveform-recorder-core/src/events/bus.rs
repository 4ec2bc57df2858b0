use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::Mutex;

/// An event that can travel over an [`EventBus`].
pub trait BusEvent: Send + Sync + 'static {
    /// Key handlers are registered under.
    type Kind: Copy + Eq + Hash + Debug + Send + Sync + 'static;

    fn kind(&self) -> Self::Kind;

    /// The event emitted once when the bus is torn down.
    fn destroy() -> Self;
}

/// Handle identifying one registration on a bus or clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub(crate) u64);

pub type Handler<E> = Arc<dyn Fn(&E) + Send + Sync + 'static>;

struct Registration<E> {
    id: ListenerId,
    handler: Handler<E>,
    once: bool,
}

struct BusInner<E: BusEvent> {
    handlers: HashMap<E::Kind, Vec<Registration<E>>>,
    /// Every registration made through `on`/`once`, for bulk teardown.
    subscriptions: Vec<(E::Kind, ListenerId)>,
    next_id: u64,
    destroyed: bool,
}

/// Synchronous publish/subscribe.
///
/// Handlers for a kind run in registration order on the emitting thread.
/// The bus lock is released before any handler runs, so handlers may
/// subscribe, unsubscribe or emit from inside a callback.
pub struct EventBus<E: BusEvent> {
    inner: Mutex<BusInner<E>>,
}

impl<E: BusEvent> EventBus<E> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(BusInner {
                handlers: HashMap::new(),
                subscriptions: Vec::new(),
                next_id: 0,
                destroyed: false,
            }),
        }
    }

    /// Register `handler` for every event of `kind`.
    pub fn on<F>(&self, kind: E::Kind, handler: F) -> ListenerId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.register(kind, Arc::new(handler), false)
    }

    /// Register `handler` for the next event of `kind` only.
    pub fn once<F>(&self, kind: E::Kind, handler: F) -> ListenerId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.register(kind, Arc::new(handler), true)
    }

    /// Remove one handler. Returns whether it was still registered.
    pub fn off(&self, kind: E::Kind, id: ListenerId) -> bool {
        let mut inner = self.inner.lock();
        inner.subscriptions.retain(|(k, i)| !(*k == kind && *i == id));
        let Some(list) = inner.handlers.get_mut(&kind) else {
            return false;
        };
        let before = list.len();
        list.retain(|r| r.id != id);
        before != list.len()
    }

    /// Deliver `event` to every handler currently registered for its kind.
    pub fn emit(&self, event: E) {
        let kind = event.kind();
        let handlers: Vec<Handler<E>> = {
            let mut inner = self.inner.lock();
            if inner.destroyed {
                return;
            }
            let Some(list) = inner.handlers.get_mut(&kind) else {
                return;
            };
            let handlers: Vec<Handler<E>> = list.iter().map(|r| Arc::clone(&r.handler)).collect();
            let fired_once: Vec<ListenerId> = list.iter().filter(|r| r.once).map(|r| r.id).collect();
            list.retain(|r| !r.once);
            if !fired_once.is_empty() {
                inner
                    .subscriptions
                    .retain(|(k, i)| !(*k == kind && fired_once.contains(i)));
            }
            handlers
        };

        for handler in handlers {
            handler(&event);
        }
    }

    /// Remove every registration made through this bus.
    pub fn unsubscribe_all(&self) {
        let subscriptions = std::mem::take(&mut self.inner.lock().subscriptions);
        for (kind, id) in subscriptions {
            self.off(kind, id);
        }
    }

    /// Emit the destroy event, then drop every handler.
    ///
    /// Further `emit` calls are no-ops and further registrations are ignored.
    pub fn destroy(&self) {
        if self.inner.lock().destroyed {
            return;
        }
        self.emit(E::destroy());

        let mut inner = self.inner.lock();
        inner.destroyed = true;
        inner.handlers.clear();
        inner.subscriptions.clear();
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.lock().destroyed
    }

    /// Number of handlers registered for `kind`.
    pub fn listener_count(&self, kind: E::Kind) -> usize {
        self.inner.lock().handlers.get(&kind).map_or(0, Vec::len)
    }

    fn register(&self, kind: E::Kind, handler: Handler<E>, once: bool) -> ListenerId {
        let mut inner = self.inner.lock();
        let id = ListenerId(inner.next_id);
        inner.next_id += 1;

        if inner.destroyed {
            log::debug!("ignoring {:?} subscription on a destroyed bus", kind);
            return id;
        }

        inner
            .handlers
            .entry(kind)
            .or_default()
            .push(Registration { id, handler, once });
        inner.subscriptions.push((kind, id));
        id
    }
}

impl<E: BusEvent> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, PartialEq)]
    enum TestEvent {
        Ping(u32),
        Pong,
        Gone,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum TestKind {
        Ping,
        Pong,
        Gone,
    }

    impl BusEvent for TestEvent {
        type Kind = TestKind;

        fn kind(&self) -> TestKind {
            match self {
                Self::Ping(_) => TestKind::Ping,
                Self::Pong => TestKind::Pong,
                Self::Gone => TestKind::Gone,
            }
        }

        fn destroy() -> Self {
            Self::Gone
        }
    }

    fn recorder(bus: &EventBus<TestEvent>, kind: TestKind) -> Arc<Mutex<Vec<TestEvent>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        bus.on(kind, move |e: &TestEvent| sink.lock().push(e.clone()));
        seen
    }

    #[test]
    fn emits_in_registration_order() {
        let bus: EventBus<TestEvent> = EventBus::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        for n in 0..3 {
            let order = Arc::clone(&order);
            bus.on(TestKind::Ping, move |_: &TestEvent| order.lock().push(n));
        }

        bus.emit(TestEvent::Ping(1));
        assert_eq!(*order.lock(), vec![0, 1, 2]);
    }

    #[test]
    fn only_matching_kind_is_delivered() {
        let bus: EventBus<TestEvent> = EventBus::new();
        let pings = recorder(&bus, TestKind::Ping);

        bus.emit(TestEvent::Pong);
        bus.emit(TestEvent::Ping(7));

        assert_eq!(*pings.lock(), vec![TestEvent::Ping(7)]);
    }

    #[test]
    fn emit_without_subscribers_is_fine() {
        let bus: EventBus<TestEvent> = EventBus::new();
        bus.emit(TestEvent::Pong);
    }

    #[test]
    fn once_fires_a_single_time() {
        let bus: EventBus<TestEvent> = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        bus.once(TestKind::Ping, move |_: &TestEvent| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        bus.emit(TestEvent::Ping(1));
        bus.emit(TestEvent::Ping(2));

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(bus.listener_count(TestKind::Ping), 0);
    }

    #[test]
    fn off_removes_one_handler() {
        let bus: EventBus<TestEvent> = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        let id = bus.on(TestKind::Ping, move |_: &TestEvent| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        let kept = recorder(&bus, TestKind::Ping);

        assert!(bus.off(TestKind::Ping, id));
        assert!(!bus.off(TestKind::Ping, id));
        bus.emit(TestEvent::Ping(3));

        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(kept.lock().len(), 1);
    }

    #[test]
    fn handlers_may_reenter_the_bus() {
        let bus: Arc<EventBus<TestEvent>> = Arc::new(EventBus::new());
        let pongs = recorder(&bus, TestKind::Pong);
        let inner = Arc::clone(&bus);
        bus.on(TestKind::Ping, move |_: &TestEvent| inner.emit(TestEvent::Pong));

        bus.emit(TestEvent::Ping(0));
        assert_eq!(pongs.lock().len(), 1);
    }

    #[test]
    fn unsubscribe_all_clears_registrations() {
        let bus: EventBus<TestEvent> = EventBus::new();
        let pings = recorder(&bus, TestKind::Ping);
        let pongs = recorder(&bus, TestKind::Pong);

        bus.unsubscribe_all();
        bus.emit(TestEvent::Ping(1));
        bus.emit(TestEvent::Pong);

        assert!(pings.lock().is_empty());
        assert!(pongs.lock().is_empty());
        assert!(!bus.is_destroyed());
    }

    #[test]
    fn destroy_emits_once_then_silences_the_bus() {
        let bus: EventBus<TestEvent> = EventBus::new();
        let gone = recorder(&bus, TestKind::Gone);
        let pings = recorder(&bus, TestKind::Ping);

        bus.destroy();
        bus.destroy();
        bus.emit(TestEvent::Ping(1));
        bus.emit(TestEvent::Gone);

        assert_eq!(*gone.lock(), vec![TestEvent::Gone]);
        assert!(pings.lock().is_empty());
        assert!(bus.is_destroyed());
    }

    #[test]
    fn registrations_after_destroy_are_ignored() {
        let bus: EventBus<TestEvent> = EventBus::new();
        bus.destroy();

        let pings = recorder(&bus, TestKind::Ping);
        bus.emit(TestEvent::Ping(1));

        assert!(pings.lock().is_empty());
        assert_eq!(bus.listener_count(TestKind::Ping), 0);
    }
}
