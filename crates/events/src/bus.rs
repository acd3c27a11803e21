//! Notification bus for build lifecycle events.
//!
//! Two kinds of consumers are supported:
//!
//! - **Listeners**: synchronous callbacks registered per [`EventKind`]. They run
//!   inline at emission on a snapshot of the listener list, so adding or
//!   removing listeners (even from inside a listener) never affects an emission
//!   already in progress. A panicking listener is isolated and logged.
//! - **Receivers**: async consumers created with [`NotificationBus::subscribe`],
//!   fed through a tokio broadcast channel. Publishing never waits on them.
//!
//! Emission never awaits anything. Listeners still run on the emitting task,
//! so a slow listener delays the build by however long it takes; consumers
//! that do real work should use [`NotificationBus::subscribe`] instead, which
//! only lags (and drops the oldest events) when it falls behind.

use crate::event::{Event, EventKind, EventPayload, SharedError};
use std::collections::HashMap;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::broadcast;

/// Default channel capacity for the broadcast channel.
const DEFAULT_BROADCAST_CAPACITY: usize = 1000;

/// Callback invoked for every event of the kind it was registered for.
pub type Listener = Arc<dyn Fn(&Event) + Send + Sync>;

/// Handle returned by [`NotificationBus::add_listener`], used to remove it again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type ListenerMap = HashMap<EventKind, Vec<(ListenerId, Listener)>>;

/// Publish/subscribe channel for build events.
pub struct NotificationBus {
    listeners: RwLock<ListenerMap>,
    next_id: AtomicU64,
    broadcast_tx: broadcast::Sender<Event>,
}

impl NotificationBus {
    /// Create a new bus.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_BROADCAST_CAPACITY)
    }

    /// Create a new bus with a specific broadcast capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (broadcast_tx, _) = broadcast::channel(capacity.max(1));
        Self {
            listeners: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(0),
            broadcast_tx,
        }
    }

    /// Register a listener for one event kind.
    pub fn add_listener<F>(&self, kind: EventKind, listener: F) -> ListenerId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(kind)
            .or_default()
            .push((id, Arc::new(listener)));
        id
    }

    /// Remove a listener. Returns `false` if it was not registered for `kind`.
    pub fn remove_listener(&self, kind: EventKind, id: ListenerId) -> bool {
        let mut listeners = self
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let Some(registered) = listeners.get_mut(&kind) else {
            return false;
        };
        let before = registered.len();
        registered.retain(|(existing, _)| *existing != id);
        before != registered.len()
    }

    /// Remove every listener of every kind.
    pub fn remove_all_listeners(&self) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Number of listeners registered for `kind`.
    #[must_use]
    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .map_or(0, Vec::len)
    }

    /// Subscribe to every event emitted after this call.
    #[must_use]
    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver {
            inner: self.broadcast_tx.subscribe(),
        }
    }

    /// Get the number of active async subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.broadcast_tx.receiver_count()
    }

    /// Emit `buildStarted`.
    pub fn build_started(&self, target: &str) {
        self.publish(EventPayload::BuildStarted {
            target: target.to_string(),
        });
    }

    /// Emit `buildComplete`.
    pub fn build_complete(&self, target: &str) {
        self.publish(EventPayload::BuildComplete {
            target: target.to_string(),
        });
    }

    /// Emit `buildFailed`.
    pub fn build_failed(&self, target: &str, error: SharedError) {
        self.publish(EventPayload::BuildFailed {
            target: target.to_string(),
            error,
        });
    }

    /// Emit `targetExecutionStarted`.
    pub fn target_execution_started(&self, target: Option<&str>) {
        self.publish(EventPayload::TargetExecutionStarted {
            target: target.map(str::to_string),
        });
    }

    /// Emit `targetExecutionCompleted`.
    pub fn target_execution_completed(&self, target: Option<&str>) {
        self.publish(EventPayload::TargetExecutionCompleted {
            target: target.map(str::to_string),
        });
    }

    /// Emit `targetExecutionFailed`.
    pub fn target_execution_failed(&self, target: Option<&str>, error: SharedError) {
        self.publish(EventPayload::TargetExecutionFailed {
            target: target.map(str::to_string),
            error,
        });
    }

    /// Emit `consoleOutput`.
    pub fn console_output(&self, content: &str, target: Option<&str>) {
        self.publish(EventPayload::ConsoleOutput {
            content: content.to_string(),
            target: target.map(str::to_string),
        });
    }

    fn publish(&self, payload: EventPayload) {
        let event = Event::new(payload);
        let kind = event.kind();
        tracing::trace!(kind = %kind, target = ?event.target(), "Emitting event");

        // Snapshot so the lock is not held while listeners run.
        let snapshot: Vec<(ListenerId, Listener)> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .cloned()
            .unwrap_or_default();

        for (id, listener) in snapshot {
            if catch_unwind(AssertUnwindSafe(|| listener(&event))).is_err() {
                tracing::warn!(kind = %kind, listener = ?id, "Event listener panicked");
            }
        }

        // No receivers is not an error.
        let _ = self.broadcast_tx.send(event);
    }
}

impl Default for NotificationBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for NotificationBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let listeners: usize = self
            .listeners
            .read()
            .map(|map| map.values().map(Vec::len).sum())
            .unwrap_or_default();
        f.debug_struct("NotificationBus")
            .field("listeners", &listeners)
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// Receiver handle for receiving events from a [`NotificationBus`].
#[derive(Debug)]
pub struct EventReceiver {
    inner: broadcast::Receiver<Event>,
}

impl EventReceiver {
    /// Receive the next event.
    ///
    /// Returns `None` once the bus has been dropped.
    /// May skip events if the receiver falls behind.
    pub async fn recv(&mut self) -> Option<Event> {
        loop {
            match self.inner.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Event receiver lagged, skipped events");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Try to receive an event without waiting.
    ///
    /// Returns `None` if no event is immediately available or the bus is closed.
    pub fn try_recv(&mut self) -> Option<Event> {
        loop {
            match self.inner.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Event receiver lagged, skipped events");
                }
                Err(
                    broadcast::error::TryRecvError::Empty | broadcast::error::TryRecvError::Closed,
                ) => {
                    return None;
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::similar_names)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;

    fn recorder(bus: &NotificationBus, kind: EventKind) -> Arc<Mutex<Vec<Event>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        bus.add_listener(kind, move |event| sink.lock().unwrap().push(event.clone()));
        seen
    }

    #[derive(Debug)]
    struct Failure;

    impl fmt::Display for Failure {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("failure")
        }
    }

    impl std::error::Error for Failure {}

    #[test]
    fn test_listener_receives_only_its_kind() {
        let bus = NotificationBus::new();
        let started = recorder(&bus, EventKind::BuildStarted);
        let completed = recorder(&bus, EventKind::BuildComplete);

        bus.build_started("all");

        assert_eq!(started.lock().unwrap().len(), 1);
        assert!(completed.lock().unwrap().is_empty());
        assert_eq!(started.lock().unwrap()[0].target(), Some("all"));
    }

    #[test]
    fn test_multiple_listeners_per_kind() {
        let bus = NotificationBus::new();
        let first = recorder(&bus, EventKind::ConsoleOutput);
        let second = recorder(&bus, EventKind::ConsoleOutput);

        bus.console_output("hello", Some("greet"));

        assert_eq!(first.lock().unwrap().len(), 1);
        assert_eq!(second.lock().unwrap().len(), 1);
        assert_eq!(bus.listener_count(EventKind::ConsoleOutput), 2);
    }

    #[test]
    fn test_remove_listener() {
        let bus = NotificationBus::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let id = bus.add_listener(EventKind::BuildComplete, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        bus.build_complete("a");
        assert!(bus.remove_listener(EventKind::BuildComplete, id));
        assert!(!bus.remove_listener(EventKind::BuildComplete, id));
        assert!(!bus.remove_listener(EventKind::BuildStarted, id));
        bus.build_complete("a");

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_remove_all_listeners() {
        let bus = NotificationBus::new();
        let seen = recorder(&bus, EventKind::BuildStarted);
        let _ = recorder(&bus, EventKind::BuildFailed);

        bus.remove_all_listeners();
        bus.build_started("all");

        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(bus.listener_count(EventKind::BuildStarted), 0);
        assert_eq!(bus.listener_count(EventKind::BuildFailed), 0);
    }

    #[test]
    fn test_listener_added_during_emission_sees_next_event_only() {
        let bus = Arc::new(NotificationBus::new());
        let late_calls = Arc::new(AtomicUsize::new(0));

        let bus_in_listener = Arc::clone(&bus);
        let late = Arc::clone(&late_calls);
        bus.add_listener(EventKind::BuildStarted, move |_| {
            let late = Arc::clone(&late);
            bus_in_listener.add_listener(EventKind::BuildStarted, move |_| {
                late.fetch_add(1, Ordering::SeqCst);
            });
        });

        bus.build_started("first");
        assert_eq!(late_calls.load(Ordering::SeqCst), 0);

        bus.build_started("second");
        assert_eq!(late_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_listener_can_remove_itself() {
        let bus = Arc::new(NotificationBus::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let own_id = Arc::new(Mutex::new(None));

        let bus_in_listener = Arc::clone(&bus);
        let counter = Arc::clone(&calls);
        let slot = Arc::clone(&own_id);
        let id = bus.add_listener(EventKind::BuildComplete, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            if let Some(id) = *slot.lock().unwrap() {
                bus_in_listener.remove_listener(EventKind::BuildComplete, id);
            }
        });
        *own_id.lock().unwrap() = Some(id);

        bus.build_complete("x");
        bus.build_complete("x");

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_panicking_listener_does_not_block_others() {
        let bus = NotificationBus::new();
        bus.add_listener(EventKind::TargetExecutionStarted, |_| panic!("listener bug"));
        let seen = recorder(&bus, EventKind::TargetExecutionStarted);

        bus.target_execution_started(Some("compile"));

        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_failure_event_carries_shared_error() {
        let bus = NotificationBus::new();
        let seen = recorder(&bus, EventKind::TargetExecutionFailed);
        let error: SharedError = Arc::new(Failure);

        bus.target_execution_failed(Some("lint"), Arc::clone(&error));

        let events = seen.lock().unwrap();
        let carried = events[0].error().unwrap();
        assert!(Arc::ptr_eq(carried, &error));
    }

    #[tokio::test]
    async fn test_subscriber_receives_events_in_order() {
        let bus = NotificationBus::new();
        let mut receiver = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);

        bus.build_started("all");
        bus.target_execution_started(Some("all"));
        bus.build_complete("all");

        let kinds = [
            receiver.recv().await.unwrap().kind(),
            receiver.recv().await.unwrap().kind(),
            receiver.recv().await.unwrap().kind(),
        ];
        assert_eq!(
            kinds,
            [
                EventKind::BuildStarted,
                EventKind::TargetExecutionStarted,
                EventKind::BuildComplete,
            ]
        );
    }

    #[tokio::test]
    async fn test_try_recv_empty() {
        let bus = NotificationBus::new();
        let mut receiver = bus.subscribe();
        assert!(receiver.try_recv().is_none());

        bus.console_output("x", None);
        assert_eq!(
            receiver.try_recv().map(|event| event.kind()),
            Some(EventKind::ConsoleOutput)
        );
    }

    #[test]
    fn test_listeners_run_on_the_emitting_thread() {
        let bus = NotificationBus::new();
        bus.add_listener(EventKind::BuildStarted, |_| {
            std::thread::sleep(std::time::Duration::from_millis(50));
        });

        let started = std::time::Instant::now();
        bus.build_started("slow");
        assert!(started.elapsed() >= std::time::Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_idle_subscriber_never_blocks_publishing() {
        let bus = NotificationBus::with_capacity(2);
        let mut receiver = bus.subscribe();
        for i in 0..5 {
            bus.console_output(&i.to_string(), None);
        }

        // Oldest events are dropped; the newest ones are still delivered.
        assert!(receiver.try_recv().is_some());
        assert!(receiver.try_recv().is_some());
        assert!(receiver.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_recv_returns_none_after_bus_dropped() {
        let bus = NotificationBus::new();
        let mut receiver = bus.subscribe();
        drop(bus);
        assert!(receiver.recv().await.is_none());
    }

    #[test]
    fn test_bus_debug() {
        let bus = NotificationBus::default();
        bus.add_listener(EventKind::BuildStarted, |_| {});
        let debug_str = format!("{bus:?}");
        assert!(debug_str.contains("NotificationBus"));
        assert!(debug_str.contains("listeners: 1"));
    }
}
