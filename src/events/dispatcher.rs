//! Event dispatcher with synchronous and tracked asynchronous delivery.

use super::event::Event;
use super::listener::Listener;
use crate::error::{DispatchError, ShutdownError};
use crate::logger::{Logger, TracingLogger};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{debug, warn};

type ListenerList = Vec<Arc<dyn Listener>>;

/// Lifecycle of an [`EventDispatcher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatcherState {
    /// Accepting asynchronous work.
    Running,
    /// Shutdown requested; waiting for in-flight work.
    ShuttingDown,
    /// All tracked work has completed.
    Stopped,
}

/// Counts in-flight background tasks and wakes waiters when it hits zero.
#[derive(Debug)]
struct InFlight {
    count: watch::Sender<usize>,
}

impl InFlight {
    fn new() -> Self {
        let (count, _) = watch::channel(0);
        Self { count }
    }

    fn enter(self: &Arc<Self>) -> InFlightGuard {
        self.count.send_modify(|n| *n += 1);
        InFlightGuard { tracker: self.clone() }
    }

    fn current(&self) -> usize {
        *self.count.borrow()
    }

    async fn wait_idle(&self) {
        let mut rx = self.count.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = rx.wait_for(|n| *n == 0).await;
    }
}

/// Decrements the in-flight count on drop, including when the task panics.
struct InFlightGuard {
    tracker: Arc<InFlight>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.tracker.count.send_modify(|n| *n = n.saturating_sub(1));
    }
}

/// Routes events to listeners registered by name.
///
/// - [`dispatch`](Self::dispatch) runs listeners in registration order on
///   the caller's task, continuing past failures and returning the first one.
/// - [`dispatch_async`](Self::dispatch_async) spawns one tracked task per
///   listener and returns immediately; failures are logged.
/// - [`shutdown`](Self::shutdown) stops accepting asynchronous work and
///   waits for everything already scheduled.
pub struct EventDispatcher {
    listeners: RwLock<HashMap<String, ListenerList>>,
    state: Mutex<DispatcherState>,
    in_flight: Arc<InFlight>,
    logger: Arc<dyn Logger>,
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("state", &self.state())
            .field("in_flight", &self.in_flight.current())
            .finish_non_exhaustive()
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl EventDispatcher {
    /// Dispatcher that reports async listener failures through `tracing`.
    pub fn new() -> Self {
        Self::with_logger(Arc::new(TracingLogger::new("eventgate::events")))
    }

    /// Dispatcher that reports async listener failures to `logger`.
    pub fn with_logger(logger: Arc<dyn Logger>) -> Self {
        Self {
            listeners: RwLock::new(HashMap::new()),
            state: Mutex::new(DispatcherState::Running),
            in_flight: Arc::new(InFlight::new()),
            logger,
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, DispatcherState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn snapshot(&self, name: &str) -> ListenerList {
        let map = self.listeners.read().unwrap_or_else(PoisonError::into_inner);
        map.get(name).cloned().unwrap_or_default()
    }

    /// Append `listener` to `event_name`'s list.
    ///
    /// Registering the same listener twice makes it run twice per dispatch.
    pub fn listen<L>(&self, event_name: impl Into<String>, listener: L)
    where
        L: Listener + 'static,
    {
        self.listen_shared(event_name, Arc::new(listener));
    }

    /// Like [`listen`](Self::listen) for an already shared listener.
    pub fn listen_shared(&self, event_name: impl Into<String>, listener: Arc<dyn Listener>) {
        let mut map = self.listeners.write().unwrap_or_else(PoisonError::into_inner);
        map.entry(event_name.into()).or_default().push(listener);
    }

    /// Run every listener for `event` in order on the current task.
    ///
    /// All listeners run even when some fail. Returns the first failure, in
    /// registration order, with the total failure count. Still usable after
    /// shutdown.
    pub async fn dispatch(&self, event: &Event) -> Result<(), DispatchError> {
        let listeners = self.snapshot(event.name());
        let invoked = listeners.len();
        let mut first = None;
        let mut failures = 0;

        for (index, listener) in listeners.iter().enumerate() {
            if let Err(err) = listener.handle(event).await {
                failures += 1;
                debug!(target: "eventgate::events::dispatcher", event = event.name(), index, error = %err, "listener failed");
                if first.is_none() {
                    first = Some((index, err));
                }
            }
        }

        match first {
            None => Ok(()),
            Some((index, source)) => Err(DispatchError::Listener {
                event: event.name().to_string(),
                index,
                failures,
                invoked,
                source,
            }),
        }
    }

    /// Schedule every listener for `event` as tracked background work.
    ///
    /// Returns without waiting. Does nothing once shutdown has begun. Outside
    /// a tokio runtime the event is dropped and the drop is logged.
    pub fn dispatch_async(&self, event: Event) {
        let listeners = self.snapshot(event.name());
        if listeners.is_empty() {
            return;
        }
        let Ok(runtime) = Handle::try_current() else {
            self.logger.error(&format!("no tokio runtime to run async listeners for '{}'; event dropped", event.name()));
            return;
        };

        // Tasks are counted while holding the state lock so that shutdown
        // either sees them in the count or they are never scheduled.
        let guards: Vec<InFlightGuard> = {
            let state = self.lock_state();
            if *state != DispatcherState::Running {
                debug!(target: "eventgate::events::dispatcher", event = event.name(), "dropping event scheduled after shutdown");
                return;
            }
            listeners.iter().map(|_| self.in_flight.enter()).collect()
        };

        for (listener, guard) in listeners.into_iter().zip(guards) {
            let event = event.clone();
            let logger = self.logger.clone();
            runtime.spawn(async move {
                let _guard = guard;
                if let Err(err) = listener.handle(&event).await {
                    logger.warn(&format!("async listener for '{}' failed: {}", event.name(), err));
                }
            });
        }
    }

    /// Stop accepting async work and wait for all of it to finish.
    ///
    /// Idempotent; concurrent callers all wait for the same work.
    pub async fn shutdown(&self) {
        self.begin_shutdown();
        self.in_flight.wait_idle().await;
        self.finish_shutdown();
    }

    /// [`shutdown`](Self::shutdown) bounded by `timeout`.
    ///
    /// On timeout the dispatcher stays [`ShuttingDown`](DispatcherState::ShuttingDown)
    /// and in-flight work keeps running; calling again resumes the wait.
    pub async fn shutdown_with_timeout(&self, timeout: Duration) -> Result<(), ShutdownError> {
        self.begin_shutdown();
        match tokio::time::timeout(timeout, self.in_flight.wait_idle()).await {
            Ok(()) => {
                self.finish_shutdown();
                Ok(())
            }
            Err(_) => {
                let pending = self.in_flight.current();
                warn!(target: "eventgate::events::dispatcher", ?timeout, pending, "dispatcher shutdown timed out");
                Err(ShutdownError::Timeout { timeout, pending })
            }
        }
    }

    fn begin_shutdown(&self) {
        let mut state = self.lock_state();
        if *state == DispatcherState::Running {
            *state = DispatcherState::ShuttingDown;
            debug!(target: "eventgate::events::dispatcher", in_flight = self.in_flight.current(), "dispatcher shutting down");
        }
    }

    fn finish_shutdown(&self) {
        let mut state = self.lock_state();
        if *state == DispatcherState::ShuttingDown {
            *state = DispatcherState::Stopped;
            debug!(target: "eventgate::events::dispatcher", "dispatcher stopped");
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> DispatcherState {
        *self.lock_state()
    }

    /// Background tasks scheduled but not yet finished.
    pub fn in_flight(&self) -> usize {
        self.in_flight.current()
    }

    pub fn listener_count(&self, event_name: &str) -> usize {
        let map = self.listeners.read().unwrap_or_else(PoisonError::into_inner);
        map.get(event_name).map_or(0, Vec::len)
    }

    pub fn has_listeners(&self, event_name: &str) -> bool {
        self.listener_count(event_name) > 0
    }

    /// Names with at least one listener, sorted.
    pub fn event_names(&self) -> Vec<String> {
        let map = self.listeners.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> =
            map.iter().filter(|(_, l)| !l.is_empty()).map(|(k, _)| k.clone()).collect();
        names.sort();
        names
    }
}
