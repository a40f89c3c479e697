//! Listener wrappers: run in the background, or only when a predicate holds.

use super::event::Event;
use super::listener::Listener;
use crate::error::ListenerError;
use crate::logger::Logger;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::runtime::Handle;

/// Runs the wrapped listener on its own task and reports success at once.
///
/// The spawned task is not tracked by any dispatcher; failures reach only
/// the logger. Use it to keep a slow listener off the caller's path even
/// under synchronous dispatch. Without a tokio runtime the listener is
/// skipped and the skip is logged.
pub struct Background<L> {
    inner: Arc<L>,
    logger: Arc<dyn Logger>,
}

impl<L> Background<L> {
    pub fn new(listener: L, logger: Arc<dyn Logger>) -> Self {
        Self { inner: Arc::new(listener), logger }
    }
}

impl<L> std::fmt::Debug for Background<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Background").field("logger", &self.logger).finish_non_exhaustive()
    }
}

#[async_trait]
impl<L> Listener for Background<L>
where
    L: Listener + 'static,
{
    async fn handle(&self, event: &Event) -> Result<(), ListenerError> {
        let Ok(runtime) = Handle::try_current() else {
            self.logger
                .error(&format!("no tokio runtime for background listener on '{}'; skipped", event.name()));
            return Ok(());
        };
        let inner = self.inner.clone();
        let logger = self.logger.clone();
        let event = event.clone();
        runtime.spawn(async move {
            if let Err(err) = inner.handle(&event).await {
                logger.error(&format!("background listener for '{}' failed: {}", event.name(), err));
            }
        });
        Ok(())
    }
}

/// Invokes the wrapped listener only when `predicate` accepts the event.
pub struct Conditional<L, P> {
    inner: L,
    predicate: P,
}

impl<L, P> Conditional<L, P> {
    pub fn new(listener: L, predicate: P) -> Self {
        Self { inner: listener, predicate }
    }
}

impl<L, P> std::fmt::Debug for Conditional<L, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Conditional").finish_non_exhaustive()
    }
}

#[async_trait]
impl<L, P> Listener for Conditional<L, P>
where
    L: Listener,
    P: Fn(&Event) -> bool + Send + Sync,
{
    async fn handle(&self, event: &Event) -> Result<(), ListenerError> {
        if (self.predicate)(event) {
            self.inner.handle(event).await
        } else {
            Ok(())
        }
    }
}

/// Combinators for wrapping listeners.
pub trait ListenerExt: Listener + Sized {
    /// Run this listener in the background, logging failures to `logger`.
    fn in_background(self, logger: Arc<dyn Logger>) -> Background<Self> {
        Background::new(self, logger)
    }

    /// Run this listener only for events accepted by `predicate`.
    fn when<P>(self, predicate: P) -> Conditional<Self, P>
    where
        P: Fn(&Event) -> bool + Send + Sync,
    {
        Conditional::new(self, predicate)
    }
}

impl<L: Listener> ListenerExt for L {}
