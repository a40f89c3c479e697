//! Ordered process shutdown for limiters and the dispatcher.

use crate::error::ShutdownError;
use crate::events::EventDispatcher;
use crate::rate_limit::LimiterRegistry;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Default time allowed for outstanding listener work during shutdown.
pub const DEFAULT_DISPATCH_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Owns the shutdown sequence for the long-lived core components.
///
/// Built once at startup from the same registry and dispatcher the rest of the
/// application uses; [`shutdown`](Self::shutdown) is called once at exit.
#[derive(Debug, Clone)]
pub struct ShutdownCoordinator {
    limiters: LimiterRegistry,
    dispatcher: Arc<EventDispatcher>,
    drain_timeout: Option<Duration>,
}

impl ShutdownCoordinator {
    pub fn new(limiters: LimiterRegistry, dispatcher: Arc<EventDispatcher>) -> Self {
        Self { limiters, dispatcher, drain_timeout: Some(DEFAULT_DISPATCH_DRAIN_TIMEOUT) }
    }

    /// Bound the dispatcher drain; `None` waits indefinitely.
    pub fn with_drain_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.drain_timeout = timeout;
        self
    }

    pub fn limiters(&self) -> &LimiterRegistry {
        &self.limiters
    }

    pub fn dispatcher(&self) -> &Arc<EventDispatcher> {
        &self.dispatcher
    }

    /// Drain the dispatcher, then stop every limiter.
    ///
    /// Limiters are stopped even when the drain times out; the timeout is
    /// returned afterwards.
    pub async fn shutdown(&self) -> Result<(), ShutdownError> {
        let drained = match self.drain_timeout {
            Some(timeout) => self.dispatcher.shutdown_with_timeout(timeout).await,
            None => {
                self.dispatcher.shutdown().await;
                Ok(())
            }
        };
        self.limiters.stop_all().await;
        info!(target: "eventgate::shutdown", drained = drained.is_ok(), "core shutdown complete");
        drained
    }
}
