//! Error types for rate limiting and event dispatch.
use std::time::Duration;

/// Boxed error carried by listener failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Rejected limiter configuration.
///
/// Returned at construction time; a limiter never exists with a non-positive
/// request budget or window.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    /// `max_requests` must be > 0.
    #[error("max_requests must be > 0")]
    ZeroMaxRequests,
    /// The refill window must be > 0.
    #[error("window must be > 0 (got {0:?})")]
    ZeroWindow(Duration),
    /// The idle-bucket sweep interval must be > 0.
    #[error("sweep_interval must be > 0 (got {0:?})")]
    ZeroSweepInterval(Duration),
}

/// Failure reported by a listener's `handle`.
///
/// Displays as the wrapped error and forwards its source chain.
#[derive(thiserror::Error, Debug)]
#[error(transparent)]
pub struct ListenerError(BoxError);

impl ListenerError {
    /// Wrap any error.
    pub fn new<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self(err.into())
    }

    /// Build an error from a message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self(message.into().into())
    }

    /// Borrow the wrapped error.
    pub fn inner(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        &*self.0
    }

    /// Unwrap into the boxed error.
    pub fn into_inner(self) -> BoxError {
        self.0
    }
}

/// Error returned by synchronous dispatch.
///
/// Every listener runs before this is produced; it carries the first failure
/// in registration order along with the total number of failures.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum DispatchError {
    /// One or more listeners failed.
    #[error("listener #{index} for '{event}' failed ({failures} of {invoked} failed)")]
    Listener {
        /// Name of the dispatched event.
        event: String,
        /// Registration index of the first failing listener.
        index: usize,
        /// Number of listeners that failed.
        failures: usize,
        /// Number of listeners invoked.
        invoked: usize,
        /// The first failure.
        #[source]
        source: ListenerError,
    },
}

impl DispatchError {
    /// Number of failed listeners.
    pub fn failures(&self) -> usize {
        match self {
            Self::Listener { failures, .. } => *failures,
        }
    }

    /// Registration index of the surfaced failure.
    pub fn index(&self) -> usize {
        match self {
            Self::Listener { index, .. } => *index,
        }
    }

    /// The surfaced listener error.
    pub fn listener_error(&self) -> &ListenerError {
        match self {
            Self::Listener { source, .. } => source,
        }
    }
}

/// Error returned when a bounded shutdown does not finish in time.
///
/// The dispatcher is left shutting down; outstanding work keeps running and
/// the call may be retried.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ShutdownError {
    /// Outstanding background work did not finish within the budget.
    #[error("shutdown timed out after {timeout:?} with {pending} task(s) still running")]
    Timeout {
        /// Budget given to the shutdown call.
        timeout: Duration,
        /// Tasks still in flight when the budget expired.
        pending: usize,
    },
}

impl ShutdownError {
    /// Check if this error is a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Error produced by [`RateLimitService`](crate::rate_limit::RateLimitService).
#[derive(Debug, Clone)]
pub enum RateLimitError<E> {
    /// The key exhausted its bucket.
    Limited {
        /// Time until one token is available again.
        retry_after: Duration,
    },
    /// The wrapped service failed.
    Inner(E),
}

impl<E: std::fmt::Display> std::fmt::Display for RateLimitError<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Limited { retry_after } => {
                write!(f, "rate limited; retry after {:?}", retry_after)
            }
            Self::Inner(e) => write!(f, "{}", e),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for RateLimitError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Inner(e) => Some(e),
            Self::Limited { .. } => None,
        }
    }
}

impl<E> RateLimitError<E> {
    /// Check if the request was rejected by the limiter.
    pub fn is_limited(&self) -> bool {
        matches!(self, Self::Limited { .. })
    }

    /// Retry hint when limited.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Limited { retry_after } => Some(*retry_after),
            Self::Inner(_) => None,
        }
    }

    /// Get the inner error if this is an Inner variant
    pub fn into_inner(self) -> Option<E> {
        match self {
            Self::Inner(e) => Some(e),
            Self::Limited { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;
    use std::io;

    #[test]
    fn config_error_display() {
        let err = ConfigError::ZeroWindow(Duration::ZERO);
        assert!(err.to_string().contains("window"));
        assert_eq!(ConfigError::ZeroMaxRequests.to_string(), "max_requests must be > 0");
    }

    #[test]
    fn listener_error_from_message_and_error() {
        let err = ListenerError::msg("mailer down");
        assert_eq!(err.to_string(), "mailer down");

        let err = ListenerError::new(io::Error::new(io::ErrorKind::Other, "disk"));
        assert_eq!(err.to_string(), "disk");
        assert!(err.inner().is::<io::Error>());
    }

    #[test]
    fn dispatch_error_exposes_first_failure() {
        let err = DispatchError::Listener {
            event: "ticket.reserved".into(),
            index: 1,
            failures: 2,
            invoked: 3,
            source: ListenerError::msg("boom"),
        };
        let msg = err.to_string();
        assert!(msg.contains("ticket.reserved"));
        assert!(msg.contains("#1"));
        assert!(msg.contains("2 of 3"));
        assert_eq!(err.failures(), 2);
        assert_eq!(err.index(), 1);
        assert_eq!(err.listener_error().to_string(), "boom");
        assert!(!msg.contains("boom"), "source is reported through the chain, not the message");
        assert_eq!(err.source().map(|s| s.to_string()), Some("boom".to_string()));
    }

    #[test]
    fn listener_error_forwards_inner_source_chain() {
        #[derive(Debug, thiserror::Error)]
        #[error("send failed")]
        struct SendFailed(#[source] io::Error);

        let err = ListenerError::new(SendFailed(io::Error::new(io::ErrorKind::Other, "smtp down")));
        assert_eq!(err.to_string(), "send failed");
        assert_eq!(err.source().map(|s| s.to_string()), Some("smtp down".to_string()));
    }

    #[test]
    fn shutdown_timeout_display() {
        let err = ShutdownError::Timeout { timeout: Duration::from_millis(50), pending: 3 };
        assert!(err.is_timeout());
        let msg = err.to_string();
        assert!(msg.contains("50ms"));
        assert!(msg.contains("3 task"));
    }

    #[test]
    fn rate_limit_error_accessors() {
        let limited: RateLimitError<io::Error> =
            RateLimitError::Limited { retry_after: Duration::from_secs(6) };
        assert!(limited.is_limited());
        assert_eq!(limited.retry_after(), Some(Duration::from_secs(6)));
        assert!(limited.source().is_none());

        let inner = RateLimitError::Inner(io::Error::new(io::ErrorKind::Other, "test"));
        assert!(!inner.is_limited());
        assert!(inner.source().is_some());
        assert_eq!(inner.into_inner().unwrap().to_string(), "test");
    }
}
