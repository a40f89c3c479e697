//! Convenient re-exports for common eventgate types.
pub use crate::{
    error::{ConfigError, DispatchError, ListenerError, RateLimitError, ShutdownError},
    events::{
        listener_fn, Background, Conditional, DispatcherState, Event, EventDispatcher, Listener,
        ListenerExt,
    },
    logger::{Logger, TracingLogger},
    rate_limit::{
        Decision, LimiterRegistry, RateLimitHeaders, RateLimitLayer, RateLimiter,
        RateLimiterConfig, TokenBucketLimiter,
    },
    shutdown::ShutdownCoordinator,
};
