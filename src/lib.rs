#![forbid(unsafe_code)]
#![deny(warnings)]
#![cfg_attr(not(test), deny(clippy::all))]

//! # eventgate
//!
//! The concurrent core of a web backend: per-key token-bucket rate limiting
//! and an event dispatcher whose background work is tracked, so both can be
//! shut down without leaking tasks or losing in-flight work.
//!
//! ## Features
//!
//! - **Token-bucket limiter** keyed by caller (IP, user id), with continuous refill
//! - **Idle sweep** that bounds limiter memory to recently active keys
//! - **Limiter registry** to stop every limiter's background task at exit
//! - **Event dispatcher** with ordered synchronous and tracked asynchronous delivery
//! - **Listener decorators** for background and conditional execution
//! - **Graceful shutdown**, optionally bounded by a timeout
//!
//! ## Quick Start
//!
//! ```rust
//! use eventgate::{EventDispatcher, LimiterRegistry, RateLimiterConfig, ShutdownCoordinator};
//! use eventgate::events::{listener_fn, Event};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let registry = LimiterRegistry::new();
//!     let limiter = registry.start_limiter(RateLimiterConfig::per_seconds(10, 60).unwrap());
//!
//!     let dispatcher = Arc::new(EventDispatcher::new());
//!     dispatcher.listen("ticket.reserved", listener_fn(|_event: Event| async { Ok(()) }));
//!
//!     if limiter.allow("203.0.113.7").is_allowed() {
//!         dispatcher.dispatch_async(Event::new("ticket.reserved", 42u64));
//!     }
//!
//!     ShutdownCoordinator::new(registry, dispatcher).shutdown().await.unwrap();
//! }
//! ```

pub mod clock;
pub mod error;
pub mod events;
pub mod logger;
pub mod prelude;
pub mod rate_limit;
pub mod shutdown;

// Re-exports
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use error::{ConfigError, DispatchError, ListenerError, RateLimitError, ShutdownError};
pub use events::{DispatcherState, Event, EventDispatcher, Listener};
pub use logger::{Logger, MemoryLogger, TracingLogger};
pub use rate_limit::{
    Decision, LimiterRegistry, RateLimiter, RateLimiterConfig, TokenBucketLimiter,
};
pub use shutdown::ShutdownCoordinator;
