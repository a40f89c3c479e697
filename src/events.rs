//! Event dispatch.
//!
//! Application code registers [`Listener`]s by event name on an
//! [`EventDispatcher`], then notifies them of domain occurrences ("ticket
//! reserved", "user registered") with [`Event`] values.
//!
//! # Delivery modes
//!
//! - **Synchronous** (`dispatch`): listeners run in registration order on the
//!   caller's task; every listener runs even if an earlier one fails.
//! - **Asynchronous** (`dispatch_async`): one tracked background task per
//!   listener; failures are logged. `shutdown` waits for all of them.
//!
//! # Decorators
//!
//! - [`Background`]: always run a listener on an untracked task.
//! - [`Conditional`]: run a listener only when a predicate accepts the event.
//!
//! ```rust
//! use eventgate::events::{listener_fn, Event, EventDispatcher};
//!
//! #[tokio::main]
//! async fn main() {
//!     let dispatcher = EventDispatcher::new();
//!     dispatcher.listen("ticket.reserved", listener_fn(|event: Event| async move {
//!         let seats = event.payload::<u32>().copied().unwrap_or_default();
//!         println!("reserved {seats} seat(s)");
//!         Ok(())
//!     }));
//!
//!     dispatcher.dispatch(&Event::new("ticket.reserved", 2u32)).await.unwrap();
//!     dispatcher.dispatch_async(Event::new("ticket.reserved", 4u32));
//!     dispatcher.shutdown().await;
//! }
//! ```

pub mod decorators;
pub mod dispatcher;
pub mod event;
pub mod listener;

pub use decorators::{Background, Conditional, ListenerExt};
pub use dispatcher::{DispatcherState, EventDispatcher};
pub use event::Event;
pub use listener::{listener_fn, FnListener, Listener};
