use super::event::Event;
use crate::error::ListenerError;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;

/// Something that reacts to an [`Event`].
#[async_trait]
pub trait Listener: Send + Sync {
    /// Process `event`, reporting failure as an error.
    async fn handle(&self, event: &Event) -> Result<(), ListenerError>;
}

#[async_trait]
impl<L: Listener + ?Sized> Listener for Arc<L> {
    async fn handle(&self, event: &Event) -> Result<(), ListenerError> {
        (**self).handle(event).await
    }
}

#[async_trait]
impl<L: Listener + ?Sized> Listener for Box<L> {
    async fn handle(&self, event: &Event) -> Result<(), ListenerError> {
        (**self).handle(event).await
    }
}

/// Listener backed by an async closure. Built with [`listener_fn`].
#[derive(Clone)]
pub struct FnListener<F> {
    f: F,
}

impl<F> std::fmt::Debug for FnListener<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnListener").finish_non_exhaustive()
    }
}

/// Adapt a closure returning a future into a [`Listener`].
///
/// The closure receives an owned clone of the event so the returned future
/// can be `'static`.
///
/// ```rust
/// use eventgate::events::{listener_fn, Event};
///
/// let audit = listener_fn(|event: Event| async move {
///     println!("saw {}", event.name());
///     Ok(())
/// });
/// # let _ = audit;
/// ```
pub fn listener_fn<F, Fut>(f: F) -> FnListener<F>
where
    F: Fn(Event) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), ListenerError>> + Send + 'static,
{
    FnListener { f }
}

#[async_trait]
impl<F, Fut> Listener for FnListener<F>
where
    F: Fn(Event) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), ListenerError>> + Send + 'static,
{
    async fn handle(&self, event: &Event) -> Result<(), ListenerError> {
        (self.f)(event.clone()).await
    }
}
