use crate::error::RateLimitError;
use crate::rate_limit::{Decision, RateLimiter};
use futures::future::BoxFuture;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower_layer::Layer;
use tower_service::Service;

/// A layer that enforces per-key rate limits using a [`RateLimiter`].
///
/// `key_fn` maps each request to its bucket key (client address, user id, ...).
pub struct RateLimitLayer<L, F> {
    limiter: Arc<L>,
    key_fn: Arc<F>,
}

impl<L, F> Clone for RateLimitLayer<L, F> {
    fn clone(&self) -> Self {
        Self { limiter: self.limiter.clone(), key_fn: self.key_fn.clone() }
    }
}

impl<L, F> std::fmt::Debug for RateLimitLayer<L, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimitLayer").finish_non_exhaustive()
    }
}

impl<L, F> RateLimitLayer<L, F> {
    /// Create a new rate limit layer.
    pub fn new(limiter: Arc<L>, key_fn: F) -> Self {
        Self { limiter, key_fn: Arc::new(key_fn) }
    }
}

impl<S, L, F> Layer<S> for RateLimitLayer<L, F>
where
    L: RateLimiter + 'static,
{
    type Service = RateLimitService<S, L, F>;

    fn layer(&self, service: S) -> Self::Service {
        RateLimitService {
            inner: service,
            limiter: self.limiter.clone(),
            key_fn: self.key_fn.clone(),
        }
    }
}

/// Middleware service that enforces rate limits.
pub struct RateLimitService<S, L, F> {
    inner: S,
    limiter: Arc<L>,
    key_fn: Arc<F>,
}

impl<S: Clone, L, F> Clone for RateLimitService<S, L, F> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone(), limiter: self.limiter.clone(), key_fn: self.key_fn.clone() }
    }
}

impl<S: std::fmt::Debug, L, F> std::fmt::Debug for RateLimitService<S, L, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimitService").field("inner", &self.inner).finish_non_exhaustive()
    }
}

impl<S, L, F, Req> Service<Req> for RateLimitService<S, L, F>
where
    S: Service<Req> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
    L: RateLimiter + 'static,
    F: Fn(&Req) -> String + Send + Sync + 'static,
    Req: Send + 'static,
{
    type Response = S::Response;
    type Error = RateLimitError<S::Error>;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(RateLimitError::Inner)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let key = (self.key_fn)(&req);
        let decision = self.limiter.allow(&key);

        // Take the readied service and leave a fresh clone in its place.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            match decision {
                Decision::Allowed { .. } => inner.call(req).await.map_err(RateLimitError::Inner),
                Decision::Denied { retry_after } => Err(RateLimitError::Limited { retry_after }),
            }
        })
    }
}
