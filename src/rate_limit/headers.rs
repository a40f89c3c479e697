//! Mapping from limiter decisions to HTTP rate-limit headers.
//!
//! The limiter itself knows nothing about HTTP; this is the shape middleware
//! needs to build `X-RateLimit-*` / `Retry-After` headers and a 429 status.

use super::Decision;
use std::time::Duration;

/// HTTP status for an allowed request.
pub const STATUS_OK: u16 = 200;
/// HTTP status for a rate-limited request.
pub const STATUS_TOO_MANY_REQUESTS: u16 = 429;

/// Header values derived from a [`Decision`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitHeaders {
    /// `X-RateLimit-Limit`
    pub limit: u32,
    /// `X-RateLimit-Remaining`
    pub remaining: u32,
    /// `X-RateLimit-Reset`: whole seconds until a token is available (0 when allowed).
    pub reset_secs: u64,
    /// `Retry-After`, only set when denied.
    pub retry_after_secs: Option<u64>,
}

impl RateLimitHeaders {
    pub fn from_decision(limit: u32, decision: &Decision) -> Self {
        match decision {
            Decision::Allowed { remaining } => {
                Self { limit, remaining: *remaining, reset_secs: 0, retry_after_secs: None }
            }
            Decision::Denied { retry_after } => {
                let secs = ceil_secs(*retry_after);
                Self { limit, remaining: 0, reset_secs: secs, retry_after_secs: Some(secs) }
            }
        }
    }

    /// Response status implied by the decision.
    pub fn status(&self) -> u16 {
        if self.retry_after_secs.is_some() {
            STATUS_TOO_MANY_REQUESTS
        } else {
            STATUS_OK
        }
    }

    /// `(name, value)` pairs ready to attach to a response.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("X-RateLimit-Limit", self.limit.to_string()),
            ("X-RateLimit-Remaining", self.remaining.to_string()),
            ("X-RateLimit-Reset", self.reset_secs.to_string()),
        ];
        if let Some(secs) = self.retry_after_secs {
            pairs.push(("Retry-After", secs.to_string()));
        }
        pairs
    }
}

/// Round up so clients never retry early.
fn ceil_secs(d: Duration) -> u64 {
    let whole = d.as_secs();
    if d.subsec_nanos() > 0 {
        whole.saturating_add(1)
    } else {
        whole
    }
}
