//! Validated rate limiter configuration.

use crate::error::ConfigError;
use std::time::Duration;

/// Default interval between idle-bucket sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Validated configuration for a [`TokenBucketLimiter`](super::TokenBucketLimiter).
///
/// A bucket holds up to `max_requests` tokens and regains them at
/// `max_requests / window` tokens per second.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RawRateLimiterConfig"))]
pub struct RateLimiterConfig {
    max_requests: u32,
    window: Duration,
    sweep_interval: Duration,
}

impl RateLimiterConfig {
    /// Create a config with validation and the default sweep interval.
    pub fn new(max_requests: u32, window: Duration) -> Result<Self, ConfigError> {
        Self::builder().max_requests(max_requests).window(window).build()
    }

    /// `max_requests` per `window_secs` seconds.
    pub fn per_seconds(max_requests: u32, window_secs: u64) -> Result<Self, ConfigError> {
        Self::new(max_requests, Duration::from_secs(window_secs))
    }

    pub fn builder() -> RateLimiterConfigBuilder {
        RateLimiterConfigBuilder::default()
    }

    /// Bucket capacity and permits per window.
    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    /// Time for an empty bucket to refill completely.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// How often idle buckets are swept.
    pub fn sweep_interval(&self) -> Duration {
        self.sweep_interval
    }

    /// Tokens regained per second.
    pub fn refill_rate(&self) -> f64 {
        f64::from(self.max_requests) / self.window.as_secs_f64()
    }

    /// Idle age after which a bucket is evicted (two windows).
    pub fn idle_ttl(&self) -> Duration {
        self.window.saturating_mul(2)
    }

    /// Time for one token to accrue.
    pub fn token_interval(&self) -> Duration {
        self.window / self.max_requests
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_requests == 0 {
            return Err(ConfigError::ZeroMaxRequests);
        }
        if self.window.is_zero() {
            return Err(ConfigError::ZeroWindow(self.window));
        }
        if self.sweep_interval.is_zero() {
            return Err(ConfigError::ZeroSweepInterval(self.sweep_interval));
        }
        Ok(())
    }
}

/// Builder for [`RateLimiterConfig`].
#[derive(Debug, Clone)]
pub struct RateLimiterConfigBuilder {
    max_requests: u32,
    window: Duration,
    sweep_interval: Duration,
}

impl Default for RateLimiterConfigBuilder {
    fn default() -> Self {
        Self { max_requests: 0, window: Duration::ZERO, sweep_interval: DEFAULT_SWEEP_INTERVAL }
    }
}

impl RateLimiterConfigBuilder {
    pub fn max_requests(mut self, max_requests: u32) -> Self {
        self.max_requests = max_requests;
        self
    }

    pub fn window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    pub fn build(self) -> Result<RateLimiterConfig, ConfigError> {
        let cfg = RateLimiterConfig {
            max_requests: self.max_requests,
            window: self.window,
            sweep_interval: self.sweep_interval,
        };
        cfg.validate()?;
        Ok(cfg)
    }
}

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct RawRateLimiterConfig {
    max_requests: u32,
    window_secs: u64,
    #[serde(default)]
    sweep_interval_secs: Option<u64>,
}

#[cfg(feature = "serde")]
impl TryFrom<RawRateLimiterConfig> for RateLimiterConfig {
    type Error = ConfigError;

    fn try_from(raw: RawRateLimiterConfig) -> Result<Self, Self::Error> {
        let mut builder = RateLimiterConfig::builder()
            .max_requests(raw.max_requests)
            .window(Duration::from_secs(raw.window_secs));
        if let Some(secs) = raw.sweep_interval_secs {
            builder = builder.sweep_interval(Duration::from_secs(secs));
        }
        builder.build()
    }
}
