//! Admission control for reasoning calls
//!
//! By default a single request is in flight at a time. Callers wait in FIFO
//! order on a semaphore with `max_in_flight` permits, and the total number of
//! callers (waiting plus in flight) is bounded. Dispatches are spaced by a
//! minimum interval enforced with a `governor` rate limiter.

use crate::{LLMError, Result};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{Semaphore, SemaphorePermit};
use tracing::debug;

/// Tuning for the admission queue and rate-limit retries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Maximum callers waiting or in flight
    pub max_depth: usize,

    /// Requests dispatched concurrently
    pub max_in_flight: usize,

    /// Minimum spacing between two dispatches
    pub min_interval: Duration,

    /// Retries after a rate-limit response
    pub max_retries: u32,

    /// Base delay multiplied by the attempt number
    pub retry_base_delay: Duration,

    /// Extra wait added after any rate-limit response
    pub rate_limit_cooldown: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_depth: 8,
            max_in_flight: 1,
            min_interval: Duration::from_secs(10),
            max_retries: 2,
            retry_base_delay: Duration::from_millis(1500),
            rate_limit_cooldown: Duration::from_secs(25),
        }
    }
}

impl QueueConfig {
    /// Load overrides from `OPENROUTER_*` environment variables
    ///
    /// Unset or unparsable values keep their defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_depth: env_parse("OPENROUTER_MAX_QUEUE").unwrap_or(defaults.max_depth),
            max_in_flight: env_parse("OPENROUTER_MAX_IN_FLIGHT").unwrap_or(defaults.max_in_flight),
            min_interval: env_parse("OPENROUTER_MIN_INTERVAL_MS")
                .map_or(defaults.min_interval, Duration::from_millis),
            max_retries: env_parse("OPENROUTER_MAX_RETRIES").unwrap_or(defaults.max_retries),
            retry_base_delay: env_parse("OPENROUTER_RETRY_DELAY_MS")
                .map_or(defaults.retry_base_delay, Duration::from_millis),
            rate_limit_cooldown: env_parse("OPENROUTER_RATE_LIMIT_COOLDOWN_MS")
                .map_or(defaults.rate_limit_cooldown, Duration::from_millis),
        }
    }

    /// Configuration with no spacing or cooldown, for local providers
    ///
    /// Every admitted caller is dispatched at once.
    pub fn unthrottled() -> Self {
        let defaults = Self::default();
        Self {
            max_in_flight: defaults.max_depth,
            min_interval: Duration::ZERO,
            retry_base_delay: Duration::ZERO,
            rate_limit_cooldown: Duration::ZERO,
            ..defaults
        }
    }

    /// Wait before retry number `attempt` (1-based)
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        self.retry_base_delay * attempt + self.rate_limit_cooldown
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// FIFO admission queue with a bounded number of requests in flight
pub struct AdmissionQueue {
    max_depth: usize,
    depth: AtomicUsize,
    slot: Semaphore,
    spacing: Option<DefaultDirectRateLimiter>,
}

/// Permission to dispatch one request; released on drop
pub struct Ticket<'a> {
    _permit: SemaphorePermit<'a>,
    _depth: DepthGuard<'a>,
}

struct DepthGuard<'a>(&'a AtomicUsize);

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl AdmissionQueue {
    /// Create a queue from configuration
    pub fn new(config: &QueueConfig) -> Self {
        Self {
            max_depth: config.max_depth.max(1),
            depth: AtomicUsize::new(0),
            slot: Semaphore::new(config.max_in_flight.max(1)),
            spacing: Quota::with_period(config.min_interval).map(RateLimiter::direct),
        }
    }

    /// Wait for a dispatch slot
    ///
    /// Fails immediately with [`LLMError::QueueFull`] when the queue is at
    /// capacity; otherwise resolves once an in-flight slot is free, earlier
    /// callers first, and the minimum interval since the last dispatch has
    /// elapsed.
    pub async fn admit(&self) -> Result<Ticket<'_>> {
        let ahead = self.depth.fetch_add(1, Ordering::SeqCst);
        let depth = DepthGuard(&self.depth);
        if ahead >= self.max_depth {
            return Err(LLMError::QueueFull {
                depth: self.max_depth,
            });
        }

        debug!(ahead, "waiting for reasoning slot");
        let permit = self
            .slot
            .acquire()
            .await
            .map_err(|_| LLMError::ProviderError("admission queue closed".to_string()))?;

        if let Some(spacing) = &self.spacing {
            spacing.until_ready().await;
        }

        Ok(Ticket {
            _permit: permit,
            _depth: depth,
        })
    }

    /// Callers currently waiting or in flight
    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }
}
