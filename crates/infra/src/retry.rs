//! Optimistic-retry coordination.
//!
//! Every mutating flow in this crate is a check-then-act sequence over
//! versioned documents: read current state, compute the intended write,
//! attempt a conditioned write. When the conditioned write loses to a
//! concurrent commit, the coordinator re-runs the whole unit of work with
//! jittered backoff, up to a bounded attempt budget. Domain-validation
//! failures are terminal and never re-run: re-checking stock cannot help a
//! quantity that was over the limit independent of any race.

use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use tradepost_core::{DomainError, DomainResult};

use crate::store::StoreError;

/// Backoff strategy for retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// Fixed delay between retries
    Fixed,
    /// Exponential backoff: base * 2^attempt
    Exponential,
    /// Linear backoff: base * attempt
    Linear,
}

impl Default for BackoffStrategy {
    fn default() -> Self {
        Self::Exponential
    }
}

/// Retry policy configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of attempts on conflict (0 = give up immediately)
    pub max_attempts: u32,
    /// Base delay between retries
    pub base_delay: Duration,
    /// Maximum delay cap
    pub max_delay: Duration,
    /// Backoff strategy
    pub strategy: BackoffStrategy,
    /// Jitter factor (0.0-1.0) to add randomness
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_millis(25),
            max_delay: Duration::from_secs(1),
            strategy: BackoffStrategy::Exponential,
            jitter: 0.1,
        }
    }
}

impl RetryPolicy {
    /// Create a policy that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 0,
            ..Default::default()
        }
    }

    /// Create a policy with fixed delays.
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay: delay,
            max_delay: delay,
            strategy: BackoffStrategy::Fixed,
            jitter: 0.0,
        }
    }

    /// Create a policy with exponential backoff.
    pub fn exponential(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            max_delay,
            strategy: BackoffStrategy::Exponential,
            jitter: 0.1,
        }
    }

    /// Calculate delay for a given attempt number (1-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let base_ms = self.base_delay.as_millis() as f64;
        let max_ms = self.max_delay.as_millis() as f64;

        let delay_ms = match self.strategy {
            BackoffStrategy::Fixed => base_ms,
            BackoffStrategy::Exponential => {
                let exp = 2_f64.powi((attempt - 1) as i32);
                (base_ms * exp).min(max_ms)
            }
            BackoffStrategy::Linear => {
                let linear = base_ms * (attempt as f64);
                linear.min(max_ms)
            }
        };

        // Apply jitter
        let jitter_range = delay_ms * self.jitter;
        let jitter = if jitter_range > 0.0 {
            // Simple deterministic "jitter" based on attempt
            let pseudo_random = ((attempt as f64 * 17.0) % 100.0) / 100.0;
            jitter_range * (pseudo_random - 0.5) * 2.0
        } else {
            0.0
        };

        Duration::from_millis((delay_ms + jitter).max(0.0) as u64)
    }

    /// Check if more attempts are allowed after `conflicts` observed conflicts.
    pub fn should_retry(&self, conflicts: u32) -> bool {
        conflicts < self.max_attempts
    }
}

/// Outcome of one attempt of a retryable unit of work.
///
/// Separates "a concurrent commit invalidated our read, try again" from
/// "a domain rule fired, surface it verbatim".
#[derive(Debug)]
pub enum TxError {
    /// Concurrent-modification conflict; the unit of work may be re-run.
    Conflict(String),
    /// Terminal domain outcome; never retried.
    Domain(DomainError),
}

impl From<TxError> for DomainError {
    fn from(err: TxError) -> Self {
        match err {
            TxError::Domain(err) => err,
            TxError::Conflict(msg) => DomainError::storage(msg),
        }
    }
}

impl From<DomainError> for TxError {
    fn from(err: DomainError) -> Self {
        TxError::Domain(err)
    }
}

impl From<StoreError> for TxError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(msg) => TxError::Conflict(msg),
            other => TxError::Domain(other.into_domain()),
        }
    }
}

/// Bounded optimistic-retry loop shared by the cart manager and the
/// registrar.
///
/// `run` re-invokes the unit of work on conflict with backoff, passes domain
/// errors through untouched, and converts an exhausted budget into
/// [`DomainError::Contention`] so callers can tell "business rule violated"
/// apart from "too much concurrent contention, try again".
#[derive(Debug, Clone, Default)]
pub struct RetryCoordinator {
    policy: RetryPolicy,
}

impl RetryCoordinator {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn run<T>(&self, mut op: impl FnMut() -> Result<T, TxError>) -> DomainResult<T> {
        let mut conflicts = 0u32;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(TxError::Domain(err)) => return Err(err),
                Err(TxError::Conflict(reason)) => {
                    conflicts += 1;
                    if !self.policy.should_retry(conflicts) {
                        warn!(attempts = conflicts, %reason, "retry budget exhausted");
                        return Err(DomainError::Contention {
                            attempts: conflicts,
                        });
                    }
                    let delay = self.policy.delay_for_attempt(conflicts);
                    debug!(
                        attempt = conflicts,
                        delay_ms = delay.as_millis() as u64,
                        %reason,
                        "optimistic conflict, backing off"
                    );
                    thread::sleep(delay);
                }
            }
        }
    }
}
