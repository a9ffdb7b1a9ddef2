//! Retry logic.
//!
//! # Responsibilities
//! - Decide between a same-backend retry and a failover
//! - Carry the per-request retry and attempt counters
//! - Bound both counters so a request can never loop forever
//!
//! # Design Decisions
//! - Counters live on the request, never on a backend or the pool
//! - Fixed backoff between same-backend retries
//! - Failover budget equals the number of backends in the pool

use std::time::Duration;

use crate::config::RetryConfig;

/// Limits applied to a single logical request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries against the same backend before it is given up on.
    pub max_retries: u32,
    /// Pause between two same-backend retries.
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff: Duration) -> Self {
        Self { max_retries, backoff }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::new(config.max_retries, Duration::from_millis(config.backoff_ms))
    }
}

/// What to do after a transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextStep {
    /// Sleep for the backoff and try the same backend again.
    Retry,
    /// Give up on this backend and pick another one.
    Failover,
    /// Every backend has had its turn.
    GiveUp,
}

/// Request-scoped retry state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestAttempts {
    /// Retries spent on the current backend.
    pub retry_count: u32,
    /// Distinct backends tried so far, starting at 1.
    pub attempt_count: usize,
}

impl Default for RequestAttempts {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestAttempts {
    pub fn new() -> Self {
        Self {
            retry_count: 0,
            attempt_count: 1,
        }
    }

    /// Record a transport failure and advance the counters.
    ///
    /// `pool_size` bounds how many distinct backends may be tried.
    pub fn on_failure(&mut self, policy: &RetryPolicy, pool_size: usize) -> NextStep {
        if self.retry_count < policy.max_retries {
            self.retry_count += 1;
            return NextStep::Retry;
        }

        self.attempt_count += 1;
        if self.attempt_count > pool_size {
            NextStep::GiveUp
        } else {
            NextStep::Failover
        }
    }

    /// Start counting retries afresh against a new backend.
    pub fn switch_backend(&mut self) {
        self.retry_count = 0;
    }
}
