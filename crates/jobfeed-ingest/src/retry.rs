//! Bounded retry with linear backoff
//!
//! A source attempt is retried up to `max_attempts` times, waiting
//! `base_delay × attempt` between attempts. The wait can be interrupted by a
//! [`CancellationToken`]; exhaustion and cancellation are reported as
//! outcomes, never as errors, so one failing source cannot stop a run.
//!
//! A cancellation is consumed by the retry loop it interrupts. The executor
//! then arms a fresh token, so later sources keep their full retry budget.

use std::fmt::Display;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Default number of attempts per source
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default backoff base in milliseconds
pub const DEFAULT_BASE_DELAY_MS: u64 = 2000;

/// How many times to try and how long to wait in between
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: Duration::from_millis(DEFAULT_BASE_DELAY_MS),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// Wait after the given failed attempt (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }
}

/// Result of running an operation under a [`RetryPolicy`]
#[derive(Debug)]
pub enum RetryOutcome<T> {
    Succeeded { value: T, attempts: u32 },
    Exhausted { attempts: u32, last_error: String },
    Cancelled { attempts: u32 },
}

impl<T> RetryOutcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, RetryOutcome::Succeeded { .. })
    }

    /// Attempts actually made
    pub fn attempts(&self) -> u32 {
        match self {
            RetryOutcome::Succeeded { attempts, .. }
            | RetryOutcome::Exhausted { attempts, .. }
            | RetryOutcome::Cancelled { attempts } => *attempts,
        }
    }
}

/// Runs source operations under a retry policy
///
/// Clones share the current cancellation token.
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    policy: RetryPolicy,
    cancel: Arc<Mutex<CancellationToken>>,
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy, cancel: CancellationToken) -> Self {
        Self {
            policy,
            cancel: Arc::new(Mutex::new(cancel)),
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Token that interrupts the backoff wait in progress
    ///
    /// Cancelling it stops the retry loop currently waiting (or the next one
    /// to wait); after that the executor arms a new token.
    pub fn cancellation(&self) -> CancellationToken {
        self.token().clone()
    }

    fn token(&self) -> MutexGuard<'_, CancellationToken> {
        self.cancel.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Replace `consumed` with a fresh token unless it was already replaced
    fn rearm(&self, consumed: &CancellationToken) {
        let mut current = self.token();
        if current.is_cancelled() && consumed.is_cancelled() {
            *current = CancellationToken::new();
        }
    }

    /// Run `operation` until it succeeds, attempts run out, or a backoff
    /// wait is cancelled
    ///
    /// The operation receives the 1-based attempt number.
    pub async fn execute<T, E, F, Fut>(&self, source: &str, mut operation: F) -> RetryOutcome<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let cancel = self.cancellation();
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            info!(source, attempt, max_attempts, "Attempting source");

            match operation(attempt).await {
                Ok(value) => {
                    info!(source, attempt, "Source succeeded");
                    return RetryOutcome::Succeeded {
                        value,
                        attempts: attempt,
                    };
                },
                Err(e) => {
                    warn!(source, attempt, max_attempts, error = %e, "Attempt failed");
                    last_error = e.to_string();
                },
            }

            if attempt < max_attempts {
                let delay = self.policy.delay_for(attempt);
                info!(source, delay_ms = delay.as_millis() as u64, "Waiting before retry");

                tokio::select! {
                    _ = cancel.cancelled() => {
                        self.rearm(&cancel);
                        error!(source, attempt, "Interrupted while waiting for retry");
                        return RetryOutcome::Cancelled { attempts: attempt };
                    }
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }

        error!(source, attempts = max_attempts, error = %last_error, "All attempts failed");
        RetryOutcome::Exhausted {
            attempts: max_attempts,
            last_error,
        }
    }
}
