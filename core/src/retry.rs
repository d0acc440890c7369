//! Retry policy for upstream calls, kept apart from the network code.
//!
//! [`RetryPolicy::action_for`] is the policy table: it maps one failed
//! attempt to either a retry after a delay or an abort. [`execute`] is the
//! bounded executor that consumes it. Attempts are strictly sequential.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use tracing::warn;

/// Why a single attempt failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// Non-success HTTP status from the provider.
    Status(u16),
    /// Connection error, timeout, unreadable body.
    Transport(String),
    /// Status 200 but no usable text in the body.
    Malformed,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Failure::Status(code) => write!(f, "HTTP {code}"),
            Failure::Transport(msg) => write!(f, "transport error: {msg}"),
            Failure::Malformed => f.write_str("malformed or empty reply"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Retry(Duration),
    Abort,
}

/// Backoff delays per failure class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// 503: the provider is still loading the model.
    pub model_loading: Duration,
    /// 429
    pub rate_limited: Duration,
    /// Any other status, network errors and timeouts.
    pub transient: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            model_loading: Duration::from_secs(3),
            rate_limited: Duration::from_secs(10),
            transient: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Same table, no waiting.
    pub fn immediate() -> Self {
        Self {
            model_loading: Duration::ZERO,
            rate_limited: Duration::ZERO,
            transient: Duration::ZERO,
        }
    }

    pub fn action_for(&self, failure: &Failure) -> Action {
        match failure {
            Failure::Status(401) | Failure::Malformed => Action::Abort,
            Failure::Status(503) => Action::Retry(self.model_loading),
            Failure::Status(429) => Action::Retry(self.rate_limited),
            Failure::Status(_) | Failure::Transport(_) => Action::Retry(self.transient),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryError {
    /// The policy said stop.
    Aborted { attempt: u32, failure: Failure },
    /// Every allowed attempt failed with a retryable failure.
    Exhausted { attempts: u32, last: Failure },
}

/// Runs `attempt` until it succeeds, the policy aborts, or `max_attempts`
/// attempts have been made. The closure receives the 1-based attempt number.
/// No delay is slept after the final attempt.
pub async fn execute<T, F, Fut>(
    policy: &RetryPolicy,
    max_attempts: u32,
    mut attempt: F,
) -> Result<T, RetryError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, Failure>>,
{
    let max_attempts = max_attempts.max(1);
    let mut n = 1;
    loop {
        let failure = match attempt(n).await {
            Ok(value) => return Ok(value),
            Err(failure) => failure,
        };

        match policy.action_for(&failure) {
            Action::Abort => return Err(RetryError::Aborted { attempt: n, failure }),
            Action::Retry(_) if n >= max_attempts => {
                return Err(RetryError::Exhausted {
                    attempts: n,
                    last: failure,
                })
            }
            Action::Retry(delay) => {
                warn!(
                    attempt = n,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    "upstream attempt failed ({failure}), retrying"
                );
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                n += 1;
            }
        }
    }
}
