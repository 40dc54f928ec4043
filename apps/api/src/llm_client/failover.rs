//! Failover Controller: retries one payload across the credential pool.
//!
//! Flow per call: Invoking(1) → {Succeeded | RotatingAndRetrying(1) →
//! Invoking(2) → …} until success or the attempt budget is spent, where the
//! last attempt's failure becomes the terminal Outcome.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::credentials::CredentialPool;
use super::engine::{invoke, Outcome};
use super::payload::RequestPayload;
use super::ModelBackend;

/// Delay inserted between a failed attempt and the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Retry on the next credential right away.
    Immediate,
    Fixed(Duration),
    /// `base * 2^(attempt-1)`, capped at `max`.
    Exponential { base: Duration, max: Duration },
}

impl Backoff {
    /// Delay after the failure of `attempt` (1-based).
    pub fn delay(&self, attempt: usize) -> Duration {
        match *self {
            Backoff::Immediate => Duration::ZERO,
            Backoff::Fixed(d) => d,
            Backoff::Exponential { base, max } => {
                let exp = attempt.saturating_sub(1).min(16) as u32;
                base.saturating_mul(1u32 << exp).min(max)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// `None` means one attempt per credential in the pool.
    pub max_attempts: Option<usize>,
    pub backoff: Backoff,
    pub rotate_on_failure: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: None,
            backoff: Backoff::Immediate,
            rotate_on_failure: true,
        }
    }
}

impl RetryPolicy {
    pub fn attempts_for(&self, pool_size: usize) -> usize {
        self.max_attempts.unwrap_or(pool_size).max(1)
    }
}

/// States of one orchestrated call. `Succeeded` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    Idle,
    Building,
    Invoking { attempt: usize },
    RotatingAndRetrying { attempt: usize },
    Succeeded,
    Failed,
}

impl CallState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, CallState::Succeeded | CallState::Failed)
    }
}

/// Result of `execute_traced`: the Outcome plus what it took to get there.
#[derive(Debug)]
pub struct Execution {
    pub outcome: Outcome,
    pub attempts: usize,
    pub trace: Vec<CallState>,
}

#[derive(Clone)]
pub struct FailoverController {
    backend: Arc<dyn ModelBackend>,
    pool: Arc<CredentialPool>,
    policy: RetryPolicy,
}

impl FailoverController {
    pub fn new(backend: Arc<dyn ModelBackend>, pool: Arc<CredentialPool>) -> Self {
        Self::with_policy(backend, pool, RetryPolicy::default())
    }

    pub fn with_policy(
        backend: Arc<dyn ModelBackend>,
        pool: Arc<CredentialPool>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            backend,
            pool,
            policy,
        }
    }

    pub async fn execute(&self, payload: &RequestPayload, timeout: Duration) -> Outcome {
        self.execute_traced(payload, timeout).await.outcome
    }

    /// Runs the attempt loop. Attempts are strictly sequential; the same
    /// `payload` is sent every time.
    pub async fn execute_traced(&self, payload: &RequestPayload, timeout: Duration) -> Execution {
        let max_attempts = self.policy.attempts_for(self.pool.len());
        let mut trace = Vec::with_capacity(max_attempts * 2 + 1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            trace.push(CallState::Invoking { attempt });
            debug!("Model call attempt {attempt}/{max_attempts}");

            match invoke(self.backend.as_ref(), &self.pool, payload, timeout).await {
                Ok(text) => {
                    trace.push(CallState::Succeeded);
                    info!("Model call succeeded on attempt {attempt}/{max_attempts}");
                    return Execution {
                        outcome: Ok(text),
                        attempts: attempt,
                        trace,
                    };
                }
                Err(failure) if attempt >= max_attempts => {
                    trace.push(CallState::Failed);
                    warn!(
                        "Model call failed after {attempt} attempt(s) (credential index {}, timeout={}): {}",
                        failure.credential_index, failure.is_timeout, failure.reason
                    );
                    return Execution {
                        outcome: Err(failure),
                        attempts: attempt,
                        trace,
                    };
                }
                Err(failure) => {
                    trace.push(CallState::RotatingAndRetrying { attempt });
                    warn!(
                        "Model call attempt {attempt}/{max_attempts} failed (timeout={}): {}",
                        failure.is_timeout, failure.reason
                    );
                    if self.policy.rotate_on_failure {
                        self.pool.rotate();
                    }
                    let delay = self.policy.backoff.delay(attempt);
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }
    }
}
