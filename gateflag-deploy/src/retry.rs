//! Caller-level retries with exponential backoff.
//!
//! Only failures that report themselves transient are repeated; a stack that
//! settled in the wrong status is returned on the first attempt.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use gateflag_core::RetrySettings;
use tracing::warn;

use crate::error::{DeleteFailure, DeployFailure};

/// Failures that can tell whether a repeat might succeed.
pub trait Transient {
    fn is_transient(&self) -> bool;
}

impl Transient for DeployFailure {
    fn is_transient(&self) -> bool {
        DeployFailure::is_transient(self)
    }
}

impl Transient for DeleteFailure {
    fn is_transient(&self) -> bool {
        DeleteFailure::is_transient(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts including the first; never below one.
    pub max_attempts: usize,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// A policy that tries exactly once.
    pub fn none() -> Self {
        Self { max_attempts: 1, base_delay: Duration::ZERO, max_delay: Duration::ZERO }
    }

    /// Delay before attempt `attempt + 1`, where `attempt` starts at 1.
    ///
    /// delay = base * 2^(attempt - 1), capped at `max_delay`.
    pub fn delay_for(&self, attempt: usize) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31) as u32;
        let base = self.base_delay.as_millis() as u64;
        let delay = base.saturating_mul(2u64.saturating_pow(exponent));
        Duration::from_millis(delay).min(self.max_delay)
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out.
    pub async fn run<T, E, F, Fut>(&self, label: &str, mut op: F) -> Result<T, E>
    where
        E: Transient + Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op().await {
                Err(err) if err.is_transient() && attempt < max_attempts => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        op = label,
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                outcome => return outcome,
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetrySettings::default())
    }
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        Self {
            max_attempts: settings.max_attempts.max(1),
            base_delay: Duration::from_millis(settings.base_delay_ms),
            max_delay: Duration::from_millis(settings.max_delay_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use gateflag_core::{StackName, StackStatus};

    use super::*;
    use crate::error::ControlPlaneError;

    fn transport() -> DeployFailure {
        DeployFailure::ControlPlane(ControlPlaneError::Transport {
            operation: "CreateStack",
            stack: StackName::from("Gateflag-team-Team01"),
            message: "Rate exceeded".into(),
        })
    }

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(250),
        }
    }

    #[test]
    fn delays_double_and_cap() {
        let p = policy();
        assert_eq!(p.delay_for(1), Duration::from_millis(100));
        assert_eq!(p.delay_for(2), Duration::from_millis(200));
        assert_eq!(p.delay_for(3), Duration::from_millis(250));
        assert_eq!(p.delay_for(64), Duration::from_millis(250));
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_are_retried_until_success() {
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let result: Result<u32, DeployFailure> = policy()
            .run("team Team01", move || async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(transport())
                } else {
                    Ok(7)
                }
            })
            .await;
        assert_eq!(result, Ok(7));
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn attempts_are_bounded() {
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let result: Result<(), DeployFailure> = policy()
            .run("team Team01", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(transport())
            })
            .await;
        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn settled_failures_are_not_retried() {
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let result: Result<(), DeployFailure> = policy()
            .run("team Team01", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(DeployFailure::Terminal {
                    stack: StackName::from("Gateflag-team-Team01"),
                    status: StackStatus::RollbackComplete,
                    reason: None,
                })
            })
            .await;
        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
