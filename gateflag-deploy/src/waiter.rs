//! Poll a stack until it leaves its in-progress states.
//!
//! The waiter never reports an in-progress status as settled. It stops when
//! the stack is absent, when it reaches any non-busy status, or when the
//! deadline passes; only the last of these is an error.
//!
//! A transient describe failure before the deadline is skipped and polled
//! again: the remote operation is still running and must be awaited, not
//! resubmitted.

use std::sync::Arc;
use std::time::Duration;

use gateflag_core::{classify_observed, StackName, StackState, StackStatus};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::control_plane::{observe, ControlPlane, StackDescription};
use crate::error::WaitError;

/// The mutating call whose completion is being awaited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Update,
    Delete,
}

impl Operation {
    /// The status that counts as success for this operation.
    pub fn expected_status(self) -> StackStatus {
        match self {
            Operation::Create => StackStatus::CreateComplete,
            Operation::Update => StackStatus::UpdateComplete,
            Operation::Delete => StackStatus::DeleteComplete,
        }
    }

    /// Whether `observed` (`None` = absent) satisfies this operation.
    pub fn is_satisfied_by(self, observed: Option<&StackStatus>) -> bool {
        match (self, observed) {
            (Operation::Delete, None) => true,
            (_, None) => false,
            (op, Some(status)) => *status == op.expected_status(),
        }
    }
}

/// Where a stack came to rest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settled {
    pub operation: Operation,
    /// Final observation; `None` when the stack is gone.
    pub observed: Option<StackDescription>,
}

impl Settled {
    pub fn status(&self) -> Option<&StackStatus> {
        self.observed.as_ref().map(|d| &d.status)
    }

    pub fn succeeded(&self) -> bool {
        self.operation.is_satisfied_by(self.status())
    }
}

#[derive(Clone)]
pub struct ConvergenceWaiter {
    control_plane: Arc<dyn ControlPlane>,
    poll_interval: Duration,
    max_wait: Duration,
}

impl ConvergenceWaiter {
    pub fn new(control_plane: Arc<dyn ControlPlane>, poll_interval: Duration, max_wait: Duration) -> Self {
        Self { control_plane, poll_interval, max_wait }
    }

    pub fn max_wait(&self) -> Duration {
        self.max_wait
    }

    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    /// Wait up to the configured maximum.
    pub async fn wait(&self, stack: &StackName, operation: Operation) -> Result<Settled, WaitError> {
        self.wait_until(stack, operation, Instant::now() + self.max_wait).await
    }

    pub async fn wait_until(
        &self,
        stack: &StackName,
        operation: Operation,
        deadline: Instant,
    ) -> Result<Settled, WaitError> {
        let started = Instant::now();
        let mut last_status: Option<StackStatus> = None;
        let mut first = true;

        loop {
            let observed = match observe(self.control_plane.as_ref(), stack).await {
                Ok(observed) => observed,
                Err(source) if source.is_transient() && Instant::now() < deadline => {
                    warn!(stack = %stack, error = %source, "describe failed while waiting, polling again");
                    tokio::time::sleep_until((Instant::now() + self.poll_interval).min(deadline)).await;
                    continue;
                }
                Err(source) => return Err(WaitError::Transport { stack: stack.clone(), source }),
            };
            let status = observed.as_ref().map(|d| d.status.clone());

            if first || status != last_status {
                info!(
                    stack = %stack,
                    status = status.as_ref().map_or("absent", StackStatus::as_str),
                    "stack status"
                );
                first = false;
                last_status = status.clone();
            }

            if classify_observed(status.as_ref()) != StackState::Busy {
                return Ok(Settled { operation, observed });
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(WaitError::Timeout {
                    stack: stack.clone(),
                    waited_secs: now.duration_since(started).as_secs(),
                    last_status,
                });
            }
            debug!(stack = %stack, "still in progress, polling again");
            tokio::time::sleep_until((now + self.poll_interval).min(deadline)).await;
        }
    }
}
