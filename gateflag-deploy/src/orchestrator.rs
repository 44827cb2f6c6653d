//! Converge one stack to a requested template and parameter set.
//!
//! Observed state decides the action:
//!
//! | state   | action                                   |
//! |---------|------------------------------------------|
//! | Absent  | create                                   |
//! | Healthy | update (nothing-to-change is success)    |
//! | Busy    | fail without submitting anything         |
//! | Failed  | delete, wait until absent, then create   |
//!
//! A wait that runs out of time is followed by exactly one fresh describe; if
//! that observation shows the expected status the operation counts as done.
//! Each wait is bounded by `wait.max_wait_secs` unless the caller sets its own
//! deadline with [`StackOrchestrator::with_max_wait`].

use std::sync::Arc;
use std::time::Duration;

use gateflag_core::{
    classify_observed, OutputSet, ParameterSet, StackIdentity, StackName, StackNamer, StackState,
    StackStatus, WaitSettings,
};
use tracing::{info, warn};

use crate::control_plane::{observe, ControlPlane, StackRequest};
use crate::error::{ControlPlaneError, DeleteFailure, DeployFailure, WaitError};
use crate::waiter::{ConvergenceWaiter, Operation, Settled};

/// Outputs on success, a classified failure otherwise.
pub type DeploymentResult = Result<OutputSet, DeployFailure>;

#[derive(Clone)]
pub struct StackOrchestrator {
    control_plane: Arc<dyn ControlPlane>,
    namer: StackNamer,
    waiter: ConvergenceWaiter,
}

impl StackOrchestrator {
    pub fn new(control_plane: Arc<dyn ControlPlane>, namer: StackNamer, wait: &WaitSettings) -> Self {
        let waiter = ConvergenceWaiter::new(control_plane.clone(), wait.poll_interval(), wait.max_wait());
        Self { control_plane, namer, waiter }
    }

    /// Bound every later wait by `max_wait` instead of the configured one.
    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.waiter = self.waiter.with_max_wait(max_wait);
        self
    }

    pub fn control_plane(&self) -> &Arc<dyn ControlPlane> {
        &self.control_plane
    }

    pub fn stack_name(&self, identity: &StackIdentity) -> StackName {
        self.namer.name(identity)
    }

    /// Create, update or replace the stack so it runs `template` with
    /// `parameters`, returning its outputs once it has settled.
    pub async fn deploy(
        &self,
        identity: &StackIdentity,
        template: &str,
        parameters: &ParameterSet,
    ) -> DeploymentResult {
        let stack = self.stack_name(identity);
        let observed = observe(self.control_plane.as_ref(), &stack).await?;
        let status = observed.map(|d| d.status);
        let state = classify_observed(status.as_ref());
        info!(
            stack = %stack,
            state = %state,
            status = status.as_ref().map_or("absent", StackStatus::as_str),
            "deploying"
        );

        let request = StackRequest::new(&stack, template, parameters);
        match (state, status) {
            (StackState::Absent, _) | (_, None) => self.create(&request).await,
            (StackState::Healthy, Some(_)) => self.update(&request).await,
            (StackState::Busy, Some(status)) => Err(DeployFailure::Busy { stack: stack.clone(), status }),
            (StackState::Failed, Some(status)) => {
                warn!(stack = %stack, status = %status, "stack is in a failed state, replacing it");
                self.delete_existing(&stack, &status).await?;
                self.create(&request).await
            }
        }
    }

    /// Delete the stack and wait until it is gone. A missing stack is
    /// already deleted.
    pub async fn delete(&self, identity: &StackIdentity) -> Result<(), DeleteFailure> {
        let stack = self.stack_name(identity);
        match observe(self.control_plane.as_ref(), &stack).await? {
            None => {
                info!(stack = %stack, "stack already absent");
                Ok(())
            }
            Some(description) => self.delete_existing(&stack, &description.status).await,
        }
    }

    async fn create(&self, request: &StackRequest<'_>) -> DeploymentResult {
        info!(stack = %request.name, "creating stack");
        self.control_plane.create_stack(request).await?;
        self.converge(request.name, Operation::Create).await
    }

    async fn update(&self, request: &StackRequest<'_>) -> DeploymentResult {
        info!(stack = %request.name, "updating stack");
        match self.control_plane.update_stack(request).await {
            Ok(()) => self.converge(request.name, Operation::Update).await,
            Err(ControlPlaneError::NoChanges { .. }) => {
                info!(stack = %request.name, "no changes to apply");
                self.current_outputs(request.name).await
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn delete_existing(&self, stack: &StackName, status: &StackStatus) -> Result<(), DeleteFailure> {
        // A delete already underway is awaited rather than refused.
        let already_deleting = *status == StackStatus::DeleteInProgress;
        if status.state() == StackState::Busy && !already_deleting {
            return Err(DeleteFailure::Busy { stack: stack.clone(), status: status.clone() });
        }

        if !already_deleting {
            info!(stack = %stack, "deleting stack");
            match self.control_plane.delete_stack(stack).await {
                Ok(()) | Err(ControlPlaneError::NotFound { .. }) => {}
                Err(err) => return Err(err.into()),
            }
        }

        match self.waiter.wait(stack, Operation::Delete).await {
            Ok(Settled { observed: Some(d), .. }) if d.status != StackStatus::DeleteComplete => {
                Err(DeleteFailure::Terminal {
                    stack: stack.clone(),
                    status: d.status,
                    reason: d.status_reason,
                })
            }
            Ok(_) => {
                info!(stack = %stack, "stack deleted");
                Ok(())
            }
            Err(WaitError::Timeout { .. }) => {
                warn!(stack = %stack, "delete wait timed out, checking once more");
                match observe(self.control_plane.as_ref(), stack).await? {
                    None => Ok(()),
                    Some(d) if d.status == StackStatus::DeleteComplete => Ok(()),
                    Some(d) => Err(DeleteFailure::TimedOut {
                        stack: stack.clone(),
                        last_status: Some(d.status),
                    }),
                }
            }
            Err(WaitError::Transport { source, .. }) => Err(source.into()),
        }
    }

    /// Wait for `operation` to finish and return the stack's outputs.
    async fn converge(&self, stack: &StackName, operation: Operation) -> DeploymentResult {
        match self.waiter.wait(stack, operation).await {
            Ok(settled) if settled.succeeded() => {
                info!(stack = %stack, status = %operation.expected_status(), "stack settled");
                self.current_outputs(stack).await
            }
            Ok(settled) => Err(deploy_terminal(stack, settled)),
            Err(WaitError::Timeout { last_status, .. }) => {
                warn!(stack = %stack, "wait timed out, checking once more");
                match observe(self.control_plane.as_ref(), stack).await? {
                    Some(d) if d.status == operation.expected_status() => Ok(d.outputs),
                    Some(d) => Err(DeployFailure::TimedOut { stack: stack.clone(), last_status: Some(d.status) }),
                    None => Err(DeployFailure::TimedOut { stack: stack.clone(), last_status }),
                }
            }
            Err(WaitError::Transport { source, .. }) => Err(source.into()),
        }
    }

    async fn current_outputs(&self, stack: &StackName) -> DeploymentResult {
        match observe(self.control_plane.as_ref(), stack).await? {
            Some(description) => Ok(description.outputs),
            None => Err(DeployFailure::Vanished { stack: stack.clone() }),
        }
    }
}

fn deploy_terminal(stack: &StackName, settled: Settled) -> DeployFailure {
    match settled.observed {
        Some(d) => DeployFailure::Terminal {
            stack: stack.clone(),
            status: d.status,
            reason: d.status_reason,
        },
        None => DeployFailure::Vanished { stack: stack.clone() },
    }
}
