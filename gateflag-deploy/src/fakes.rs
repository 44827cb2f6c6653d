//! In-memory [`ControlPlane`] (testing only).
//!
//! Stacks move through scripted statuses: every describe advances a stack by
//! one step, so a waiter sees each status exactly once before the stack
//! settles. Calls are recorded in order and failures can be queued per
//! operation and stack.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use gateflag_core::{OutputSet, ParameterSet, StackName, StackStatus};

use crate::control_plane::{ControlPlane, StackDescription, StackRequest};
use crate::error::ControlPlaneError;

/// Which trait method a recorded call or injected failure refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FakeOp {
    Describe,
    Create,
    Update,
    Delete,
    GetTemplate,
}

impl FakeOp {
    pub fn is_mutation(self) -> bool {
        matches!(self, FakeOp::Create | FakeOp::Update | FakeOp::Delete)
    }
}

/// One recorded call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeCall {
    pub op: FakeOp,
    pub stack: String,
}

/// One scripted transition, applied on the next describe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakeStep {
    Status(StackStatus),
    /// The stack stops existing.
    Gone,
    /// The describe fails with this error; the stack itself is unchanged.
    Fail(ControlPlaneError),
}

impl From<StackStatus> for FakeStep {
    fn from(status: StackStatus) -> Self {
        FakeStep::Status(status)
    }
}

#[derive(Debug, Clone)]
struct FakeStack {
    status: StackStatus,
    reason: Option<String>,
    template: String,
    parameters: ParameterSet,
    outputs: OutputSet,
    pending: VecDeque<FakeStep>,
}

#[derive(Debug, Default)]
struct FakeState {
    stacks: HashMap<String, FakeStack>,
    calls: Vec<FakeCall>,
    outputs: HashMap<String, OutputSet>,
    scripts: HashMap<(FakeOp, String), VecDeque<FakeStep>>,
    failures: HashMap<(FakeOp, String), VecDeque<ControlPlaneError>>,
    reasons: HashMap<String, String>,
}

/// In-memory control plane with scripted status progressions.
#[derive(Debug, Default)]
pub struct MemoryControlPlane {
    state: Mutex<FakeState>,
}

impl MemoryControlPlane {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Place an existing stack with `status` and no scripted progression.
    pub fn seed(&self, stack: &str, status: StackStatus) {
        self.seed_with(stack, status, "", ParameterSet::new());
    }

    /// Place an existing stack with a live template and parameters.
    pub fn seed_with(&self, stack: &str, status: StackStatus, template: &str, parameters: ParameterSet) {
        let mut state = self.state();
        let outputs = state.outputs.get(stack).cloned().unwrap_or_default();
        state.stacks.insert(
            stack.to_string(),
            FakeStack {
                status,
                reason: None,
                template: template.to_string(),
                parameters,
                outputs,
                pending: VecDeque::new(),
            },
        );
    }

    /// Steps an existing stack walks through on its next describes.
    pub fn queue<I, S>(&self, stack: &str, steps: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<FakeStep>,
    {
        if let Some(existing) = self.state().stacks.get_mut(stack) {
            existing.pending.extend(steps.into_iter().map(Into::into));
        }
    }

    /// Outputs `stack` reports once it exists.
    pub fn set_outputs(&self, stack: &str, outputs: OutputSet) {
        let mut state = self.state();
        if let Some(existing) = state.stacks.get_mut(stack) {
            existing.outputs = outputs.clone();
        }
        state.outputs.insert(stack.to_string(), outputs);
    }

    /// Status reason reported alongside the stack's status.
    pub fn set_reason(&self, stack: &str, reason: &str) {
        let mut state = self.state();
        if let Some(existing) = state.stacks.get_mut(stack) {
            existing.reason = Some(reason.to_string());
        }
        state.reasons.insert(stack.to_string(), reason.to_string());
    }

    /// Steps observed after the next `op` on `stack`, replacing the default
    /// progression (`*_IN_PROGRESS` then `*_COMPLETE`, or gone for deletes).
    pub fn script<I, S>(&self, op: FakeOp, stack: &str, steps: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<FakeStep>,
    {
        let steps = steps.into_iter().map(Into::into).collect();
        self.state().scripts.insert((op, stack.to_string()), steps);
    }

    /// Queue `error` as the result of the next `op` on `stack`.
    pub fn fail_next(&self, op: FakeOp, stack: &str, error: ControlPlaneError) {
        self.state()
            .failures
            .entry((op, stack.to_string()))
            .or_default()
            .push_back(error);
    }

    pub fn calls(&self) -> Vec<FakeCall> {
        self.state().calls.clone()
    }

    /// Mutating calls in order, as `(op, stack)` pairs.
    pub fn mutations(&self) -> Vec<(FakeOp, String)> {
        self.state()
            .calls
            .iter()
            .filter(|c| c.op.is_mutation())
            .map(|c| (c.op, c.stack.clone()))
            .collect()
    }

    pub fn count(&self, op: FakeOp, stack: &str) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|c| c.op == op && c.stack == stack)
            .count()
    }

    pub fn status_of(&self, stack: &str) -> Option<StackStatus> {
        self.state().stacks.get(stack).map(|s| s.status.clone())
    }

    pub fn template_of(&self, stack: &str) -> Option<String> {
        self.state().stacks.get(stack).map(|s| s.template.clone())
    }

    pub fn parameters_of(&self, stack: &str) -> Option<ParameterSet> {
        self.state().stacks.get(stack).map(|s| s.parameters.clone())
    }

    /// Record the call, then surface any queued failure for it.
    fn enter(state: &mut FakeState, op: FakeOp, stack: &StackName) -> Result<(), ControlPlaneError> {
        state.calls.push(FakeCall { op, stack: stack.to_string() });
        match state.failures.get_mut(&(op, stack.to_string())) {
            Some(queue) => queue.pop_front().map_or(Ok(()), Err),
            None => Ok(()),
        }
    }

    fn progression(state: &mut FakeState, op: FakeOp, stack: &StackName) -> VecDeque<FakeStep> {
        if let Some(steps) = state.scripts.remove(&(op, stack.to_string())) {
            return steps;
        }
        let steps = match op {
            FakeOp::Create => vec![FakeStep::Status(StackStatus::CreateComplete)],
            FakeOp::Update => vec![FakeStep::Status(StackStatus::UpdateComplete)],
            FakeOp::Delete => vec![FakeStep::Gone],
            FakeOp::Describe | FakeOp::GetTemplate => Vec::new(),
        };
        steps.into()
    }
}

#[async_trait]
impl ControlPlane for MemoryControlPlane {
    async fn describe_stack(&self, stack: &StackName) -> Result<StackDescription, ControlPlaneError> {
        let mut state = self.state();
        Self::enter(&mut state, FakeOp::Describe, stack)?;

        let gone = match state.stacks.get_mut(stack.as_str()) {
            Some(existing) => match existing.pending.pop_front() {
                Some(FakeStep::Status(status)) => {
                    existing.status = status;
                    false
                }
                Some(FakeStep::Gone) => true,
                Some(FakeStep::Fail(err)) => return Err(err),
                None => false,
            },
            None => return Err(ControlPlaneError::NotFound { stack: stack.clone() }),
        };
        if gone {
            state.stacks.remove(stack.as_str());
            return Err(ControlPlaneError::NotFound { stack: stack.clone() });
        }

        let existing = state
            .stacks
            .get(stack.as_str())
            .ok_or_else(|| ControlPlaneError::NotFound { stack: stack.clone() })?;
        Ok(StackDescription {
            name: stack.clone(),
            status: existing.status.clone(),
            status_reason: existing.reason.clone(),
            parameters: existing.parameters.clone(),
            outputs: existing.outputs.clone(),
        })
    }

    async fn create_stack(&self, request: &StackRequest<'_>) -> Result<(), ControlPlaneError> {
        let mut state = self.state();
        Self::enter(&mut state, FakeOp::Create, request.name)?;
        if state.stacks.contains_key(request.name.as_str()) {
            return Err(ControlPlaneError::AlreadyExists { stack: request.name.clone() });
        }
        let pending = Self::progression(&mut state, FakeOp::Create, request.name);
        let outputs = state.outputs.get(request.name.as_str()).cloned().unwrap_or_default();
        let reason = state.reasons.get(request.name.as_str()).cloned();
        state.stacks.insert(
            request.name.to_string(),
            FakeStack {
                status: StackStatus::CreateInProgress,
                reason,
                template: request.template_body.to_string(),
                parameters: request.parameters.clone(),
                outputs,
                pending,
            },
        );
        Ok(())
    }

    async fn update_stack(&self, request: &StackRequest<'_>) -> Result<(), ControlPlaneError> {
        let mut state = self.state();
        Self::enter(&mut state, FakeOp::Update, request.name)?;
        let unchanged = match state.stacks.get(request.name.as_str()) {
            Some(existing) => {
                existing.template == request.template_body
                    && existing.parameters == *request.parameters
            }
            None => return Err(ControlPlaneError::NotFound { stack: request.name.clone() }),
        };
        if unchanged {
            return Err(ControlPlaneError::NoChanges { stack: request.name.clone() });
        }
        let pending = Self::progression(&mut state, FakeOp::Update, request.name);
        if let Some(existing) = state.stacks.get_mut(request.name.as_str()) {
            existing.status = StackStatus::UpdateInProgress;
            existing.template = request.template_body.to_string();
            existing.parameters = request.parameters.clone();
            existing.pending = pending;
        }
        Ok(())
    }

    async fn delete_stack(&self, stack: &StackName) -> Result<(), ControlPlaneError> {
        let mut state = self.state();
        Self::enter(&mut state, FakeOp::Delete, stack)?;
        let pending = Self::progression(&mut state, FakeOp::Delete, stack);
        // Deleting a missing stack succeeds, as the real service does.
        if let Some(existing) = state.stacks.get_mut(stack.as_str()) {
            existing.status = StackStatus::DeleteInProgress;
            existing.pending = pending;
        }
        Ok(())
    }

    async fn get_template(&self, stack: &StackName) -> Result<String, ControlPlaneError> {
        let mut state = self.state();
        Self::enter(&mut state, FakeOp::GetTemplate, stack)?;
        state
            .stacks
            .get(stack.as_str())
            .map(|s| s.template.clone())
            .ok_or_else(|| ControlPlaneError::NotFound { stack: stack.clone() })
    }
}
