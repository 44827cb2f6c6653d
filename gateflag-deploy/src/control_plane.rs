//! The remote stack service seen as a trait.
//!
//! [`crate::cloudformation::CloudFormation`] talks to AWS;
//! [`crate::fakes::MemoryControlPlane`] keeps everything in memory for tests.

use async_trait::async_trait;
use gateflag_core::{OutputSet, ParameterSet, StackName, StackStatus};

use crate::error::ControlPlaneError;

/// Capabilities acknowledged on every create and update.
pub const CAPABILITIES: &[&str] = &[
    "CAPABILITY_AUTO_EXPAND",
    "CAPABILITY_IAM",
    "CAPABILITY_NAMED_IAM",
];

/// One observation of a remote stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackDescription {
    pub name: StackName,
    pub status: StackStatus,
    pub status_reason: Option<String>,
    pub parameters: ParameterSet,
    pub outputs: OutputSet,
}

/// Body of a create or update submission.
#[derive(Debug, Clone, Copy)]
pub struct StackRequest<'a> {
    pub name: &'a StackName,
    pub template_body: &'a str,
    pub parameters: &'a ParameterSet,
}

impl<'a> StackRequest<'a> {
    pub fn new(name: &'a StackName, template_body: &'a str, parameters: &'a ParameterSet) -> Self {
        Self { name, template_body, parameters }
    }
}

#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// Current status, parameters and outputs of `stack`.
    ///
    /// Returns [`ControlPlaneError::NotFound`] when no such stack exists.
    async fn describe_stack(&self, stack: &StackName) -> Result<StackDescription, ControlPlaneError>;

    async fn create_stack(&self, request: &StackRequest<'_>) -> Result<(), ControlPlaneError>;

    /// Returns [`ControlPlaneError::NoChanges`] when the submission matches
    /// what is already deployed.
    async fn update_stack(&self, request: &StackRequest<'_>) -> Result<(), ControlPlaneError>;

    async fn delete_stack(&self, stack: &StackName) -> Result<(), ControlPlaneError>;

    /// The template body the stack was last deployed with.
    async fn get_template(&self, stack: &StackName) -> Result<String, ControlPlaneError>;
}

/// Describe `stack`, folding "does not exist" into `None`.
pub async fn observe(
    control_plane: &dyn ControlPlane,
    stack: &StackName,
) -> Result<Option<StackDescription>, ControlPlaneError> {
    match control_plane.describe_stack(stack).await {
        Ok(description) => Ok(Some(description)),
        Err(ControlPlaneError::NotFound { .. }) => Ok(None),
        Err(err) => Err(err),
    }
}
