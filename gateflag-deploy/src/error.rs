//! Error types for gateflag-deploy.
//!
//! Transport-level faults and stack-level outcomes are kept apart: only the
//! former are worth retrying.

use gateflag_core::{StackName, StackStatus, TeamName};
use gateflag_template::TemplateError;
use thiserror::Error;

/// Failure of a single control-plane call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ControlPlaneError {
    /// The stack does not exist.
    #[error("stack {stack} does not exist")]
    NotFound { stack: StackName },

    /// An update was submitted that would change nothing.
    #[error("no updates are to be performed on {stack}")]
    NoChanges { stack: StackName },

    /// A create was submitted for a name that is already taken.
    #[error("stack {stack} already exists")]
    AlreadyExists { stack: StackName },

    /// The provider refused the request (validation, capabilities, limits).
    #[error("{operation} rejected for {stack}: {message}")]
    Rejected {
        operation: &'static str,
        stack: StackName,
        message: String,
    },

    /// Network, throttling or other transient provider failure.
    #[error("{operation} failed for {stack}: {message}")]
    Transport {
        operation: &'static str,
        stack: StackName,
        message: String,
    },
}

impl ControlPlaneError {
    /// Whether repeating the same call later could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, ControlPlaneError::Transport { .. })
    }
}

/// Why polling a stack stopped without a settled status.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WaitError {
    #[error("timed out after {waited_secs}s waiting on {stack} (last status: {})", last_status_label(.last_status))]
    Timeout {
        stack: StackName,
        waited_secs: u64,
        last_status: Option<StackStatus>,
    },

    #[error("lost contact with {stack} while waiting: {source}")]
    Transport {
        stack: StackName,
        #[source]
        source: ControlPlaneError,
    },
}

/// A create or update that did not end in the expected status.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeployFailure {
    /// The stack was mid-operation when observed; nothing was submitted.
    #[error("stack {stack} is busy ({status}); retry once it settles")]
    Busy { stack: StackName, status: StackStatus },

    /// The stack settled in a status other than the expected one.
    #[error("stack {stack} ended in {status}{}", reason_suffix(.reason))]
    Terminal {
        stack: StackName,
        status: StackStatus,
        reason: Option<String>,
    },

    /// The stack never settled within the wait deadline.
    #[error("stack {stack} did not settle in time (last status: {})", last_status_label(.last_status))]
    TimedOut {
        stack: StackName,
        last_status: Option<StackStatus>,
    },

    /// The stack disappeared while a create or update was being awaited.
    #[error("stack {stack} disappeared during deployment")]
    Vanished { stack: StackName },

    /// Removing a failed stack ahead of re-creation did not complete.
    #[error("could not clear failed stack before re-creating it: {0}")]
    Replace(#[from] DeleteFailure),

    #[error(transparent)]
    ControlPlane(#[from] ControlPlaneError),
}

impl DeployFailure {
    pub fn is_transient(&self) -> bool {
        match self {
            DeployFailure::ControlPlane(source) => source.is_transient(),
            DeployFailure::Replace(inner) => inner.is_transient(),
            _ => false,
        }
    }
}

/// A delete that did not leave the stack absent.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeleteFailure {
    #[error("stack {stack} is busy ({status}); refusing to delete")]
    Busy { stack: StackName, status: StackStatus },

    #[error("delete of {stack} ended in {status}{}", reason_suffix(.reason))]
    Terminal {
        stack: StackName,
        status: StackStatus,
        reason: Option<String>,
    },

    #[error("delete of {stack} did not finish in time (last status: {})", last_status_label(.last_status))]
    TimedOut {
        stack: StackName,
        last_status: Option<StackStatus>,
    },

    #[error(transparent)]
    ControlPlane(#[from] ControlPlaneError),
}

impl DeleteFailure {
    pub fn is_transient(&self) -> bool {
        matches!(self, DeleteFailure::ControlPlane(source) if source.is_transient())
    }
}

/// Fleet provisioning stopped before any team was attempted.
#[derive(Debug, Error)]
pub enum FleetError {
    #[error("global stack failed, no team stacks were attempted: {0}")]
    Global(#[source] DeployFailure),
}

/// Errors from the template-toggle rollback flow.
#[derive(Debug, Error)]
pub enum RollbackError {
    #[error("team {team} has no deployed stack ({stack})")]
    NotDeployed { team: TeamName, stack: StackName },

    #[error("could not read live stack {stack}: {source}")]
    Inspect {
        stack: StackName,
        #[source]
        source: ControlPlaneError,
    },

    #[error("live template of {stack} cannot be toggled: {source}")]
    Template {
        stack: StackName,
        #[source]
        source: TemplateError,
    },

    #[error("redeploy failed: {0}")]
    Deploy(#[from] DeployFailure),
}

/// Errors from the config-driven entry points in [`crate::pipeline`].
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("template error: {0}")]
    Template(#[from] TemplateError),

    #[error("team `{0}` is not in the configuration")]
    UnknownTeam(String),

    #[error(transparent)]
    Fleet(#[from] FleetError),

    #[error(transparent)]
    Rollback(#[from] RollbackError),

    #[error(transparent)]
    ControlPlane(#[from] ControlPlaneError),
}

fn last_status_label(status: &Option<StackStatus>) -> String {
    status
        .as_ref()
        .map(ToString::to_string)
        .unwrap_or_else(|| "absent".to_string())
}

fn reason_suffix(reason: &Option<String>) -> String {
    match reason {
        Some(reason) if !reason.is_empty() => format!(": {reason}"),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transport_errors_are_transient() {
        let stack = StackName::from("Gateflag-global");
        assert!(ControlPlaneError::Transport {
            operation: "CreateStack",
            stack: stack.clone(),
            message: "throttled".into(),
        }
        .is_transient());
        assert!(!ControlPlaneError::Rejected {
            operation: "CreateStack",
            stack: stack.clone(),
            message: "template format error".into(),
        }
        .is_transient());
        assert!(!DeployFailure::Terminal {
            stack,
            status: StackStatus::RollbackComplete,
            reason: None,
        }
        .is_transient());
    }

    #[test]
    fn terminal_message_carries_status_and_reason() {
        let failure = DeployFailure::Terminal {
            stack: StackName::from("Gateflag-team-Team01"),
            status: StackStatus::RollbackComplete,
            reason: Some("AMI not found".into()),
        };
        assert_eq!(
            failure.to_string(),
            "stack Gateflag-team-Team01 ended in ROLLBACK_COMPLETE: AMI not found"
        );
    }

    #[test]
    fn timeout_without_status_reads_absent() {
        let err = WaitError::Timeout {
            stack: StackName::from("Gateflag-global"),
            waited_secs: 60,
            last_status: None,
        };
        assert!(err.to_string().contains("last status: absent"));
    }
}
