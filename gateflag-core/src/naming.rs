//! Canonical CloudFormation stack names.
//!
//! | Identity        | Name                              |
//! |-----------------|-----------------------------------|
//! | `Global`        | `{environment}-global`            |
//! | `Team("T01")`   | `{environment}-team-T01`          |

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::StackIdentity;

/// Maps stack identities to remote stack names for one environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackNamer {
    environment: String,
}

impl StackNamer {
    pub fn new(environment: impl Into<String>) -> Self {
        Self { environment: environment.into() }
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// Canonical stack name. Pure and total.
    pub fn name(&self, identity: &StackIdentity) -> StackName {
        let suffix = identity.kind().suffix();
        let name = match identity {
            StackIdentity::Global => format!("{}-{}", self.environment, suffix),
            StackIdentity::Team(team) => format!("{}-{}-{}", self.environment, suffix, team),
        };
        StackName(name)
    }
}

/// A remote stack name as submitted to the control plane.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StackName(pub String);

impl StackName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StackName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for StackName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for StackName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for StackName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
