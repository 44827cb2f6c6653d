//! # gateflag-deploy
//!
//! Drives CloudFormation stacks to a requested state.
//!
//! - [`control_plane`]: the [`ControlPlane`] trait the rest is written against
//! - [`cloudformation`]: AWS-backed implementation
//! - [`fakes`]: in-memory implementation for tests
//! - [`waiter`]: polling until a stack settles
//! - [`orchestrator`]: create / update / replace / refuse for one stack
//! - [`fleet`]: global stack then every team, and teardown in reverse
//! - [`rollback`]: switch a team machine between its two images
//! - [`pipeline`]: config-driven entry points for the CLI

pub mod cloudformation;
pub mod control_plane;
pub mod error;
pub mod fakes;
pub mod fleet;
pub mod orchestrator;
pub mod pipeline;
pub mod retry;
pub mod rollback;
pub mod waiter;

pub use cloudformation::CloudFormation;
pub use control_plane::{ControlPlane, StackDescription, StackRequest, CAPABILITIES};
pub use error::{
    ControlPlaneError, DeleteFailure, DeployFailure, FleetError, PipelineError, RollbackError,
    WaitError,
};
pub use fleet::{
    DeleteOutcome, FleetCoordinator, FleetReport, GlobalTeardown, TeamOutcome, TeamPlan,
    TeardownReport, PRIVATE_IP_PARAM,
};
pub use orchestrator::{DeploymentResult, StackOrchestrator};
pub use pipeline::{Pipeline, StackSummary, TeamScope};
pub use retry::RetryPolicy;
pub use rollback::{RollbackFlow, RollbackReport};
pub use waiter::{ConvergenceWaiter, Operation, Settled};
