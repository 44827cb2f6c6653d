//! Gateflag core library: domain types, stack naming, status classification,
//! configuration, errors.
//!
//! - [`types`]: newtypes and domain structs
//! - [`naming`]: [`StackNamer`]
//! - [`status`]: [`StackStatus`] vocabulary and [`classify`]
//! - [`config`]: `gateflag.yaml` load / save / init
//! - [`error`]: [`ConfigError`]

pub mod config;
pub mod error;
pub mod naming;
pub mod status;
pub mod types;

pub use config::{Config, ImageSlot, RetrySettings, TemplatePaths, WaitSettings};
pub use error::ConfigError;
pub use naming::{StackName, StackNamer};
pub use status::{classify, classify_observed, StackState, StackStatus};
pub use types::{
    Output, OutputSet, ParameterSet, StackIdentity, StackKind, Team, TeamName,
};
