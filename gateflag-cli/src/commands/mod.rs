//! Subcommand implementations and the plumbing they share.

pub mod init;
pub mod provision;
pub mod render;
pub mod rollback;
pub mod status;
pub mod teardown;

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use colored::{ColoredString, Colorize};
use serde::Serialize;

use gateflag_core::{config, Config, StackState};
use gateflag_deploy::{CloudFormation, ControlPlane};

pub(crate) fn load_config(path: &Path) -> Result<Config> {
    config::load(path).with_context(|| format!("failed to load config '{}'", path.display()))
}

/// Run `future` to completion on a fresh multi-threaded runtime.
pub(crate) fn block_on<F: Future>(future: F) -> Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    Ok(runtime.block_on(future))
}

/// Build the CloudFormation-backed control plane for `config.region`.
pub(crate) async fn connect(config: &Config) -> Arc<dyn ControlPlane> {
    tracing::debug!(region = %config.region, "connecting to CloudFormation");
    Arc::new(CloudFormation::connect(&config.region).await)
}

pub(crate) fn print_json<T: Serialize>(payload: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(payload).context("failed to serialize JSON output")?
    );
    Ok(())
}

pub(crate) fn state_label(state: StackState) -> ColoredString {
    let label = state.to_string().to_uppercase();
    match state {
        StackState::Healthy => label.green().bold(),
        StackState::Busy => label.yellow().bold(),
        StackState::Failed => label.red().bold(),
        StackState::Absent => label.bright_black(),
    }
}

pub(crate) fn ok_label() -> ColoredString {
    "OK".green().bold()
}

pub(crate) fn failed_label() -> ColoredString {
    "FAILED".red().bold()
}
