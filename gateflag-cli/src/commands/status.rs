//! `gateflag status [--json]`: classified state of every managed stack.

use std::path::Path;

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use gateflag_core::StackState;
use gateflag_deploy::{Pipeline, StackSummary};

use super::{block_on, connect, load_config, print_json, state_label};

/// Arguments for `gateflag status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct StatusReportJson {
    environment: String,
    stacks: Vec<StackStatusJson>,
}

#[derive(Serialize)]
struct StackStatusJson {
    stack: String,
    target: String,
    state: StackState,
    status: Option<String>,
    reason: Option<String>,
}

#[derive(Tabled)]
struct StatusTableRow {
    #[tabled(rename = "stack")]
    stack: String,
    #[tabled(rename = "state")]
    state: String,
    #[tabled(rename = "status")]
    status: String,
    #[tabled(rename = "reason")]
    reason: String,
}

impl StatusArgs {
    pub fn run(self, path: &Path) -> Result<()> {
        let config = load_config(path)?;
        let environment = config.environment.clone();
        let summaries = block_on(async {
            let control_plane = connect(&config).await;
            Pipeline::new(config, control_plane).status().await
        })??;

        if self.json {
            return print_json(&StatusReportJson {
                environment,
                stacks: summaries.into_iter().map(to_json).collect(),
            });
        }
        print_table(&environment, summaries);
        Ok(())
    }
}

fn to_json(summary: StackSummary) -> StackStatusJson {
    StackStatusJson {
        stack: summary.stack.0,
        target: summary.identity.to_string(),
        state: summary.state,
        status: summary.status.map(|s| s.as_str().to_string()),
        reason: summary.reason,
    }
}

fn print_table(environment: &str, summaries: Vec<StackSummary>) {
    let deployed = summaries
        .iter()
        .filter(|s| s.state != StackState::Absent)
        .count();
    println!(
        "Gateflag v{} | {} | {} of {} stacks deployed",
        env!("CARGO_PKG_VERSION"),
        environment,
        deployed,
        summaries.len(),
    );

    let rows: Vec<StatusTableRow> = summaries
        .into_iter()
        .map(|s| StatusTableRow {
            stack: s.stack.0,
            state: state_label(s.state).to_string(),
            status: s.status.map(|st| st.as_str().to_string()).unwrap_or_else(|| "-".into()),
            reason: s.reason.unwrap_or_default(),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
}
