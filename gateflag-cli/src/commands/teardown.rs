//! `gateflag teardown [--yes] [--json]`

use std::io::{self, BufRead, IsTerminal, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use gateflag_deploy::{GlobalTeardown, Pipeline, TeardownReport};

use super::{block_on, connect, failed_label, load_config, ok_label, print_json};

/// Delete every team stack, then the global stack.
#[derive(Args, Debug)]
pub struct TeardownArgs {
    /// Skip the confirmation prompt.
    #[arg(long, short)]
    pub yes: bool,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct TeardownReportJson {
    teams: Vec<DeleteResultJson>,
    global: DeleteResultJson,
}

#[derive(Serialize)]
struct DeleteResultJson {
    stack: String,
    result: &'static str,
    error: Option<String>,
}

#[derive(Tabled)]
struct TeardownTableRow {
    #[tabled(rename = "stack")]
    stack: String,
    #[tabled(rename = "result")]
    result: String,
    #[tabled(rename = "detail")]
    detail: String,
}

impl TeardownArgs {
    pub fn run(self, path: &Path) -> Result<()> {
        let config = load_config(path)?;
        if !self.yes && !confirm(&config.environment, config.teams.len())? {
            println!("Aborted.");
            return Ok(());
        }

        let report = block_on(async {
            let control_plane = connect(&config).await;
            Pipeline::new(config, control_plane).teardown().await
        })?;

        if self.json {
            print_json(&to_json(&report))?;
        } else {
            print_table(&report);
        }

        if !report.all_succeeded() {
            bail!("teardown incomplete; re-run once the failed stacks are fixed");
        }
        Ok(())
    }
}

/// Ask on the terminal; non-interactive runs must pass `--yes`.
fn confirm(environment: &str, teams: usize) -> Result<bool> {
    let stdin = io::stdin();
    if !stdin.is_terminal() {
        bail!("refusing to tear down without a terminal; pass --yes to confirm");
    }
    print!(
        "Delete {} team stacks and the global stack of '{}'? [y/N] ",
        teams,
        environment.bold()
    );
    io::stdout().flush().context("failed to flush prompt")?;

    let mut answer = String::new();
    stdin.lock().read_line(&mut answer).context("failed to read answer")?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

fn to_json(report: &TeardownReport) -> TeardownReportJson {
    let (result, error) = match &report.global {
        GlobalTeardown::Deleted => ("deleted", None),
        GlobalTeardown::Failed(err) => ("failed", Some(err.to_string())),
        GlobalTeardown::Skipped { remaining_teams } => (
            "skipped",
            Some(format!("{remaining_teams} team stacks remain")),
        ),
    };
    TeardownReportJson {
        teams: report
            .teams
            .iter()
            .map(|team| DeleteResultJson {
                stack: team.stack.to_string(),
                result: if team.result.is_ok() { "deleted" } else { "failed" },
                error: team.result.as_ref().err().map(ToString::to_string),
            })
            .collect(),
        global: DeleteResultJson {
            stack: report.global_stack.to_string(),
            result,
            error,
        },
    }
}

fn print_table(report: &TeardownReport) {
    let mut rows: Vec<TeardownTableRow> = report
        .teams
        .iter()
        .map(|team| match &team.result {
            Ok(()) => TeardownTableRow {
                stack: team.stack.to_string(),
                result: ok_label().to_string(),
                detail: "deleted".to_string(),
            },
            Err(err) => TeardownTableRow {
                stack: team.stack.to_string(),
                result: failed_label().to_string(),
                detail: err.to_string(),
            },
        })
        .collect();

    let (result, detail) = match &report.global {
        GlobalTeardown::Deleted => (ok_label().to_string(), "deleted".to_string()),
        GlobalTeardown::Failed(err) => (failed_label().to_string(), err.to_string()),
        GlobalTeardown::Skipped { remaining_teams } => (
            "SKIPPED".yellow().bold().to_string(),
            format!("{remaining_teams} team stacks still present"),
        ),
    };
    rows.push(TeardownTableRow {
        stack: report.global_stack.to_string(),
        result,
        detail,
    });

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
}
