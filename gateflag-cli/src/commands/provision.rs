//! `gateflag provision [--team <name>...] [--json]`

use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Args;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use gateflag_core::OutputSet;
use gateflag_deploy::{FleetReport, Pipeline, TeamScope};
use gateflag_template::TemplateEngine;

use super::{block_on, connect, failed_label, load_config, ok_label, print_json};

/// Deploy the global stack and then every selected team stack.
#[derive(Args, Debug)]
pub struct ProvisionArgs {
    /// Limit the run to these teams (repeatable). Defaults to every team.
    #[arg(long = "team", value_name = "NAME")]
    pub teams: Vec<String>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct ProvisionReportJson {
    started_at: String,
    finished_at: String,
    global: StackResultJson,
    teams: Vec<StackResultJson>,
}

#[derive(Serialize)]
struct StackResultJson {
    stack: String,
    ok: bool,
    outputs: Vec<OutputJson>,
    error: Option<String>,
}

#[derive(Serialize)]
struct OutputJson {
    key: String,
    value: String,
}

#[derive(Tabled)]
struct ProvisionTableRow {
    #[tabled(rename = "stack")]
    stack: String,
    #[tabled(rename = "result")]
    result: String,
    #[tabled(rename = "detail")]
    detail: String,
}

impl ProvisionArgs {
    pub fn run(self, path: &Path) -> Result<()> {
        let config = load_config(path)?;
        let engine = TemplateEngine::load(&config).context("failed to read templates")?;
        let scope = if self.teams.is_empty() {
            TeamScope::All
        } else {
            TeamScope::Only(self.teams)
        };

        let report = block_on(async {
            let control_plane = connect(&config).await;
            Pipeline::new(config, control_plane).provision(&engine, &scope).await
        })??;

        if self.json {
            print_json(&to_json(&report))?;
        } else {
            print_table(&report);
        }

        let failed = report.failed().count();
        if failed > 0 {
            bail!("{failed} of {} team stacks failed", report.teams.len());
        }
        Ok(())
    }
}

fn to_json(report: &FleetReport) -> ProvisionReportJson {
    ProvisionReportJson {
        started_at: report.started_at.to_rfc3339(),
        finished_at: report.finished_at.to_rfc3339(),
        global: StackResultJson {
            stack: report.global_stack.to_string(),
            ok: true,
            outputs: outputs_json(&report.global_outputs),
            error: None,
        },
        teams: report
            .teams
            .iter()
            .map(|team| match &team.result {
                Ok(set) => StackResultJson {
                    stack: team.stack.to_string(),
                    ok: true,
                    outputs: outputs_json(set),
                    error: None,
                },
                Err(err) => StackResultJson {
                    stack: team.stack.to_string(),
                    ok: false,
                    outputs: Vec::new(),
                    error: Some(err.to_string()),
                },
            })
            .collect(),
    }
}

fn outputs_json(outputs: &OutputSet) -> Vec<OutputJson> {
    outputs
        .iter()
        .map(|o| OutputJson { key: o.key.clone(), value: o.value.clone() })
        .collect()
}

fn print_table(report: &FleetReport) {
    let elapsed = report.finished_at - report.started_at;
    println!(
        "Provisioned {} team stacks in {}s",
        report.teams.len(),
        elapsed.num_seconds()
    );

    let mut rows = vec![ProvisionTableRow {
        stack: report.global_stack.to_string(),
        result: ok_label().to_string(),
        detail: summarize_outputs(&report.global_outputs),
    }];
    rows.extend(report.teams.iter().map(|team| match &team.result {
        Ok(outputs) => ProvisionTableRow {
            stack: team.stack.to_string(),
            result: ok_label().to_string(),
            detail: summarize_outputs(outputs),
        },
        Err(err) => ProvisionTableRow {
            stack: team.stack.to_string(),
            result: failed_label().to_string(),
            detail: err.to_string(),
        },
    }));

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
}

fn summarize_outputs(outputs: &OutputSet) -> String {
    if outputs.is_empty() {
        return "no outputs".to_string();
    }
    outputs
        .iter()
        .map(|o| format!("{}={}", o.key, o.value))
        .collect::<Vec<_>>()
        .join(", ")
}
