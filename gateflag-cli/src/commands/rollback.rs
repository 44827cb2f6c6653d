//! `gateflag rollback <team> [--json]`

use std::path::Path;

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use serde::Serialize;

use gateflag_deploy::{Pipeline, RollbackReport};

use super::{block_on, connect, load_config, print_json};

/// Switch a team machine between its primary and alternate image.
#[derive(Args, Debug)]
pub struct RollbackArgs {
    /// Team whose stack is switched.
    pub team: String,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct RollbackReportJson {
    team: String,
    stack: String,
    from: ImageJson,
    to: ImageJson,
}

#[derive(Serialize)]
struct ImageJson {
    parameter: String,
    image: Option<String>,
}

impl RollbackArgs {
    pub fn run(self, path: &Path) -> Result<()> {
        let config = load_config(path)?;
        let team = self.team;
        let report = block_on(async {
            let control_plane = connect(&config).await;
            Pipeline::new(config, control_plane).rollback(&team).await
        })??;

        if self.json {
            return print_json(&to_json(report));
        }
        println!(
            "{} {} now runs {} ({})",
            "✓".green().bold(),
            report.stack,
            report.to_ref.bold(),
            report.to_image.as_deref().unwrap_or("unset"),
        );
        println!(
            "  was {} ({})",
            report.from_ref,
            report.from_image.as_deref().unwrap_or("unset"),
        );
        Ok(())
    }
}

fn to_json(report: RollbackReport) -> RollbackReportJson {
    RollbackReportJson {
        team: report.team.0,
        stack: report.stack.0,
        from: ImageJson { parameter: report.from_ref, image: report.from_image },
        to: ImageJson { parameter: report.to_ref, image: report.to_image },
    }
}
