//! `gateflag init [--force]`

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use gateflag_core::config;

/// Write a default configuration file.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Overwrite an existing config file.
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    pub fn run(self, path: &Path) -> Result<()> {
        let config = config::init_at(path, self.force)
            .with_context(|| format!("failed to write config '{}'", path.display()))?;

        println!("{} Wrote {}", "✓".green().bold(), path.display());
        println!(
            "  environment '{}' in {} with {} teams",
            config.environment,
            config.region,
            config.teams.len()
        );
        println!(
            "  templates expected at {} and {}",
            config.templates.global.display(),
            config.templates.team.display()
        );
        Ok(())
    }
}
