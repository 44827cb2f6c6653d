//! `gateflag render [--team <name>]`: offline template preview.

use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;

use gateflag_template::{RenderedTemplate, TemplateEngine};

use super::load_config;

#[derive(Args, Debug)]
pub struct RenderArgs {
    /// Render only this team's template.
    #[arg(long)]
    pub team: Option<String>,
}

impl RenderArgs {
    pub fn run(self, path: &Path) -> Result<()> {
        let config = load_config(path)?;
        let engine = TemplateEngine::load(&config).context("failed to read templates")?;

        let rendered: Vec<RenderedTemplate> = match self.team.as_deref() {
            Some(name) => {
                let Some(team) = config.team(name) else {
                    bail!("unknown team '{name}' (not listed in {})", path.display());
                };
                vec![engine.render_team(team)]
            }
            None => engine.render_all(),
        };

        let namer = config.namer();
        for template in rendered {
            let stack = namer.name(&template.identity);
            println!("{}", format!("# --- {stack} ({}) ---", template.identity).bold());
            println!("{}", template.body.trim_end());
        }
        Ok(())
    }
}
