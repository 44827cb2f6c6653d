//! Template engine: loads the two stack templates from disk and renders them.
//!
//! | Stack  | Template path          | Tokens                                  |
//! |--------|------------------------|-----------------------------------------|
//! | global | `templates.global`     | `__GATEFLAG__`, `__GATEFLAG_SECRET__`   |
//! | team   | `templates.team`       | `__GATEFLAG__`, `__TEAM__`              |

use std::path::{Path, PathBuf};

use gateflag_core::{Config, StackIdentity, Team};

use crate::context::TemplateContext;
use crate::error::TemplateError;

fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> TemplateError {
    TemplateError::Io { path: path.into(), source }
}

fn read_template(path: &Path) -> Result<String, TemplateError> {
    let body = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    // Normalise line endings so rendered bodies are stable across platforms.
    Ok(body.replace("\r\n", "\n"))
}

/// A rendered template ready for submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedTemplate {
    pub identity: StackIdentity,
    pub body: String,
}

/// Raw template bodies plus the config needed to fill them in.
///
/// Create once with [`TemplateEngine::load`] and reuse for every team.
pub struct TemplateEngine {
    config: Config,
    global: String,
    team: String,
}

impl TemplateEngine {
    /// Read both template files named by `config.templates`.
    pub fn load(config: &Config) -> Result<Self, TemplateError> {
        let global = read_template(&config.templates.global)?;
        let team = read_template(&config.templates.team)?;
        Ok(Self::from_bodies(config, global, team))
    }

    /// Build an engine from in-memory bodies.
    pub fn from_bodies(config: &Config, global: impl Into<String>, team: impl Into<String>) -> Self {
        Self { config: config.clone(), global: global.into(), team: team.into() }
    }

    pub fn render_global(&self) -> RenderedTemplate {
        let body = TemplateContext::global(&self.config).apply(&self.global);
        RenderedTemplate { identity: StackIdentity::Global, body }
    }

    pub fn render_team(&self, team: &Team) -> RenderedTemplate {
        let body = TemplateContext::team(&self.config, team).apply(&self.team);
        RenderedTemplate { identity: team.identity(), body }
    }

    /// Render the global template followed by every configured team.
    pub fn render_all(&self) -> Vec<RenderedTemplate> {
        let mut rendered = Vec::with_capacity(self.config.teams.len() + 1);
        rendered.push(self.render_global());
        rendered.extend(self.config.teams.iter().map(|t| self.render_team(t)));
        rendered
    }
}
