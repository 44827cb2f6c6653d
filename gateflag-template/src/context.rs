//! Placeholder context: the token → value table applied to a template.

use gateflag_core::{Config, Team};

/// Environment name token, present in both templates.
pub const TOKEN_ENVIRONMENT: &str = "__GATEFLAG__";
/// Shared secret token, global template only.
pub const TOKEN_SECRET: &str = "__GATEFLAG_SECRET__";
/// Team name token, team template only.
pub const TOKEN_TEAM: &str = "__TEAM__";

/// Literal placeholder substitutions for one template render.
///
/// Tokens are applied longest first so a token that is a prefix of another
/// can never clip it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateContext {
    substitutions: Vec<(String, String)>,
}

impl TemplateContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context for the shared stack: environment name and secret.
    pub fn global(config: &Config) -> Self {
        Self::new()
            .with(TOKEN_ENVIRONMENT, &config.environment)
            .with(TOKEN_SECRET, &config.secret)
    }

    /// Context for one team's stack: environment name and team name.
    pub fn team(config: &Config, team: &Team) -> Self {
        Self::new()
            .with(TOKEN_ENVIRONMENT, &config.environment)
            .with(TOKEN_TEAM, &team.name.0)
    }

    /// Add or replace a token.
    pub fn with(mut self, token: impl Into<String>, value: impl Into<String>) -> Self {
        let token = token.into();
        let value = value.into();
        match self.substitutions.iter_mut().find(|(t, _)| *t == token) {
            Some(slot) => slot.1 = value,
            None => self.substitutions.push((token, value)),
        }
        self
    }

    /// Apply every substitution to `body`.
    pub fn apply(&self, body: &str) -> String {
        let mut ordered: Vec<&(String, String)> = self.substitutions.iter().collect();
        ordered.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

        let mut rendered = body.to_string();
        for (token, value) in ordered {
            if !token.is_empty() {
                rendered = rendered.replace(token.as_str(), value);
            }
        }
        rendered
    }

    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.substitutions.iter().map(|(t, _)| t.as_str())
    }
}
