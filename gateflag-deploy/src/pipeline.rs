//! Config-driven entry points shared by every `gateflag` subcommand.

use std::sync::Arc;

use gateflag_core::{classify_observed, Config, StackIdentity, StackName, StackState, StackStatus, Team, TeamName};
use gateflag_template::TemplateEngine;

use crate::control_plane::{observe, ControlPlane};
use crate::error::PipelineError;
use crate::fleet::{FleetCoordinator, FleetReport, TeamPlan, TeardownReport};
use crate::orchestrator::StackOrchestrator;
use crate::retry::RetryPolicy;
use crate::rollback::{RollbackFlow, RollbackReport};

/// Which teams a provisioning run covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TeamScope {
    /// Every configured team.
    All,
    /// The named teams, in the order given.
    Only(Vec<String>),
}

/// Observed state of one managed stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackSummary {
    pub identity: StackIdentity,
    pub stack: StackName,
    pub state: StackState,
    pub status: Option<StackStatus>,
    pub reason: Option<String>,
}

pub struct Pipeline {
    config: Config,
    fleet: FleetCoordinator,
}

impl Pipeline {
    pub fn new(config: Config, control_plane: Arc<dyn ControlPlane>) -> Self {
        let orchestrator = StackOrchestrator::new(control_plane, config.namer(), &config.wait);
        let fleet = FleetCoordinator::new(orchestrator, RetryPolicy::from(&config.retry), config.parallelism);
        Self { config, fleet }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Resolve `scope` against the configured teams.
    pub fn select_teams(&self, scope: &TeamScope) -> Result<Vec<Team>, PipelineError> {
        match scope {
            TeamScope::All => Ok(self.config.teams.clone()),
            TeamScope::Only(names) => names
                .iter()
                .map(|name| {
                    self.config
                        .team(name)
                        .cloned()
                        .ok_or_else(|| PipelineError::UnknownTeam(name.clone()))
                })
                .collect(),
        }
    }

    /// Render and deploy the global stack plus the teams in `scope`.
    pub async fn provision(&self, engine: &TemplateEngine, scope: &TeamScope) -> Result<FleetReport, PipelineError> {
        let teams = self.select_teams(scope)?;
        let global = engine.render_global();
        let plans: Vec<TeamPlan> = teams
            .into_iter()
            .map(|team| {
                let template = engine.render_team(&team).body;
                TeamPlan { team, template }
            })
            .collect();

        let report = self
            .fleet
            .provision_all(
                &global.body,
                &self.config.global_parameters,
                &plans,
                &self.config.team_parameters,
            )
            .await?;
        Ok(report)
    }

    /// Delete every configured team stack, then the global stack.
    pub async fn teardown(&self) -> TeardownReport {
        let teams: Vec<TeamName> = self.config.teams.iter().map(|t| t.name.clone()).collect();
        self.fleet.teardown_all(&teams).await
    }

    pub async fn rollback(&self, team: &str) -> Result<RollbackReport, PipelineError> {
        let team = self
            .config
            .team(team)
            .ok_or_else(|| PipelineError::UnknownTeam(team.to_string()))?;
        let report = RollbackFlow::new(self.fleet.orchestrator(), &self.config.image)
            .rollback(&team.name)
            .await?;
        Ok(report)
    }

    /// Describe the global stack and every team stack, in that order.
    pub async fn status(&self) -> Result<Vec<StackSummary>, PipelineError> {
        let orchestrator = self.fleet.orchestrator();
        let identities = std::iter::once(StackIdentity::Global)
            .chain(self.config.teams.iter().map(Team::identity));

        let mut summaries = Vec::with_capacity(self.config.teams.len() + 1);
        for identity in identities {
            let stack = orchestrator.stack_name(&identity);
            let observed = observe(orchestrator.control_plane().as_ref(), &stack).await?;
            let status = observed.as_ref().map(|d| d.status.clone());
            summaries.push(StackSummary {
                state: classify_observed(status.as_ref()),
                reason: observed.and_then(|d| d.status_reason),
                identity,
                stack,
                status,
            });
        }
        Ok(summaries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::MemoryControlPlane;

    fn pipeline(fake: &Arc<MemoryControlPlane>) -> Pipeline {
        Pipeline::new(Config::default(), fake.clone())
    }

    #[test]
    fn unknown_team_is_rejected() {
        let fake = Arc::new(MemoryControlPlane::new());
        let err = pipeline(&fake)
            .select_teams(&TeamScope::Only(vec!["Team99".into()]))
            .unwrap_err();
        assert!(matches!(err, PipelineError::UnknownTeam(name) if name == "Team99"));
    }

    #[test]
    fn scope_keeps_requested_order() {
        let fake = Arc::new(MemoryControlPlane::new());
        let teams = pipeline(&fake)
            .select_teams(&TeamScope::Only(vec!["Team02".into(), "Team01".into()]))
            .expect("select");
        let names: Vec<_> = teams.iter().map(|t| t.name.0.as_str()).collect();
        assert_eq!(names, ["Team02", "Team01"]);
    }

    #[tokio::test(start_paused = true)]
    async fn status_lists_global_then_teams() {
        let fake = Arc::new(MemoryControlPlane::new());
        fake.seed("Gateflag-global", StackStatus::CreateComplete);
        fake.seed("Gateflag-team-Team02", StackStatus::UpdateRollbackInProgress);

        let summaries = pipeline(&fake).status().await.expect("status");
        let states: Vec<_> = summaries.iter().map(|s| (s.stack.as_str(), s.state)).collect();
        assert_eq!(
            states,
            [
                ("Gateflag-global", StackState::Healthy),
                ("Gateflag-team-Team01", StackState::Absent),
                ("Gateflag-team-Team02", StackState::Busy),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn provision_scope_limits_team_stacks() {
        let fake = Arc::new(MemoryControlPlane::new());
        let config = Config::default();
        let engine = TemplateEngine::from_bodies(&config, "global: __GATEFLAG__", "team: __TEAM__");

        let report = pipeline(&fake)
            .provision(&engine, &TeamScope::Only(vec!["Team02".into()]))
            .await
            .expect("provision");
        assert_eq!(report.teams.len(), 1);
        assert!(fake.status_of("Gateflag-team-Team01").is_none());
        assert_eq!(fake.template_of("Gateflag-team-Team02").as_deref(), Some("team: Team02"));
    }
}
