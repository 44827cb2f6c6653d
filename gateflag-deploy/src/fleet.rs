//! Provision and tear down the whole fleet: one global stack plus one stack
//! per team.
//!
//! The global stack goes first and its outputs are folded into the team
//! parameters exactly once. Team stacks are then deployed independently, at
//! most `parallelism` at a time, and a failure in one team never stops the
//! others. Results always come back in team-list order.

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use gateflag_core::{OutputSet, ParameterSet, StackIdentity, StackName, Team, TeamName};
use tracing::{error, info, warn};

use crate::error::{DeleteFailure, DeployFailure, FleetError};
use crate::orchestrator::StackOrchestrator;
use crate::retry::RetryPolicy;

/// Team parameter carrying the machine's private address.
pub const PRIVATE_IP_PARAM: &str = "PrivateIpAddress";

/// A team and its rendered template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamPlan {
    pub team: Team,
    pub template: String,
}

#[derive(Debug, Clone)]
pub struct TeamOutcome {
    pub team: TeamName,
    pub stack: StackName,
    pub result: Result<OutputSet, DeployFailure>,
}

#[derive(Debug, Clone)]
pub struct FleetReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub global_stack: StackName,
    pub global_outputs: OutputSet,
    pub teams: Vec<TeamOutcome>,
}

impl FleetReport {
    pub fn failed(&self) -> impl Iterator<Item = &TeamOutcome> {
        self.teams.iter().filter(|t| t.result.is_err())
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed().next().is_none()
    }
}

#[derive(Debug, Clone)]
pub struct DeleteOutcome {
    pub team: TeamName,
    pub stack: StackName,
    pub result: Result<(), DeleteFailure>,
}

/// What happened to the global stack during teardown.
#[derive(Debug, Clone)]
pub enum GlobalTeardown {
    Deleted,
    Failed(DeleteFailure),
    /// Left in place because team stacks that may depend on it remain.
    Skipped { remaining_teams: usize },
}

#[derive(Debug, Clone)]
pub struct TeardownReport {
    pub teams: Vec<DeleteOutcome>,
    pub global_stack: StackName,
    pub global: GlobalTeardown,
}

impl TeardownReport {
    pub fn all_succeeded(&self) -> bool {
        matches!(self.global, GlobalTeardown::Deleted) && self.teams.iter().all(|t| t.result.is_ok())
    }
}

pub struct FleetCoordinator {
    orchestrator: StackOrchestrator,
    retry: RetryPolicy,
    parallelism: usize,
}

impl FleetCoordinator {
    pub fn new(orchestrator: StackOrchestrator, retry: RetryPolicy, parallelism: usize) -> Self {
        Self { orchestrator, retry, parallelism: parallelism.max(1) }
    }

    pub fn orchestrator(&self) -> &StackOrchestrator {
        &self.orchestrator
    }

    /// Deploy the global stack, then every team in `teams`.
    ///
    /// Fails as a whole only when the global stack fails; in that case no team
    /// stack is touched.
    pub async fn provision_all(
        &self,
        global_template: &str,
        global_parameters: &ParameterSet,
        teams: &[TeamPlan],
        team_parameters: &ParameterSet,
    ) -> Result<FleetReport, FleetError> {
        let started_at = Utc::now();
        let global = StackIdentity::Global;
        let global_stack = self.orchestrator.stack_name(&global);

        let global_outputs = self
            .retry
            .run("global", || self.orchestrator.deploy(&global, global_template, global_parameters))
            .await
            .map_err(|failure| {
                error!(stack = %global_stack, error = %failure, "global stack failed");
                FleetError::Global(failure)
            })?;
        info!(stack = %global_stack, outputs = global_outputs.len(), "global stack ready");

        let mut shared = team_parameters.clone();
        shared.fold_outputs(&global_outputs);

        let shared = &shared;
        let teams = stream::iter(teams)
            .map(move |plan| async move {
                let mut parameters = shared.clone();
                parameters.insert(PRIVATE_IP_PARAM, plan.team.ip.clone());
                self.provision_team(plan, &parameters).await
            })
            .buffered(self.parallelism)
            .collect::<Vec<_>>()
            .await;

        Ok(FleetReport {
            started_at,
            finished_at: Utc::now(),
            global_stack,
            global_outputs,
            teams,
        })
    }

    async fn provision_team(&self, plan: &TeamPlan, parameters: &ParameterSet) -> TeamOutcome {
        let identity = plan.team.identity();
        let stack = self.orchestrator.stack_name(&identity);
        let label = identity.to_string();
        let result = self
            .retry
            .run(&label, || self.orchestrator.deploy(&identity, &plan.template, parameters))
            .await;
        match &result {
            Ok(outputs) => info!(stack = %stack, outputs = outputs.len(), "team stack ready"),
            Err(failure) => warn!(stack = %stack, error = %failure, "team stack failed"),
        }
        TeamOutcome { team: plan.team.name.clone(), stack, result }
    }

    /// Delete every team stack, then the global stack.
    ///
    /// The global stack is left alone if any team delete failed.
    pub async fn teardown_all(&self, teams: &[TeamName]) -> TeardownReport {
        let outcomes = stream::iter(teams)
            .map(|team| self.teardown_team(team))
            .buffered(self.parallelism)
            .collect::<Vec<_>>()
            .await;

        let global_identity = StackIdentity::Global;
        let global_stack = self.orchestrator.stack_name(&global_identity);
        let remaining_teams = outcomes.iter().filter(|o| o.result.is_err()).count();
        let global = if remaining_teams > 0 {
            warn!(stack = %global_stack, remaining_teams, "keeping global stack, team deletes failed");
            GlobalTeardown::Skipped { remaining_teams }
        } else {
            match self
                .retry
                .run("global", || self.orchestrator.delete(&global_identity))
                .await
            {
                Ok(()) => GlobalTeardown::Deleted,
                Err(failure) => {
                    error!(stack = %global_stack, error = %failure, "global stack delete failed");
                    GlobalTeardown::Failed(failure)
                }
            }
        };

        TeardownReport { teams: outcomes, global_stack, global }
    }

    async fn teardown_team(&self, team: &TeamName) -> DeleteOutcome {
        let identity = StackIdentity::Team(team.clone());
        let stack = self.orchestrator.stack_name(&identity);
        let label = identity.to_string();
        let result = self
            .retry
            .run(&label, || self.orchestrator.delete(&identity))
            .await;
        if let Err(failure) = &result {
            warn!(stack = %stack, error = %failure, "team stack delete failed");
        }
        DeleteOutcome { team: team.clone(), stack, result }
    }
}
