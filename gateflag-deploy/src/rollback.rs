//! Swap a team machine between its two images by editing the live template.
//!
//! The parameters the stack is running with are reused unchanged; only the
//! image `Ref` in the template moves. Running it twice returns the stack to
//! where it started.

use gateflag_core::{ImageSlot, OutputSet, StackIdentity, StackName, TeamName};
use gateflag_template::{effective_image, toggle_image};
use tracing::info;

use crate::control_plane::observe;
use crate::error::{ControlPlaneError, RollbackError};
use crate::orchestrator::StackOrchestrator;

/// What a rollback changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollbackReport {
    pub team: TeamName,
    pub stack: StackName,
    /// Image parameter referenced before and after the edit.
    pub from_ref: String,
    pub to_ref: String,
    /// Image ids those references resolved to, when the parameter was set.
    pub from_image: Option<String>,
    pub to_image: Option<String>,
    pub outputs: OutputSet,
}

pub struct RollbackFlow<'a> {
    orchestrator: &'a StackOrchestrator,
    slot: &'a ImageSlot,
}

impl<'a> RollbackFlow<'a> {
    pub fn new(orchestrator: &'a StackOrchestrator, slot: &'a ImageSlot) -> Self {
        Self { orchestrator, slot }
    }

    pub async fn rollback(&self, team: &TeamName) -> Result<RollbackReport, RollbackError> {
        let identity = StackIdentity::Team(team.clone());
        let stack = self.orchestrator.stack_name(&identity);
        let control_plane = self.orchestrator.control_plane().as_ref();

        let inspect = |source: ControlPlaneError| RollbackError::Inspect { stack: stack.clone(), source };
        let live = observe(control_plane, &stack)
            .await
            .map_err(inspect)?
            .ok_or_else(|| RollbackError::NotDeployed { team: team.clone(), stack: stack.clone() })?;
        let body = control_plane.get_template(&stack).await.map_err(inspect)?;

        let template_err = |source| RollbackError::Template { stack: stack.clone(), source };
        let toggled = toggle_image(&body, self.slot).map_err(template_err)?;
        let from_image = effective_image(&body, self.slot, &live.parameters).map_err(template_err)?;
        let to_image = live.parameters.get(&toggled.to).map(str::to_owned);
        info!(
            stack = %stack,
            from = %toggled.from,
            to = %toggled.to,
            from_image = from_image.as_deref().unwrap_or("-"),
            to_image = to_image.as_deref().unwrap_or("-"),
            "switching machine image"
        );

        let outputs = self
            .orchestrator
            .deploy(&identity, &toggled.body, &live.parameters)
            .await?;

        Ok(RollbackReport {
            team: team.clone(),
            stack,
            from_ref: toggled.from,
            to_ref: toggled.to,
            from_image,
            to_image,
            outputs,
        })
    }
}
