//! Preview environment teardown
//!
//! Deletion is addressed through the team branch: the trigger whose
//! `deployment_branches` matches the git branch leads to its
//! environment's team branch, and deleting that branch removes
//! everything grouped under it.

use crate::error::{Error, Result};
use crate::log::ActionLog;
use crate::qawolf::QaWolfApi;
use crate::types::OperationContext;

/// Delete the team branch provisioned for the run's git branch.
pub async fn delete_environment(
    ctx: &OperationContext,
    api: &dyn QaWolfApi,
    log: &dyn ActionLog,
) -> Result<()> {
    let git_branch = &ctx.commit.branch;
    log.info(&format!("Deleting team branch for git branch {}", git_branch));

    let team_branch_id = api
        .team_branch_for_git_branch(git_branch)
        .await?
        .ok_or_else(|| {
            Error::NotFound(format!("no trigger found for git branch {}", git_branch))
        })?;

    api.delete_team_branch(&team_branch_id, &ctx.team_id).await?;
    log.info(&format!("Branch deleted with ID: {}", team_branch_id));

    Ok(())
}
