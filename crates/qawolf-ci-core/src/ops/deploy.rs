//! Deployment success notification
//!
//! Fire-and-forget: the platform decides which triggers match the
//! deployed branch and schedules test runs. No dedup per SHA, so
//! redeploys of the same commit notify again.

use crate::error::Result;
use crate::log::ActionLog;
use crate::qawolf::QaWolfApi;
use crate::types::{DeploySuccessEvent, OperationContext};

/// Report a successful deployment of the run's commit.
pub async fn run_deployment_tests(
    ctx: &OperationContext,
    deployment_url: &str,
    api: &dyn QaWolfApi,
    log: &dyn ActionLog,
) -> Result<()> {
    // The deployment URL always wins the URL key
    let mut variables = ctx.variables.clone();
    variables.insert("URL".to_string(), deployment_url.to_string());

    let event = DeploySuccessEvent {
        branch: ctx.commit.branch.clone(),
        commit_url: ctx.commit.commit_url.clone(),
        deployment_url: deployment_url.to_string(),
        sha: ctx.commit.sha.clone(),
        variables,
    };

    let response = api.notify_deploy_success(&event).await?;
    log.info(&format!("Triggered QA Wolf tests: {}", response));

    Ok(())
}
