//! Preview environment provisioning
//!
//! The environment name derived from the PR or branch is the
//! idempotency key: every step looks up before it creates, so rerunning
//! the operation for the same commit converges on the same environment
//! and trigger instead of accumulating duplicates.
//!
//! Sequence:
//! 1. Find or create the environment by canonical name
//! 2. Merge base environment variables under the caller's and upsert
//! 3. Look up the code hosting repository (absence is fine)
//! 4. Fetch tags from the base environment's generic trigger
//! 5. Find or create the deployment trigger
//! 6. For a brand-new environment on a multi-branch team, promote
//!    workflows from the base environment's team branch

use std::collections::HashMap;

use futures::future::try_join_all;

use crate::error::{Error, Result};
use crate::log::ActionLog;
use crate::qawolf::QaWolfApi;
use crate::types::{OperationContext, Tag, TriggerSpec};

/// Environment resolved by the find-or-create step
struct ProvisionedEnvironment {
    id: String,
    branch_id: Option<String>,
    newly_created: bool,
}

/// Provision the preview environment for the run's commit and return
/// its ID.
pub async fn create_environment(
    ctx: &OperationContext,
    api: &dyn QaWolfApi,
    log: &dyn ActionLog,
) -> Result<String> {
    log.info("Creating environment for pull request...");
    let environment = find_or_create_environment(ctx, api, log).await?;
    log.info(&format!("Environment created with ID: {}", environment.id));

    // Base variables first, caller entries overwrite per key
    let mut variables = match &ctx.base_environment_id {
        Some(base_id) => api.environment_variables(base_id).await?,
        None => HashMap::new(),
    };
    variables.extend(ctx.variables.clone());

    log.info("Creating environment variables...");
    let upserts = variables
        .iter()
        .map(|(name, value)| api.upsert_environment_variable(&environment.id, name, value));
    try_join_all(upserts).await?;
    log.info(&format!(
        "Environment variables created for environment ID: {}",
        environment.id
    ));

    log.info("Retrieving repository ID...");
    let repository_id = api.find_repository(&ctx.repo_full_name).await?;
    match &repository_id {
        Some(id) => log.info(&format!("Repository ID retrieved: {}", id)),
        None => log.info(
            "Repository not integrated with QA Wolf, enable it in the settings page to get PR comments and checks.",
        ),
    }

    let tags = match &ctx.base_environment_id {
        Some(base_id) => api.generic_trigger_tags(base_id).await?,
        None => Vec::new(),
    };
    log.info(&format!("Tags retrieved: {}", format_tag_names(&tags)));

    log.info("Creating trigger for deployment...");
    find_or_create_trigger(ctx, &environment.id, repository_id, &tags, api, log).await?;

    if environment.newly_created {
        promote_base_workflows(ctx, &environment, api, log).await?;
    }

    Ok(environment.id)
}

async fn find_or_create_environment(
    ctx: &OperationContext,
    api: &dyn QaWolfApi,
    log: &dyn ActionLog,
) -> Result<ProvisionedEnvironment> {
    let name = ctx.commit.environment_name();

    if let Some(existing_id) = api.find_environment(&name).await? {
        log.info(&format!(
            "Environment already exists with ID: {}",
            existing_id
        ));
        return Ok(ProvisionedEnvironment {
            id: existing_id,
            branch_id: None,
            newly_created: false,
        });
    }

    let created = api.create_environment(&name, &ctx.team_id).await?;
    Ok(ProvisionedEnvironment {
        id: created.id,
        branch_id: created.branch_id,
        newly_created: true,
    })
}

async fn find_or_create_trigger(
    ctx: &OperationContext,
    environment_id: &str,
    repository_id: Option<String>,
    tags: &[Tag],
    api: &dyn QaWolfApi,
    log: &dyn ActionLog,
) -> Result<String> {
    let name = ctx.commit.trigger_name();

    if let Some(trigger_id) = api.find_trigger(environment_id, &name).await? {
        log.info(&format!(
            "Trigger with name {} already exists with id {} in environment {}",
            name, trigger_id, environment_id
        ));
        return Ok(trigger_id);
    }

    let tag_ids = if tags.is_empty() {
        None
    } else {
        Some(tags.iter().map(|tag| tag.id.clone()).collect())
    };

    let spec = TriggerSpec {
        name,
        environment_id: environment_id.to_string(),
        team_id: ctx.team_id.clone(),
        deployment_branches: ctx.commit.branch.clone(),
        repository_id,
        tag_ids,
    };
    let trigger_id = api.create_trigger(&spec).await?;
    log.info(&format!("Trigger created with ID: {}", trigger_id));
    Ok(trigger_id)
}

/// Promote workflows from the base environment's team branch to the new
/// environment's branch.
///
/// Only runs when the team actually has more than one branch; a
/// single-branch team has nothing to promote across. Requires a base
/// environment that is grouped under a branch.
async fn promote_base_workflows(
    ctx: &OperationContext,
    environment: &ProvisionedEnvironment,
    api: &dyn QaWolfApi,
    log: &dyn ActionLog,
) -> Result<()> {
    let team_branches = api.team_branches(&ctx.team_id).await?;
    if team_branches.len() <= 1 {
        return Ok(());
    }

    let base_environment_id = ctx.base_environment_id.as_deref().ok_or_else(|| {
        Error::Contract(
            "base environment ID is required to promote workflows to a new branch".to_string(),
        )
    })?;

    let base_branch_id = api
        .environment_branch_id(base_environment_id)
        .await?
        .ok_or_else(|| Error::Contract("base branch ID not found in response".to_string()))?;

    let target_branch_id = environment
        .branch_id
        .as_deref()
        .ok_or_else(|| Error::Contract("target branch ID not found in response".to_string()))?;

    log.info(&format!(
        "Promoting workflows from branch {} to {}",
        base_branch_id, target_branch_id
    ));
    api.promote_workflows(&base_branch_id, target_branch_id).await
}

fn format_tag_names(tags: &[Tag]) -> String {
    if tags.is_empty() {
        return "none".to_string();
    }
    tags.iter()
        .map(|tag| tag.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_tag_names() {
        let tags = vec![
            Tag {
                id: "tag_1".to_string(),
                name: "smoke".to_string(),
            },
            Tag {
                id: "tag_2".to_string(),
                name: "checkout".to_string(),
            },
        ];
        assert_eq!(format_tag_names(&tags), "smoke, checkout");
    }

    #[test]
    fn test_format_tag_names_empty() {
        assert_eq!(format_tag_names(&[]), "none");
    }
}
