//! QA Wolf platform API
//!
//! Orchestrators talk to the platform through the [`QaWolfApi`] trait
//! so tests can substitute an in-memory fake. [`QaWolfClient`] is the
//! production implementation over the platform's GraphQL endpoint and
//! deploy-success webhook.

mod client;
mod graphql;

pub use client::QaWolfClient;

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{CreatedEnvironment, DeploySuccessEvent, Tag, TeamBranch, TriggerSpec};

/// Remote operations the orchestrators depend on.
#[async_trait]
pub trait QaWolfApi: Send + Sync {
    /// ID of the first non-deleted environment with the exact name
    async fn find_environment(&self, name: &str) -> Result<Option<String>>;

    /// Create an environment under the team
    async fn create_environment(&self, name: &str, team_id: &str) -> Result<CreatedEnvironment>;

    /// Variables defined on an environment; the environment must exist
    async fn environment_variables(
        &self,
        environment_id: &str,
    ) -> Result<HashMap<String, String>>;

    /// Create or update one variable, keyed by (environment, name);
    /// returns the variable ID
    async fn upsert_environment_variable(
        &self,
        environment_id: &str,
        name: &str,
        value: &str,
    ) -> Result<String>;

    /// ID of the code hosting repository with the exact `owner/repo`
    /// full name, when the repository is integrated
    async fn find_repository(&self, full_name: &str) -> Result<Option<String>>;

    /// Tags on the environment's first non-deleted generic trigger;
    /// the environment must exist
    async fn generic_trigger_tags(&self, environment_id: &str) -> Result<Vec<Tag>>;

    /// ID of the non-deleted trigger with the exact name inside the
    /// environment
    async fn find_trigger(&self, environment_id: &str, name: &str) -> Result<Option<String>>;

    /// Create a deployment trigger; returns the trigger ID
    async fn create_trigger(&self, spec: &TriggerSpec) -> Result<String>;

    /// All team branches of a team
    async fn team_branches(&self, team_id: &str) -> Result<Vec<TeamBranch>>;

    /// Team branch an environment is grouped under; the environment
    /// must exist
    async fn environment_branch_id(&self, environment_id: &str) -> Result<Option<String>>;

    /// Copy workflows from one team branch to another
    async fn promote_workflows(
        &self,
        source_branch_id: &str,
        target_branch_id: &str,
    ) -> Result<()>;

    /// Team branch behind the trigger matching a git branch, resolved
    /// through the trigger's `deployment_branches`
    async fn team_branch_for_git_branch(&self, git_branch: &str) -> Result<Option<String>>;

    /// Delete a team branch and everything grouped under it
    async fn delete_team_branch(&self, branch_id: &str, team_id: &str) -> Result<()>;

    /// Report a successful deployment so tests run against it; returns
    /// the webhook response body
    async fn notify_deploy_success(&self, event: &DeploySuccessEvent) -> Result<String>;
}
