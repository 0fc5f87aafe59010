//! Core domain types for preview environment orchestration

use std::collections::HashMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Operation selector for a single run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Provision (or reuse) a preview environment and its deployment trigger
    CreateEnvironment,
    /// Tear down the team branch behind a preview environment
    DeleteEnvironment,
    /// Notify the platform that a deployment succeeded so tests can run
    RunTests,
}

impl Operation {
    /// Get the selector string representation
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::CreateEnvironment => "create-environment",
            Self::DeleteEnvironment => "delete-environment",
            Self::RunTests => "run-tests",
        }
    }
}

impl FromStr for Operation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create-environment" => Ok(Self::CreateEnvironment),
            "delete-environment" => Ok(Self::DeleteEnvironment),
            "run-tests" => Ok(Self::RunTests),
            other => Err(Error::Config(format!("invalid operation: {}", other))),
        }
    }
}

/// Pull request resolved from the commit SHA
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequest {
    /// PR number
    pub number: u64,
    /// PR title
    pub title: String,
    /// Head branch name (`head.ref`)
    pub head_ref: String,
}

/// Git context of the commit a run operates on.
///
/// Built once per invocation from the GitHub API and threaded through
/// every operation. `branch` is the PR head ref when a PR exists, else
/// the first branch whose head is the commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitContext {
    /// Commit SHA the run was invoked for
    pub sha: String,
    /// Resolved git branch
    pub branch: String,
    /// Web URL of the commit
    pub commit_url: String,
    /// Associated pull request, if any
    pub pull_request: Option<PullRequest>,
}

impl CommitContext {
    /// Canonical environment name, the idempotency key for
    /// find-or-create.
    pub fn environment_name(&self) -> String {
        match &self.pull_request {
            Some(pr) => format!("[PR] #{} - {}", pr.number, pr.title),
            None => format!("[Preview] {}", self.branch),
        }
    }

    /// Canonical deployment trigger name, derived from the same
    /// PR-or-branch identity as the environment name.
    pub fn trigger_name(&self) -> String {
        match &self.pull_request {
            Some(pr) => format!("Deployments of PR #{} - {}", pr.number, pr.title),
            None => format!("Deployments of branch {}", self.branch),
        }
    }
}

/// Environment returned by the creation mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedEnvironment {
    /// Environment ID
    pub id: String,
    /// Team branch the environment was grouped under, when branching
    /// is enabled for the team
    pub branch_id: Option<String>,
}

/// Tag attached to a trigger, propagated from the base environment's
/// generic trigger to newly created triggers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: String,
    pub name: String,
}

/// Team branch grouping environments
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TeamBranch {
    pub id: String,
    /// Environments grouped under this branch
    #[serde(default)]
    pub environments: Vec<EnvironmentRef>,
}

/// Bare environment reference inside a team branch listing
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EnvironmentRef {
    pub id: String,
}

/// Everything needed to create a deployment trigger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerSpec {
    /// Canonical trigger name
    pub name: String,
    /// Environment the trigger belongs to
    pub environment_id: String,
    /// Owning team
    pub team_id: String,
    /// Git branch string the trigger matches deployments against
    pub deployment_branches: String,
    /// Code hosting repository, when the repo is integrated
    pub repository_id: Option<String>,
    /// Tags propagated from the base environment, when any exist
    pub tag_ids: Option<Vec<String>>,
}

/// Deploy-success notification payload (domain side; the wire body adds
/// the fixed deployment type)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploySuccessEvent {
    pub branch: String,
    pub commit_url: String,
    pub deployment_url: String,
    pub sha: String,
    /// Caller variables with `URL` forced to the deployment URL
    pub variables: HashMap<String, String>,
}

/// Validated per-run inputs shared by all operations
#[derive(Debug, Clone)]
pub struct OperationContext {
    /// QA Wolf team the run operates on
    pub team_id: String,
    /// `owner/repo` full name from the hosting side
    pub repo_full_name: String,
    /// Resolved commit context
    pub commit: CommitContext,
    /// Deployment URL (required for run-tests)
    pub deployment_url: Option<String>,
    /// Environment to inherit variables, tags, and workflows from
    pub base_environment_id: Option<String>,
    /// Caller-supplied variables, already parsed
    pub variables: HashMap<String, String>,
}

/// What a completed operation hands back to the CLI
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationOutput {
    /// Environment acted on, set by create-environment
    pub environment_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn pr_context() -> CommitContext {
        CommitContext {
            sha: "abc123".to_string(),
            branch: "fix-bug".to_string(),
            commit_url: "https://github.com/acme/web/commit/abc123".to_string(),
            pull_request: Some(PullRequest {
                number: 42,
                title: "Fix bug".to_string(),
                head_ref: "fix-bug".to_string(),
            }),
        }
    }

    fn branch_context() -> CommitContext {
        CommitContext {
            sha: "abc123".to_string(),
            branch: "feature-x".to_string(),
            commit_url: "https://github.com/acme/web/commit/abc123".to_string(),
            pull_request: None,
        }
    }

    #[test]
    fn test_operation_from_str() {
        assert_eq!(
            "create-environment".parse::<Operation>().ok(),
            Some(Operation::CreateEnvironment)
        );
        assert_eq!(
            "delete-environment".parse::<Operation>().ok(),
            Some(Operation::DeleteEnvironment)
        );
        assert_eq!("run-tests".parse::<Operation>().ok(), Some(Operation::RunTests));
    }

    #[test]
    fn test_operation_from_str_rejects_unknown() {
        let err = "destroy-everything".parse::<Operation>().unwrap_err();
        assert_matches!(&err, Error::Config(msg) if msg == "invalid operation: destroy-everything");
    }

    #[test]
    fn test_operation_as_str_round_trip() {
        for op in [
            Operation::CreateEnvironment,
            Operation::DeleteEnvironment,
            Operation::RunTests,
        ] {
            assert_eq!(op.as_str().parse::<Operation>().ok(), Some(op));
        }
    }

    #[test]
    fn test_environment_name_for_pull_request() {
        assert_eq!(pr_context().environment_name(), "[PR] #42 - Fix bug");
    }

    #[test]
    fn test_environment_name_for_branch() {
        assert_eq!(branch_context().environment_name(), "[Preview] feature-x");
    }

    #[test]
    fn test_trigger_name_for_pull_request() {
        assert_eq!(pr_context().trigger_name(), "Deployments of PR #42 - Fix bug");
    }

    #[test]
    fn test_trigger_name_for_branch() {
        assert_eq!(
            branch_context().trigger_name(),
            "Deployments of branch feature-x"
        );
    }

    #[test]
    fn test_names_are_deterministic() {
        let ctx = pr_context();
        assert_eq!(ctx.environment_name(), ctx.environment_name());
        assert_eq!(ctx.trigger_name(), ctx.trigger_name());
    }
}
