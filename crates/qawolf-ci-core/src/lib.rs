//! QA Wolf preview environment orchestration for CI pipelines
//!
//! Given a commit SHA, resolves the branch or pull request behind it
//! through the GitHub API and runs one of three operations against the
//! QA Wolf platform: provision a preview environment with variables and
//! a deployment trigger, tear the environment's team branch down, or
//! report a successful deployment so tests run against it.
//!
//! Provisioning is idempotent: the environment name derived from the
//! PR or branch is the lookup key, so reruns converge on the same
//! remote entities instead of duplicating them.

pub mod env_vars;
pub mod error;
pub mod github;
pub mod log;
pub mod ops;
pub mod qawolf;
pub mod types;

pub use env_vars::parse_variables;
pub use error::{Error, Result};
pub use github::{parse_repo_full_name, GitHubApiClient};
pub use log::{ActionLog, WorkflowLog};
pub use ops::handle_operation;
pub use qawolf::{QaWolfApi, QaWolfClient};
pub use types::{
    CommitContext, Operation, OperationContext, OperationOutput, PullRequest,
};
