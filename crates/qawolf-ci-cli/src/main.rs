#[cfg(target_env = "musl")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use std::io::Write;

use clap::Parser;
use qawolf_ci_core::{
    handle_operation, parse_repo_full_name, parse_variables, ActionLog, Error, GitHubApiClient,
    OperationContext, OperationOutput, QaWolfClient, Result, WorkflowLog,
};

#[derive(Parser)]
#[command(name = "qawolf-ci", version, about = "QA Wolf preview environment orchestration")]
struct Cli {
    /// Operation to run: create-environment, delete-environment, or run-tests
    #[arg(long, env = "QAWOLF_OPERATION")]
    operation: Option<String>,

    /// QA Wolf API key
    #[arg(long, env = "QAWOLF_API_KEY")]
    api_key: Option<String>,

    /// QA Wolf team ID
    #[arg(long, env = "QAWOLF_TEAM_ID")]
    team_id: Option<String>,

    /// Commit SHA to resolve the branch or pull request from
    #[arg(long, env = "QAWOLF_SHA")]
    sha: Option<String>,

    /// URL of the deployment under test (run-tests only)
    #[arg(long, env = "QAWOLF_DEPLOYMENT_URL")]
    deployment_url: Option<String>,

    /// Newline-separated KEY=VALUE block of environment variables
    #[arg(long, env = "QAWOLF_VARIABLES")]
    variables: Option<String>,

    /// Environment to inherit variables, tags, and workflows from
    #[arg(long, env = "QAWOLF_BASE_ENVIRONMENT_ID")]
    base_environment_id: Option<String>,

    /// Repository full name (owner/repo)
    #[arg(long, env = "GITHUB_REPOSITORY")]
    repository: Option<String>,

    /// GitHub token for API access
    #[arg(long, env = "GITHUB_TOKEN")]
    github_token: Option<String>,
}

fn main() {
    let args = Cli::parse();
    std::process::exit(run(args));
}

fn run(args: Cli) -> i32 {
    let log = WorkflowLog::new();

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build();
    let rt = match rt {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: failed to create runtime: {e}");
            return 1;
        }
    };

    match rt.block_on(execute(&args, &log)) {
        Ok(output) => {
            if let Some(ref environment_id) = output.environment_id {
                write_environment_output(environment_id, &log);
            }
            0
        }
        Err(e) => {
            log.error(&format!("Action failed: {}", e.message()));
            1
        }
    }
}

async fn execute(args: &Cli, log: &dyn ActionLog) -> Result<OperationOutput> {
    let operation = require(&args.operation, "operation")?;
    let api_key = require(&args.api_key, "api-key")?;
    let team_id = require(&args.team_id, "team-id")?;
    let sha = require(&args.sha, "sha")?;
    let repository = require(&args.repository, "repository")?;

    let (owner, repo) = parse_repo_full_name(repository)?;

    let variables = clean_opt(&args.variables)
        .map(parse_variables)
        .unwrap_or_default();
    log.debug(&format!(
        "Input environment variables count {}",
        variables.len()
    ));

    let github = match clean_opt(&args.github_token) {
        Some(token) => GitHubApiClient::new(github_api_base_url(), Some(token.to_string())),
        None => GitHubApiClient::from_env()?,
    };
    let commit = github.resolve_commit_context(&owner, &repo, sha, log).await?;

    let ctx = OperationContext {
        team_id: team_id.to_string(),
        repo_full_name: repository.to_string(),
        commit,
        deployment_url: clean_opt(&args.deployment_url).map(String::from),
        base_environment_id: clean_opt(&args.base_environment_id).map(String::from),
        variables,
    };

    let api = QaWolfClient::from_env(api_key.to_string());
    handle_operation(operation, &ctx, &api, log).await
}

/// Filter empty string from Option (action inputs arrive as "" when unset)
fn clean_opt(v: &Option<String>) -> Option<&str> {
    v.as_deref().filter(|s| !s.is_empty())
}

fn require<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str> {
    clean_opt(value).ok_or_else(|| Error::Config(format!("missing required input: {}", name)))
}

/// REST endpoint base, overridable for GitHub Enterprise runners
fn github_api_base_url() -> String {
    std::env::var("GITHUB_API_URL").unwrap_or_else(|_| "https://api.github.com".to_string())
}

/// Expose the environment ID as a named output for later workflow steps
fn write_environment_output(environment_id: &str, log: &dyn ActionLog) {
    match std::env::var("GITHUB_OUTPUT") {
        Ok(path) => {
            if let Err(e) = append_output(&path, environment_id) {
                log.warning(&format!("cannot write GITHUB_OUTPUT ({}): {}", path, e));
            }
        }
        Err(_) => log.warning("GITHUB_OUTPUT not set, skipping environment-id output"),
    }
}

fn append_output(path: &str, environment_id: &str) -> std::io::Result<()> {
    let mut file = std::fs::OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)?;
    writeln!(file, "environment-id={}", environment_id)
}
