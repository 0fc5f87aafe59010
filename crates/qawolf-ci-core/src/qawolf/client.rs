//! QA Wolf API client over GraphQL and the deploy-success webhook

use std::collections::HashMap;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::graphql::{decode_data, GraphqlRequest};
use super::QaWolfApi;
use crate::error::{Error, Result};
use crate::types::{CreatedEnvironment, DeploySuccessEvent, Tag, TeamBranch, TriggerSpec};

const DEFAULT_BASE_URL: &str = "https://app.qawolf.com";

/// Classification stamped on every trigger and deploy event this tool
/// creates; the platform routes preview deployments by these values.
const DEPLOYMENT_PROVIDER: &str = "generic";
const DEPLOYMENT_ENVIRONMENT: &str = "qawolf-preview";
const DEPLOYMENT_TYPE: &str = "qawolf-preview";

const ENVIRONMENTS_QUERY: &str = r#"
query Environments($where: EnvironmentWhereInput) {
  environments(where: $where) {
    id
  }
}
"#;

const CREATE_ENVIRONMENT_MUTATION: &str = r#"
mutation createEnvironment($name: String!, $teamId: String!) {
  createEnvironment(name: $name, team_id: $teamId) {
    id
    branchId
  }
}
"#;

const ENVIRONMENT_VARIABLES_QUERY: &str = r#"
query EnvironmentVariables($where: EnvironmentWhereUniqueInput!) {
  environment(where: $where) {
    id
    variablesJSON
  }
}
"#;

const UPSERT_VARIABLE_MUTATION: &str = r#"
mutation UpsertEnvironmentVariable($environmentId: ID!, $value: String!, $name: String) {
  upsertEnvironmentVariable(environment_id: $environmentId, value: $value, name: $name) {
    id
  }
}
"#;

const REPOSITORIES_QUERY: &str = r#"
query codeHostingServiceRepositories($where: CodeHostingServiceRepositoryWhereInput) {
  codeHostingServiceRepositories(where: $where) {
    id
  }
}
"#;

const GENERIC_TRIGGER_TAGS_QUERY: &str = r#"
query GenericTriggerTagsFromEnvironment($where: EnvironmentWhereUniqueInput!) {
  environment(where: $where) {
    id
    triggers(where: {deleted_at: {equals: null}, deployment_provider: {equals: "generic"}}) {
      id
      tags {
        id
        name
      }
    }
  }
}
"#;

const TRIGGERS_FOR_ENVIRONMENT_QUERY: &str = r#"
query getTriggersForBranch($where: TriggerWhereInput) {
  triggers(where: $where) {
    environment_id
    id
  }
}
"#;

const CREATE_TRIGGER_MUTATION: &str = r#"
mutation createTrigger(
  $codeHostingServiceRepositoryId: ID!,
  $deploymentBranches: String!,
  $deploymentEnvironment: String!,
  $deploymentProvider: String!,
  $environmentId: ID!,
  $name: String!,
  $teamId: ID!,
  $tag_ids: [ID!]
) {
  createTrigger(
    codeHostingServiceRepositoryId: $codeHostingServiceRepositoryId,
    deployment_branches: $deploymentBranches,
    deployment_environment: $deploymentEnvironment,
    deployment_provider: $deploymentProvider,
    environment_id: $environmentId,
    name: $name,
    team_id: $teamId,
    tag_ids: $tag_ids
  ) {
    id
    __typename
  }
}
"#;

const TEAM_BRANCHES_QUERY: &str = r#"
query teamBranches($teamId: String!) {
  teamBranches(where: { teamId: { equals: $teamId }}) {
    id
    environments {
      id
    }
  }
}
"#;

const ENVIRONMENT_WITH_BRANCH_QUERY: &str = r#"
query EnvironmentWithBranch($where: EnvironmentWhereUniqueInput!) {
  environment(where: $where) {
    id
    branchId
  }
}
"#;

const PROMOTE_WORKFLOWS_MUTATION: &str = r#"
mutation PromoteWorkflowsToBranch(
  $sourceTeamBranchId: String!
  $targetTeamBranchId: String!
) {
  promoteWorkflowsToBranch(
    sourceTeamBranchId: $sourceTeamBranchId
    targetTeamBranchId: $targetTeamBranchId
  )
}
"#;

const TRIGGERS_FOR_GIT_BRANCH_QUERY: &str = r#"
query getTriggersForBranch($where: TriggerWhereInput) {
  triggers(where: $where) {
    id
    environment {
      branchId
    }
  }
}
"#;

const DELETE_TEAM_BRANCH_MUTATION: &str = r#"
mutation deleteTeamBranch($branchId: String!, $teamId: String!) {
  deleteTeamBranch(data: { branchId: $branchId, teamId: $teamId })
}
"#;

#[derive(Debug, Deserialize)]
struct IdObject {
    #[serde(default)]
    id: String,
}

#[derive(Debug, Deserialize)]
struct EnvironmentsPayload {
    environments: Vec<IdObject>,
}

#[derive(Debug, Deserialize)]
struct CreateEnvironmentPayload {
    #[serde(rename = "createEnvironment", default)]
    create_environment: Option<CreatedEnvironmentDto>,
}

#[derive(Debug, Deserialize)]
struct CreatedEnvironmentDto {
    #[serde(default)]
    id: String,
    #[serde(rename = "branchId")]
    branch_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EnvironmentVariablesPayload {
    #[serde(default)]
    environment: Option<EnvironmentVariablesDto>,
}

#[derive(Debug, Deserialize)]
struct EnvironmentVariablesDto {
    #[allow(dead_code)]
    id: String,
    #[serde(rename = "variablesJSON")]
    variables_json: String,
}

#[derive(Debug, Deserialize)]
struct UpsertVariablePayload {
    #[serde(rename = "upsertEnvironmentVariable")]
    upsert_environment_variable: IdObject,
}

#[derive(Debug, Deserialize)]
struct RepositoriesPayload {
    #[serde(rename = "codeHostingServiceRepositories")]
    repositories: Vec<IdObject>,
}

#[derive(Debug, Deserialize)]
struct TagsPayload {
    #[serde(default)]
    environment: Option<TagsEnvironmentDto>,
}

#[derive(Debug, Deserialize)]
struct TagsEnvironmentDto {
    #[allow(dead_code)]
    id: String,
    #[serde(default)]
    triggers: Vec<TriggerTagsDto>,
}

#[derive(Debug, Deserialize)]
struct TriggerTagsDto {
    #[allow(dead_code)]
    id: String,
    #[serde(default)]
    tags: Vec<Tag>,
}

#[derive(Debug, Deserialize)]
struct TriggersPayload {
    triggers: Vec<TriggerRefDto>,
}

#[derive(Debug, Deserialize)]
struct TriggerRefDto {
    #[allow(dead_code)]
    environment_id: Option<String>,
    id: String,
}

#[derive(Debug, Deserialize)]
struct CreateTriggerPayload {
    #[serde(rename = "createTrigger", default)]
    create_trigger: Option<IdObject>,
}

#[derive(Debug, Deserialize)]
struct TeamBranchesPayload {
    #[serde(rename = "teamBranches")]
    team_branches: Vec<TeamBranch>,
}

#[derive(Debug, Deserialize)]
struct EnvironmentBranchPayload {
    #[serde(default)]
    environment: Option<EnvironmentBranchDto>,
}

#[derive(Debug, Deserialize)]
struct EnvironmentBranchDto {
    #[allow(dead_code)]
    id: String,
    #[serde(rename = "branchId")]
    branch_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BranchTriggersPayload {
    triggers: Vec<BranchTriggerDto>,
}

#[derive(Debug, Deserialize)]
struct BranchTriggerDto {
    #[allow(dead_code)]
    id: String,
    #[serde(default)]
    environment: Option<TriggerEnvironmentDto>,
}

#[derive(Debug, Deserialize)]
struct TriggerEnvironmentDto {
    #[serde(rename = "branchId")]
    branch_id: Option<String>,
}

/// Variables of the createTrigger mutation; the optional keys are left
/// out entirely when absent rather than sent as null
#[derive(Debug, Serialize)]
struct CreateTriggerVariables<'a> {
    #[serde(
        rename = "codeHostingServiceRepositoryId",
        skip_serializing_if = "Option::is_none"
    )]
    code_hosting_service_repository_id: Option<&'a str>,
    #[serde(rename = "deploymentBranches")]
    deployment_branches: &'a str,
    #[serde(rename = "deploymentEnvironment")]
    deployment_environment: &'a str,
    #[serde(rename = "deploymentProvider")]
    deployment_provider: &'a str,
    #[serde(rename = "environmentId")]
    environment_id: &'a str,
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    tag_ids: Option<&'a [String]>,
    #[serde(rename = "teamId")]
    team_id: &'a str,
}

/// Deploy-success webhook body
#[derive(Debug, Serialize)]
struct DeploySuccessBody<'a> {
    branch: &'a str,
    commit_url: &'a str,
    deployment_type: &'a str,
    deployment_url: &'a str,
    sha: &'a str,
    variables: &'a HashMap<String, String>,
}

/// QA Wolf platform client
pub struct QaWolfClient {
    client: reqwest::Client,
    graphql_endpoint: String,
    deploy_endpoint: String,
    api_key: String,
}

impl std::fmt::Debug for QaWolfClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QaWolfClient")
            .field("graphql_endpoint", &self.graphql_endpoint)
            .field("deploy_endpoint", &self.deploy_endpoint)
            .field("api_key", &"<redacted>")
            .finish_non_exhaustive()
    }
}

impl QaWolfClient {
    /// Create a new client against a platform base URL
    pub fn new(base_url: &str, api_key: String) -> Self {
        let client = reqwest::Client::builder()
            .user_agent("qawolf-ci/0.1.0")
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        let base_url = base_url.trim_end_matches('/');
        Self {
            client,
            graphql_endpoint: format!("{}/api/graphql", base_url),
            deploy_endpoint: format!("{}/api/webhooks/deploy_success", base_url),
            api_key,
        }
    }

    /// Create from environment variables, defaulting to the hosted
    /// platform
    pub fn from_env(api_key: String) -> Self {
        let base_url =
            std::env::var("QAWOLF_API_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self::new(&base_url, api_key)
    }

    /// POST a GraphQL request and decode the operation payload
    async fn graphql<T: DeserializeOwned>(&self, request: &GraphqlRequest<'_>) -> Result<T> {
        let response = self
            .client
            .post(&self.graphql_endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(request)
            .send()
            .await
            .map_err(|e| Error::Api(format!("QA Wolf API request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::Api(format!(
                "QA Wolf API returned error: {}",
                response.status()
            )));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| Error::Api(format!("failed to parse QA Wolf API response: {}", e)))?;

        decode_data(body)
    }
}

fn environment_not_found(environment_id: &str) -> Error {
    Error::NotFound(format!(
        "environment not found with ID: {}, check that the environment ID is correct",
        environment_id
    ))
}

fn parse_created_environment(payload: CreateEnvironmentPayload) -> Result<CreatedEnvironment> {
    let environment = payload
        .create_environment
        .filter(|e| !e.id.is_empty())
        .ok_or_else(|| Error::Contract("environment ID not found in response".to_string()))?;

    Ok(CreatedEnvironment {
        id: environment.id,
        branch_id: environment.branch_id,
    })
}

fn parse_variables_payload(
    payload: EnvironmentVariablesPayload,
    environment_id: &str,
) -> Result<HashMap<String, String>> {
    let environment = payload
        .environment
        .ok_or_else(|| environment_not_found(environment_id))?;

    serde_json::from_str(&environment.variables_json)
        .map_err(|e| Error::Contract(format!("failed to parse environment variables JSON: {}", e)))
}

fn parse_generic_trigger_tags(payload: TagsPayload, environment_id: &str) -> Result<Vec<Tag>> {
    let environment = payload
        .environment
        .ok_or_else(|| environment_not_found(environment_id))?;

    Ok(environment
        .triggers
        .into_iter()
        .next()
        .map(|trigger| trigger.tags)
        .unwrap_or_default())
}

fn parse_trigger_id(payload: CreateTriggerPayload) -> Result<String> {
    payload
        .create_trigger
        .map(|t| t.id)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| Error::Contract("trigger ID not found in response".to_string()))
}

fn parse_branch_triggers(payload: BranchTriggersPayload) -> Result<Option<String>> {
    match payload.triggers.into_iter().next() {
        None => Ok(None),
        Some(trigger) => {
            let branch_id = trigger
                .environment
                .and_then(|e| e.branch_id)
                .filter(|id| !id.is_empty())
                .ok_or_else(|| {
                    Error::Contract("team branch ID not found in response".to_string())
                })?;
            Ok(Some(branch_id))
        }
    }
}

fn triggers_for_environment_variables(environment_id: &str, name: &str) -> serde_json::Value {
    json!({
        "where": {
            "deleted_at": { "equals": null },
            "environment_id": { "equals": environment_id },
            "name": { "equals": name },
        }
    })
}

// Soft-deleted triggers from an earlier teardown must not resolve the branch
fn triggers_for_git_branch_variables(git_branch: &str) -> serde_json::Value {
    json!({
        "where": {
            "deleted_at": { "equals": null },
            "deployment_branches": { "equals": git_branch },
        }
    })
}

fn promotion_failure(e: Error) -> Error {
    match e {
        Error::Contract(_) => Error::Contract("promotion failed".to_string()),
        other => other,
    }
}

// A deletion that errors must never read as success
fn branch_removal_failure(e: Error) -> Error {
    match e {
        Error::Api(message) => Error::Api(format!("branch removal failed: {}", message)),
        Error::Contract(_) => Error::Contract("branch removal failed".to_string()),
        other => other,
    }
}

#[async_trait]
impl QaWolfApi for QaWolfClient {
    async fn find_environment(&self, name: &str) -> Result<Option<String>> {
        let variables = json!({
            "where": {
                "deletedAt": { "equals": null },
                "name": { "equals": name },
            }
        });
        let payload: EnvironmentsPayload = self
            .graphql(&GraphqlRequest::new(ENVIRONMENTS_QUERY, variables))
            .await?;

        Ok(payload.environments.into_iter().next().map(|e| e.id))
    }

    async fn create_environment(&self, name: &str, team_id: &str) -> Result<CreatedEnvironment> {
        let variables = json!({ "name": name, "teamId": team_id });
        let payload: CreateEnvironmentPayload = self
            .graphql(&GraphqlRequest::with_operation_name(
                CREATE_ENVIRONMENT_MUTATION,
                "createEnvironment",
                variables,
            ))
            .await?;

        parse_created_environment(payload)
    }

    async fn environment_variables(
        &self,
        environment_id: &str,
    ) -> Result<HashMap<String, String>> {
        let variables = json!({ "where": { "id": environment_id } });
        let payload: EnvironmentVariablesPayload = self
            .graphql(&GraphqlRequest::new(ENVIRONMENT_VARIABLES_QUERY, variables))
            .await?;

        parse_variables_payload(payload, environment_id)
    }

    async fn upsert_environment_variable(
        &self,
        environment_id: &str,
        name: &str,
        value: &str,
    ) -> Result<String> {
        let variables = json!({
            "environmentId": environment_id,
            "name": name,
            "value": value,
        });
        let payload: UpsertVariablePayload = self
            .graphql(&GraphqlRequest::new(UPSERT_VARIABLE_MUTATION, variables))
            .await?;

        Ok(payload.upsert_environment_variable.id)
    }

    async fn find_repository(&self, full_name: &str) -> Result<Option<String>> {
        let variables = json!({
            "where": { "externalFullName": { "equals": full_name } }
        });
        let payload: RepositoriesPayload = self
            .graphql(&GraphqlRequest::new(REPOSITORIES_QUERY, variables))
            .await?;

        Ok(payload.repositories.into_iter().next().map(|r| r.id))
    }

    async fn generic_trigger_tags(&self, environment_id: &str) -> Result<Vec<Tag>> {
        let variables = json!({ "where": { "id": environment_id } });
        let payload: TagsPayload = self
            .graphql(&GraphqlRequest::new(GENERIC_TRIGGER_TAGS_QUERY, variables))
            .await?;

        parse_generic_trigger_tags(payload, environment_id)
    }

    async fn find_trigger(&self, environment_id: &str, name: &str) -> Result<Option<String>> {
        let variables = triggers_for_environment_variables(environment_id, name);
        let payload: TriggersPayload = self
            .graphql(&GraphqlRequest::new(TRIGGERS_FOR_ENVIRONMENT_QUERY, variables))
            .await?;

        Ok(payload.triggers.into_iter().next().map(|t| t.id))
    }

    async fn create_trigger(&self, spec: &TriggerSpec) -> Result<String> {
        let variables = CreateTriggerVariables {
            code_hosting_service_repository_id: spec.repository_id.as_deref(),
            deployment_branches: &spec.deployment_branches,
            deployment_environment: DEPLOYMENT_ENVIRONMENT,
            deployment_provider: DEPLOYMENT_PROVIDER,
            environment_id: &spec.environment_id,
            name: &spec.name,
            tag_ids: spec.tag_ids.as_deref(),
            team_id: &spec.team_id,
        };
        let variables = serde_json::to_value(&variables)
            .map_err(|e| Error::Api(format!("failed to encode trigger variables: {}", e)))?;
        let payload: CreateTriggerPayload = self
            .graphql(&GraphqlRequest::with_operation_name(
                CREATE_TRIGGER_MUTATION,
                "createTrigger",
                variables,
            ))
            .await?;

        parse_trigger_id(payload)
    }

    async fn team_branches(&self, team_id: &str) -> Result<Vec<TeamBranch>> {
        let variables = json!({ "teamId": team_id });
        let payload: TeamBranchesPayload = self
            .graphql(&GraphqlRequest::new(TEAM_BRANCHES_QUERY, variables))
            .await?;

        Ok(payload.team_branches)
    }

    async fn environment_branch_id(&self, environment_id: &str) -> Result<Option<String>> {
        let variables = json!({ "where": { "id": environment_id } });
        let payload: EnvironmentBranchPayload = self
            .graphql(&GraphqlRequest::new(ENVIRONMENT_WITH_BRANCH_QUERY, variables))
            .await?;

        let environment = payload
            .environment
            .ok_or_else(|| environment_not_found(environment_id))?;
        Ok(environment.branch_id.filter(|id| !id.is_empty()))
    }

    async fn promote_workflows(
        &self,
        source_branch_id: &str,
        target_branch_id: &str,
    ) -> Result<()> {
        let variables = json!({
            "sourceTeamBranchId": source_branch_id,
            "targetTeamBranchId": target_branch_id,
        });
        self.graphql::<serde_json::Value>(&GraphqlRequest::new(
            PROMOTE_WORKFLOWS_MUTATION,
            variables,
        ))
        .await
        .map_err(promotion_failure)?;

        Ok(())
    }

    async fn team_branch_for_git_branch(&self, git_branch: &str) -> Result<Option<String>> {
        let variables = triggers_for_git_branch_variables(git_branch);
        let payload: BranchTriggersPayload = self
            .graphql(&GraphqlRequest::new(TRIGGERS_FOR_GIT_BRANCH_QUERY, variables))
            .await?;

        parse_branch_triggers(payload)
    }

    async fn delete_team_branch(&self, branch_id: &str, team_id: &str) -> Result<()> {
        let variables = json!({ "branchId": branch_id, "teamId": team_id });
        self.graphql::<serde_json::Value>(&GraphqlRequest::new(
            DELETE_TEAM_BRANCH_MUTATION,
            variables,
        ))
        .await
        .map_err(branch_removal_failure)?;

        Ok(())
    }

    async fn notify_deploy_success(&self, event: &DeploySuccessEvent) -> Result<String> {
        let body = DeploySuccessBody {
            branch: &event.branch,
            commit_url: &event.commit_url,
            deployment_type: DEPLOYMENT_TYPE,
            deployment_url: &event.deployment_url,
            sha: &event.sha,
            variables: &event.variables,
        };

        // The webhook authenticates with the raw key, unlike the
        // Bearer-prefixed GraphQL calls
        let response = self
            .client
            .post(&self.deploy_endpoint)
            .header("Authorization", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Api(format!("deploy success request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::Api(format!(
                "deploy success webhook returned error: {}",
                response.status()
            )));
        }

        response
            .text()
            .await
            .map_err(|e| Error::Api(format!("failed to read deploy success response: {}", e)))
    }
}
