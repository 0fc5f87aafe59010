//! GitHub REST API client for commit context resolution

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::log::ActionLog;
use crate::types::{CommitContext, PullRequest};

/// GitHub API pull request object (subset)
#[derive(Debug, Deserialize)]
struct GitHubPullRequest {
    number: u64,
    title: String,
    html_url: String,
    head: GitHubPullRequestHead,
}

/// Head branch of a pull request
#[derive(Debug, Deserialize)]
struct GitHubPullRequestHead {
    #[serde(rename = "ref")]
    head_ref: String,
}

/// GitHub API branch object (subset)
#[derive(Debug, Deserialize)]
struct GitHubBranch {
    name: String,
}

/// GitHub API client for resolving the branch and PR behind a commit
pub struct GitHubApiClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl std::fmt::Debug for GitHubApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubApiClient")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

impl GitHubApiClient {
    /// Create a new GitHub API client
    pub fn new(base_url: String, token: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .user_agent("qawolf-ci/0.1.0")
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            base_url,
            token,
        }
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var("GITHUB_API_URL")
            .unwrap_or_else(|_| "https://api.github.com".to_string());

        let token = std::env::var("GITHUB_TOKEN").ok();

        Ok(Self::new(base_url, token))
    }

    /// Resolve the branch, pull request, and commit URL for a SHA.
    ///
    /// The first pull request associated with the commit wins; its head
    /// ref is the branch. Without a PR, the first branch whose head is
    /// the commit is used. No branch at all is fatal.
    pub async fn resolve_commit_context(
        &self,
        owner: &str,
        repo: &str,
        sha: &str,
        log: &dyn ActionLog,
    ) -> Result<CommitContext> {
        let pull_requests = self.pull_requests_for_commit(owner, repo, sha).await?;
        let branches = self.branches_for_head_commit(owner, repo, sha).await?;

        let pr = pull_requests.into_iter().next();
        match &pr {
            None => log.debug("No PR found"),
            Some(pr) => log.debug(&format!(
                "Selected pull request from SHA: {} {} {}",
                pr.title, pr.html_url, pr.head.head_ref
            )),
        }

        let branch = select_branch(pr.as_ref(), branches)
            .ok_or_else(|| Error::NotFound(format!("no branch found for SHA or PR ref: {}", sha)))?;

        log.debug(&format!("Selected branch from SHA: {}", branch));

        Ok(CommitContext {
            sha: sha.to_string(),
            branch,
            commit_url: commit_url(&server_url(), owner, repo, sha),
            pull_request: pr.map(|pr| PullRequest {
                number: pr.number,
                title: pr.title,
                head_ref: pr.head.head_ref,
            }),
        })
    }

    /// Pull requests associated with a commit, most relevant first
    async fn pull_requests_for_commit(
        &self,
        owner: &str,
        repo: &str,
        sha: &str,
    ) -> Result<Vec<GitHubPullRequest>> {
        let url = format!(
            "{}/repos/{}/{}/commits/{}/pulls",
            self.base_url, owner, repo, sha
        );
        self.get_json(&url).await
    }

    /// Branches whose head commit is the given SHA
    async fn branches_for_head_commit(
        &self,
        owner: &str,
        repo: &str,
        sha: &str,
    ) -> Result<Vec<GitHubBranch>> {
        let url = format!(
            "{}/repos/{}/{}/commits/{}/branches-where-head",
            self.base_url, owner, repo, sha
        );
        self.get_json(&url).await
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let mut request = self.client.get(url);

        // Add authorization header if token is present
        if let Some(ref token) = self.token {
            request = request.header("Authorization", format!("Bearer {}", token));
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Github(format!("GitHub API request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::Github(format!(
                "GitHub API returned error: {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| Error::Github(format!("Failed to parse GitHub API response: {}", e)))
    }
}

/// PR head ref wins; otherwise the first branch whose head is the
/// commit.
fn select_branch(pr: Option<&GitHubPullRequest>, branches: Vec<GitHubBranch>) -> Option<String> {
    match pr {
        Some(pr) => Some(pr.head.head_ref.clone()),
        None => branches.into_iter().next().map(|b| b.name),
    }
}

/// Split an `owner/repo` full name, rejecting anything but exactly two
/// non-empty segments.
pub fn parse_repo_full_name(full_name: &str) -> Result<(String, String)> {
    let mut segments = full_name.split('/');
    match (segments.next(), segments.next(), segments.next()) {
        (Some(owner), Some(repo), None) if !owner.is_empty() && !repo.is_empty() => {
            Ok((owner.to_string(), repo.to_string()))
        }
        _ => Err(Error::Config(format!(
            "invalid repository full name: {}",
            full_name
        ))),
    }
}

/// Web base URL of the hosting service
pub fn server_url() -> String {
    std::env::var("GITHUB_SERVER_URL").unwrap_or_else(|_| "https://github.com".to_string())
}

/// Web URL of a commit
fn commit_url(server_url: &str, owner: &str, repo: &str, sha: &str) -> String {
    format!("{}/{}/{}/commit/{}", server_url, owner, repo, sha)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_github_client_creation() {
        let client = GitHubApiClient::new("https://api.github.com".to_string(), None);
        assert_eq!(client.base_url, "https://api.github.com");
        assert!(client.token.is_none());
    }

    #[test]
    fn test_github_client_with_token() {
        let client = GitHubApiClient::new(
            "https://api.github.com".to_string(),
            Some("test_token".to_string()),
        );
        assert_eq!(client.token, Some("test_token".to_string()));
    }

    #[test]
    fn test_github_client_debug_redacts_token() {
        let client = GitHubApiClient::new(
            "https://api.github.com".to_string(),
            Some("ghp_secret".to_string()),
        );
        let debug = format!("{:?}", client);
        assert!(!debug.contains("ghp_secret"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_parse_repo_full_name() {
        assert_eq!(
            parse_repo_full_name("acme/web").ok(),
            Some(("acme".to_string(), "web".to_string()))
        );
    }

    #[test]
    fn test_parse_repo_full_name_rejects_bad_shapes() {
        for bad in ["", "acme", "acme/", "/web", "acme/web/extra", "/"] {
            let err = parse_repo_full_name(bad).unwrap_err();
            assert_matches!(&err, Error::Config(msg) if msg.starts_with("invalid repository full name"));
        }
    }

    #[test]
    fn test_select_branch_prefers_pull_request_head() {
        let pr = GitHubPullRequest {
            number: 42,
            title: "Fix bug".to_string(),
            html_url: "https://github.com/acme/web/pull/42".to_string(),
            head: GitHubPullRequestHead {
                head_ref: "fix-bug".to_string(),
            },
        };
        let branches = vec![GitHubBranch {
            name: "main".to_string(),
        }];
        assert_eq!(
            select_branch(Some(&pr), branches),
            Some("fix-bug".to_string())
        );
    }

    #[test]
    fn test_select_branch_falls_back_to_head_branch() {
        let branches = vec![
            GitHubBranch {
                name: "feature-x".to_string(),
            },
            GitHubBranch {
                name: "mirror".to_string(),
            },
        ];
        assert_eq!(select_branch(None, branches), Some("feature-x".to_string()));
    }

    #[test]
    fn test_select_branch_none_when_nothing_matches() {
        assert_eq!(select_branch(None, Vec::new()), None);
    }

    #[test]
    fn test_commit_url() {
        assert_eq!(
            commit_url("https://github.com", "acme", "web", "abc123"),
            "https://github.com/acme/web/commit/abc123"
        );
    }

    #[test]
    fn test_pull_request_decoding() {
        let body = r#"[
            {
                "number": 42,
                "title": "Fix bug",
                "html_url": "https://github.com/acme/web/pull/42",
                "head": { "ref": "fix-bug", "sha": "abc123" },
                "state": "open"
            }
        ]"#;
        let prs: Vec<GitHubPullRequest> = serde_json::from_str(body).unwrap();
        assert_eq!(prs.len(), 1);
        assert_eq!(prs[0].number, 42);
        assert_eq!(prs[0].title, "Fix bug");
        assert_eq!(prs[0].head.head_ref, "fix-bug");
    }

    #[test]
    fn test_branch_decoding() {
        let body = r#"[
            { "name": "feature-x", "commit": { "sha": "abc123" }, "protected": false }
        ]"#;
        let branches: Vec<GitHubBranch> = serde_json::from_str(body).unwrap();
        assert_eq!(branches.len(), 1);
        assert_eq!(branches[0].name, "feature-x");
    }
}
