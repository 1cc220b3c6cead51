use async_trait::async_trait;
use provider_clients::{ClientError, GitHubClient, GitHubRepo, JiraClient, JiraProject};
use std::time::Duration;

/// Outbound provider lookups used by connection tests.
///
/// Implementations receive the decrypted token and must not log it or
/// place it in an error.
#[async_trait]
pub trait ProviderApi: Send + Sync {
    async fn fetch_github_repo(&self, repo_full_name: &str, token: &str) -> Result<GitHubRepo, ClientError>;

    async fn fetch_jira_project(
        &self,
        base_url: &str,
        project_key: &str,
        email: &str,
        token: &str,
    ) -> Result<JiraProject, ClientError>;
}

/// [`ProviderApi`] backed by the real GitHub and Jira REST APIs.
pub struct HttpProviders {
    github: GitHubClient,
    jira: JiraClient,
}

impl HttpProviders {
    pub fn new(github_api_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        Ok(Self {
            github: GitHubClient::with_base_url(github_api_url.to_string(), timeout)?,
            jira: JiraClient::new(timeout)?,
        })
    }
}

#[async_trait]
impl ProviderApi for HttpProviders {
    async fn fetch_github_repo(&self, repo_full_name: &str, token: &str) -> Result<GitHubRepo, ClientError> {
        self.github.fetch_repo(repo_full_name, token).await
    }

    async fn fetch_jira_project(
        &self,
        base_url: &str,
        project_key: &str,
        email: &str,
        token: &str,
    ) -> Result<JiraProject, ClientError> {
        self.jira.fetch_project(base_url, project_key, email, token).await
    }
}
