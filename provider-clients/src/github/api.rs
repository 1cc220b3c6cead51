use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::config::{ACCEPT, API_VERSION, USER_AGENT};
use crate::error::{classify_status, ClientError};

const PROVIDER: &str = "GitHub";

/// Repository summary returned by `GET /repos/{owner}/{repo}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GitHubRepo {
    pub full_name: String,
    pub default_branch: String,
}

/// HTTP client for the GitHub REST API.
///
/// The token is supplied per call so one client can serve every group.
pub struct GitHubClient {
    http_client: Client,
    base_url: String,
}

impl GitHubClient {
    /// Create a client with a custom base URL (GitHub Enterprise or a mock server).
    pub fn with_base_url(base_url: String, timeout: Duration) -> Result<Self, ClientError> {
        let http_client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::transport(PROVIDER, &e))?;
        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Fetch metadata for `owner/repo` using `token` as bearer credential.
    pub async fn fetch_repo(&self, repo_full_name: &str, token: &str) -> Result<GitHubRepo, ClientError> {
        let url = format!("{}/repos/{}", self.base_url, repo_full_name);
        debug!(repo = %repo_full_name, "Fetching GitHub repository");

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(token)
            .header(reqwest::header::ACCEPT, ACCEPT)
            .header("X-GitHub-Api-Version", API_VERSION)
            .send()
            .await
            .map_err(|e| ClientError::transport(PROVIDER, &e))?;

        classify_status(PROVIDER, response.status(), repo_full_name)?;
        response
            .json::<GitHubRepo>()
            .await
            .map_err(|_| ClientError::Decode { provider: PROVIDER })
    }
}
