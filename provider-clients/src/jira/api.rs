use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{classify_status, ClientError};

const PROVIDER: &str = "Jira";

/// Project summary returned by `GET /rest/api/3/project/{key}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JiraProject {
    pub key: String,
    pub name: String,
}

/// HTTP client for the Jira Cloud REST API (v3).
///
/// Jira instances live on per-organisation hosts, so the base URL is passed
/// with each call rather than fixed at construction.
pub struct JiraClient {
    http_client: Client,
}

impl JiraClient {
    pub fn new(timeout: Duration) -> Result<Self, ClientError> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::transport(PROVIDER, &e))?;
        Ok(Self { http_client })
    }

    /// Fetch project `project_key` from the Jira instance at `base_url`,
    /// authenticating with HTTP Basic `email:token`.
    pub async fn fetch_project(
        &self,
        base_url: &str,
        project_key: &str,
        email: &str,
        token: &str,
    ) -> Result<JiraProject, ClientError> {
        let url = project_url(base_url, project_key)?;
        debug!(project_key = %project_key, "Fetching Jira project");

        let response = self
            .http_client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .header(reqwest::header::AUTHORIZATION, basic_auth(email, token))
            .send()
            .await
            .map_err(|e| ClientError::transport(PROVIDER, &e))?;

        classify_status(
            PROVIDER,
            response.status(),
            &format!("projectKey={}", project_key),
        )?;
        response
            .json::<JiraProject>()
            .await
            .map_err(|_| ClientError::Decode { provider: PROVIDER })
    }
}

/// Strip surrounding whitespace and trailing slashes so paths don't end up as `//rest/...`.
fn normalize_base_url(base_url: &str) -> &str {
    base_url.trim().trim_end_matches('/')
}

/// `{base}/rest/api/3/project/{key}` with the key percent-encoded as a
/// single path segment.
fn project_url(base_url: &str, project_key: &str) -> Result<Url, ClientError> {
    let invalid = || ClientError::InvalidUrl { provider: PROVIDER };

    let mut url = Url::parse(normalize_base_url(base_url)).map_err(|_| invalid())?;
    url.path_segments_mut()
        .map_err(|_| invalid())?
        .pop_if_empty()
        .extend(["rest", "api", "3", "project", project_key]);
    Ok(url)
}

fn basic_auth(email: &str, token: &str) -> String {
    format!("Basic {}", BASE64.encode(format!("{}:{}", email, token)))
}
