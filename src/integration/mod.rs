//! Per-group integration configuration (GitHub, Jira).
//!
//! One [`IntegrationConfig`] row exists per `(group_id, provider)` pair. The
//! provider token is only ever held as ciphertext in `token_encrypted`;
//! responses expose a masked form computed by [`IntegrationManager`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

mod manager;
mod providers;
mod store;
pub mod validation;

pub use manager::{IntegrationManager, TokenDisplay, UNREADABLE_TOKEN_MASK};
pub use providers::{HttpProviders, ProviderApi};
pub use store::{is_unique_violation, IntegrationStore, NewIntegrationConfig};

/// External integration target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    Github,
    Jira,
}

impl ProviderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderType::Github => "github",
            ProviderType::Jira => "jira",
        }
    }

    /// Human-readable name used in messages.
    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderType::Github => "GitHub",
            ProviderType::Jira => "Jira",
        }
    }
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "github" => Ok(ProviderType::Github),
            "jira" => Ok(ProviderType::Jira),
            other => Err(format!("unknown provider type '{}'", other)),
        }
    }
}

/// Stored integration settings for one group and provider.
///
/// `token_encrypted` holds the base64 ciphertext blob; `None` only before
/// the first successful create.
#[derive(Clone, PartialEq)]
pub struct IntegrationConfig {
    pub id: i64,
    pub group_id: i64,
    pub provider: ProviderType,

    /// GitHub: `owner/repo`
    pub repo_full_name: Option<String>,

    /// Jira instance URL
    pub base_url: Option<String>,
    pub project_key: Option<String>,
    pub account_email: Option<String>,

    pub token_encrypted: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl IntegrationConfig {
    /// True if a non-empty ciphertext is stored.
    pub fn has_token(&self) -> bool {
        self.token_encrypted
            .as_deref()
            .is_some_and(|blob| !blob.is_empty())
    }
}

// Manual impl keeps ciphertext out of debug logs.
impl fmt::Debug for IntegrationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntegrationConfig")
            .field("id", &self.id)
            .field("group_id", &self.group_id)
            .field("provider", &self.provider)
            .field("repo_full_name", &self.repo_full_name)
            .field("base_url", &self.base_url)
            .field("project_key", &self.project_key)
            .field("account_email", &self.account_email)
            .field("has_token", &self.has_token())
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

/// Request body for saving a GitHub configuration.
///
/// `token` is required on create and optional on update. A missing or null
/// `repo_full_name` reads as empty and is rejected by validation.
#[derive(Clone, Deserialize)]
pub struct GitHubConfigRequest {
    #[serde(default, deserialize_with = "null_as_empty", alias = "repoFullName")]
    pub repo_full_name: String,
    #[serde(default)]
    pub token: Option<String>,
}

/// Request body for saving a Jira configuration.
#[derive(Clone, Deserialize)]
pub struct JiraConfigRequest {
    #[serde(default, deserialize_with = "null_as_empty", alias = "baseUrl")]
    pub base_url: String,
    #[serde(default, deserialize_with = "null_as_empty", alias = "projectKey")]
    pub project_key: String,
    #[serde(
        default,
        deserialize_with = "null_as_empty",
        alias = "jira_email",
        alias = "jiraEmail",
        alias = "accountEmail"
    )]
    pub account_email: String,
    #[serde(default)]
    pub token: Option<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl fmt::Debug for GitHubConfigRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitHubConfigRequest")
            .field("repo_full_name", &self.repo_full_name)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl fmt::Debug for JiraConfigRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JiraConfigRequest")
            .field("base_url", &self.base_url)
            .field("project_key", &self.project_key)
            .field("account_email", &self.account_email)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// GitHub configuration as shown to callers. Never carries the raw token.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct GitHubConfigResponse {
    pub repo_full_name: Option<String>,
    pub has_token: bool,
    pub token_masked: Option<String>,
}

/// Jira configuration as shown to callers. Never carries the raw token.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct JiraConfigResponse {
    pub base_url: Option<String>,
    pub project_key: Option<String>,
    pub account_email: Option<String>,
    pub has_token: bool,
    pub token_masked: Option<String>,
}

pub use provider_clients::{GitHubRepo as GitHubRepoInfo, JiraProject as JiraProjectInfo};
