use super::providers::ProviderApi;
use super::store::{is_unique_violation, IntegrationStore, NewIntegrationConfig};
use super::validation::{
    supplied_token, validate_base_url, validate_email, validate_project_key,
    validate_repo_full_name,
};
use super::{
    GitHubConfigRequest, GitHubConfigResponse, GitHubRepoInfo, IntegrationConfig,
    JiraConfigRequest, JiraConfigResponse, JiraProjectInfo, ProviderType,
};
use crate::credentials::{mask_token, TokenCipher};
use crate::error::{IntegrationError, IntegrationResult};
use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};


/// Shown in place of a token whose ciphertext cannot be decrypted
pub const UNREADABLE_TOKEN_MASK: &str = "********";

/// Outcome of rendering a stored token for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenDisplay {
    /// Nothing stored.
    Absent,
    /// Decrypted and masked, e.g. `"****1234"`.
    Masked(String),
    /// Stored but could not be decrypted (corrupt blob or rotated key).
    Unreadable,
}

impl TokenDisplay {
    pub fn has_token(&self) -> bool {
        !matches!(self, TokenDisplay::Absent)
    }

    /// Value for the `token_masked` response field.
    pub fn into_masked(self) -> Option<String> {
        match self {
            TokenDisplay::Absent => None,
            TokenDisplay::Masked(masked) => Some(masked),
            TokenDisplay::Unreadable => Some(UNREADABLE_TOKEN_MASK.to_string()),
        }
    }
}

/// Provider-specific columns written by a save.
#[derive(Default)]
struct ProviderFields {
    repo_full_name: Option<String>,
    base_url: Option<String>,
    project_key: Option<String>,
    account_email: Option<String>,
}

/// Validates, upserts and presents per-group integration configs.
///
/// The only component that encrypts or decrypts provider tokens. It
/// performs no authorization; callers check group access first.
pub struct IntegrationManager {
    store: Arc<IntegrationStore>,
    cipher: Arc<TokenCipher>,
    providers: Arc<dyn ProviderApi>,
    provider_timeout: Duration,
}

impl IntegrationManager {
    pub fn new(
        store: Arc<IntegrationStore>,
        cipher: Arc<TokenCipher>,
        providers: Arc<dyn ProviderApi>,
        provider_timeout: Duration,
    ) -> Self {
        Self {
            store,
            cipher,
            providers,
            provider_timeout,
        }
    }

    /// Creates or updates the GitHub config of `group_id`.
    ///
    /// The token is mandatory when no config exists yet. On update an
    /// absent or blank token keeps the stored ciphertext untouched.
    pub fn save_github(
        &self,
        group_id: i64,
        request: &GitHubConfigRequest,
    ) -> IntegrationResult<IntegrationConfig> {
        validate_repo_full_name(&request.repo_full_name)?;

        let fields = ProviderFields {
            repo_full_name: Some(request.repo_full_name.clone()),
            ..Default::default()
        };
        self.upsert(group_id, ProviderType::Github, fields, request.token.as_deref())
    }

    /// Creates or updates the Jira config of `group_id`.
    pub fn save_jira(
        &self,
        group_id: i64,
        request: &JiraConfigRequest,
    ) -> IntegrationResult<IntegrationConfig> {
        validate_base_url(&request.base_url)?;
        validate_project_key(&request.project_key)?;
        validate_email(&request.account_email)?;

        let fields = ProviderFields {
            base_url: Some(request.base_url.trim().to_string()),
            project_key: Some(request.project_key.trim().to_string()),
            account_email: Some(request.account_email.clone()),
            ..Default::default()
        };
        self.upsert(group_id, ProviderType::Jira, fields, request.token.as_deref())
    }

    fn upsert(
        &self,
        group_id: i64,
        provider: ProviderType,
        fields: ProviderFields,
        token: Option<&str>,
    ) -> IntegrationResult<IntegrationConfig> {
        let token = supplied_token(token);
        let now = Utc::now();

        match self.store.find(group_id, provider)? {
            Some(mut config) => {
                config.repo_full_name = fields.repo_full_name;
                config.base_url = fields.base_url;
                config.project_key = fields.project_key;
                config.account_email = fields.account_email;
                if let Some(token) = token {
                    config.token_encrypted = Some(self.encrypt(token)?);
                }
                config.updated_at = now;

                self.store.update(&config)?;
                info!(
                    group_id = group_id,
                    provider = %provider,
                    token_replaced = token.is_some(),
                    "Updated integration config"
                );
                Ok(config)
            }
            None => {
                let token = token.ok_or_else(|| {
                    IntegrationError::validation(format!(
                        "Token is required when creating a new {} integration configuration",
                        provider.display_name()
                    ))
                })?;

                let new = NewIntegrationConfig {
                    group_id,
                    provider,
                    repo_full_name: fields.repo_full_name,
                    base_url: fields.base_url,
                    project_key: fields.project_key,
                    account_email: fields.account_email,
                    token_encrypted: Some(self.encrypt(token)?),
                    created_at: now,
                    updated_at: now,
                };

                let config = self
                    .store
                    .insert(&new)
                    .map_err(|e| insert_error(e, group_id, provider))?;

                info!(group_id = group_id, provider = %provider, id = config.id, "Created integration config");
                Ok(config)
            }
        }
    }

    fn encrypt(&self, token: &str) -> IntegrationResult<String> {
        self.cipher
            .encrypt_to_text(token)
            .map_err(|_| IntegrationError::internal("Failed to encrypt token"))
    }

    /// Renders the stored token for display without ever failing.
    pub fn token_display(&self, config: &IntegrationConfig) -> TokenDisplay {
        let Some(blob) = config.token_encrypted.as_deref().filter(|b| !b.is_empty()) else {
            return TokenDisplay::Absent;
        };

        match self.cipher.decrypt_text(blob) {
            Ok(token) => TokenDisplay::Masked(mask_token(&token)),
            Err(e) => {
                warn!(
                    group_id = config.group_id,
                    provider = %config.provider,
                    error = %e,
                    "Stored token could not be decrypted for display"
                );
                TokenDisplay::Unreadable
            }
        }
    }

    pub fn github_response(&self, config: &IntegrationConfig) -> GitHubConfigResponse {
        let display = self.token_display(config);
        GitHubConfigResponse {
            repo_full_name: config.repo_full_name.clone(),
            has_token: display.has_token(),
            token_masked: display.into_masked(),
        }
    }

    pub fn jira_response(&self, config: &IntegrationConfig) -> JiraConfigResponse {
        let display = self.token_display(config);
        JiraConfigResponse {
            base_url: config.base_url.clone(),
            project_key: config.project_key.clone(),
            account_email: config.account_email.clone(),
            has_token: display.has_token(),
            token_masked: display.into_masked(),
        }
    }

    /// Display form of the GitHub config of `group_id`.
    pub fn github_config(&self, group_id: i64) -> IntegrationResult<GitHubConfigResponse> {
        let config = self.load(group_id, ProviderType::Github)?;
        Ok(self.github_response(&config))
    }

    /// Display form of the Jira config of `group_id`.
    pub fn jira_config(&self, group_id: i64) -> IntegrationResult<JiraConfigResponse> {
        let config = self.load(group_id, ProviderType::Jira)?;
        Ok(self.jira_response(&config))
    }

    /// Verifies the stored GitHub config by fetching the repository.
    pub async fn test_github_connection(&self, group_id: i64) -> IntegrationResult<GitHubRepoInfo> {
        let config = self.load(group_id, ProviderType::Github)?;

        ensure_token(&config)?;
        let repo_full_name = required(&config.repo_full_name, "GitHub repo_full_name")?;
        let token = self.reveal_token(&config)?;

        debug!(group_id = group_id, repo = %repo_full_name, "Testing GitHub connection");
        let repo = self
            .call_provider(
                ProviderType::Github,
                self.providers.fetch_github_repo(repo_full_name, &token),
            )
            .await?;

        info!(group_id = group_id, repo = %repo.full_name, "GitHub connection verified");
        Ok(repo)
    }

    /// Verifies the stored Jira config by fetching the project.
    pub async fn test_jira_connection(&self, group_id: i64) -> IntegrationResult<JiraProjectInfo> {
        let config = self.load(group_id, ProviderType::Jira)?;

        ensure_token(&config)?;
        let base_url = required(&config.base_url, "Jira base_url")?;
        let project_key = required(&config.project_key, "Jira project_key")?;
        let email = required(&config.account_email, "Jira account_email")?;
        let token = self.reveal_token(&config)?;

        debug!(group_id = group_id, project_key = %project_key, "Testing Jira connection");
        let project = self
            .call_provider(
                ProviderType::Jira,
                self.providers
                    .fetch_jira_project(base_url, project_key, email, &token),
            )
            .await?;

        info!(group_id = group_id, project_key = %project.key, "Jira connection verified");
        Ok(project)
    }

    fn load(&self, group_id: i64, provider: ProviderType) -> IntegrationResult<IntegrationConfig> {
        self.store.find(group_id, provider)?.ok_or_else(|| {
            IntegrationError::NotFound(format!(
                "{} integration configuration not found for group: {}",
                provider.display_name(),
                group_id
            ))
        })
    }

    /// Decrypts the stored token for an outbound call. Failure is fatal here.
    fn reveal_token(&self, config: &IntegrationConfig) -> IntegrationResult<String> {
        let provider = config.provider.display_name();
        let blob = ensure_token(config)?;

        self.cipher.decrypt_text(blob).map_err(|_| {
            warn!(group_id = config.group_id, provider = %config.provider, "Stored token could not be decrypted");
            IntegrationError::internal(format!("Failed to decrypt {} token", provider))
        })
    }

    async fn call_provider<T, F>(&self, provider: ProviderType, call: F) -> IntegrationResult<T>
    where
        F: Future<Output = Result<T, provider_clients::ClientError>>,
    {
        let result = tokio::time::timeout(self.provider_timeout, call)
            .await
            .map_err(|_| {
                warn!(provider = %provider, timeout_ms = self.provider_timeout.as_millis() as u64, "Provider call timed out");
                IntegrationError::UpstreamTimeout(provider.display_name())
            })?;

        result.map_err(|e| {
            warn!(provider = %provider, error = %e, "Provider call failed");
            IntegrationError::from(e)
        })
    }
}

/// A UNIQUE violation means another request created the row between our
/// lookup and insert.
fn insert_error(err: anyhow::Error, group_id: i64, provider: ProviderType) -> IntegrationError {
    if !is_unique_violation(&err) {
        return IntegrationError::Storage(err);
    }

    warn!(group_id = group_id, provider = %provider, "Concurrent create lost the race");
    IntegrationError::Conflict(format!(
        "{} integration configuration for group {} was created concurrently; retry the request",
        provider.display_name(),
        group_id
    ))
}

fn ensure_token(config: &IntegrationConfig) -> IntegrationResult<&str> {
    config
        .token_encrypted
        .as_deref()
        .filter(|blob| !blob.is_empty())
        .ok_or_else(|| {
            IntegrationError::validation(format!(
                "{} token is missing in configuration",
                config.provider.display_name()
            ))
        })
}

fn required<'a>(value: &'a Option<String>, field: &str) -> IntegrationResult<&'a str> {
    value
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| IntegrationError::validation(format!("{} is missing in configuration", field)))
}
