use serde::Deserialize;
use std::time::Duration;

/// Environment variable naming the optional TOML config file
pub const CONFIG_PATH_ENV: &str = "GROUPSYNC_CONFIG";
/// Environment variable holding the base64 token encryption key
pub const ENCRYPTION_KEY_ENV: &str = "GROUPSYNC_ENCRYPTION_KEY";

/// Complete groupsync configuration
///
/// The encryption key is not part of it; see [`ENCRYPTION_KEY_ENV`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

/// SQLite storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

fn default_db_path() -> String {
    "groupsync.db".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

/// Outbound GitHub/Jira calls
#[derive(Debug, Clone, Deserialize)]
pub struct ProvidersConfig {
    /// Upper bound for a single connection test (seconds)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_github_api_url")]
    pub github_api_url: String,
}

fn default_timeout_secs() -> u64 {
    5
}

fn default_github_api_url() -> String {
    "https://api.github.com".to_string()
}

impl ProvidersConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            github_api_url: default_github_api_url(),
        }
    }
}

/// Group access control
#[derive(Clone, Default, Deserialize)]
pub struct AuthConfig {
    /// When false every caller may manage every group
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub grants: Vec<GrantConfig>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("enabled", &self.enabled)
            .field("grants", &self.grants.len())
            .finish()
    }
}

/// One caller token and the groups it may manage (`"*"` for all)
#[derive(Clone, Deserialize)]
pub struct GrantConfig {
    pub token: String,
    #[serde(default)]
    pub groups: Vec<String>,
}

impl AppConfig {
    /// Override fields from `GROUPSYNC_*` environment variables.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Unparseable values are ignored and the current value kept.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("GROUPSYNC_BIND_ADDR") {
            self.server.bind_addr = v;
        }
        if let Some(v) = lookup("GROUPSYNC_DB_PATH") {
            self.storage.db_path = v;
        }
        if let Some(v) = lookup("GROUPSYNC_AUTH_ENABLED") {
            if let Ok(b) = v.parse::<bool>() {
                self.auth.enabled = b;
            }
        }
        if let Some(v) = lookup("GROUPSYNC_PROVIDER_TIMEOUT_SECS") {
            if let Ok(n) = v.parse::<u64>() {
                self.providers.timeout_secs = n;
            }
        }
        if let Some(v) = lookup("GROUPSYNC_GITHUB_API_URL") {
            self.providers.github_api_url = v;
        }
    }
}

/// Load configuration from TOML file
pub fn load_config(path: &str) -> anyhow::Result<AppConfig> {
    use anyhow::Context;

    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path))?;
    let config: AppConfig =
        toml::from_str(&contents).with_context(|| format!("Failed to parse config file {}", path))?;
    Ok(config)
}
