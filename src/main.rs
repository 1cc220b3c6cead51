use anyhow::{Context, Result};
use groupsync::api::{create_integration_router, IntegrationAppState};
use groupsync::auth::authorizer_from_config;
use groupsync::config::{load_config, AppConfig, CONFIG_PATH_ENV, ENCRYPTION_KEY_ENV};
use groupsync::credentials::{CipherKey, TokenCipher};
use groupsync::integration::{HttpProviders, IntegrationManager, IntegrationStore};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "groupsync=info".into()),
        )
        .init();

    info!("groupsync starting...");

    let mut config = match std::env::var(CONFIG_PATH_ENV) {
        Ok(path) => load_config(&path)?,
        Err(_) => AppConfig::default(),
    };
    config.apply_env();

    info!(
        bind_addr = %config.server.bind_addr,
        db_path = %config.storage.db_path,
        auth_enabled = config.auth.enabled,
        provider_timeout_secs = config.providers.timeout_secs,
        "Configuration loaded"
    );
    if config.auth.enabled && config.auth.grants.is_empty() {
        warn!("Auth is enabled but no grants are configured; every request will be rejected");
    }

    // Key is read once and held for the process lifetime
    let encoded_key = std::env::var(ENCRYPTION_KEY_ENV).with_context(|| {
        format!(
            "{} is required (base64-encoded 16, 24 or 32 byte key)",
            ENCRYPTION_KEY_ENV
        )
    })?;
    let key = CipherKey::from_base64(&encoded_key)
        .with_context(|| format!("{} is not a usable key", ENCRYPTION_KEY_ENV))?;
    let cipher = Arc::new(TokenCipher::new(&key).context("Failed to initialize token cipher")?);
    info!("Token cipher initialized");

    let store = Arc::new(
        IntegrationStore::new(&config.storage.db_path)
            .context("Failed to initialize integration store")?,
    );
    info!("Integration store initialized");

    let providers = Arc::new(
        HttpProviders::new(&config.providers.github_api_url, config.providers.timeout())
            .context("Failed to build provider HTTP clients")?,
    );

    let manager = Arc::new(IntegrationManager::new(
        store,
        cipher,
        providers,
        config.providers.timeout(),
    ));

    let state = IntegrationAppState {
        manager,
        authorizer: Arc::from(authorizer_from_config(&config.auth)),
    };
    let router = create_integration_router(state).layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind_addr))?;
    info!(addr = %config.server.bind_addr, "Integration API listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Integration API server error")?;

    info!("groupsync stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for ctrl_c signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
