//! Group integration API endpoints.
//!
//! Exposes the [`IntegrationManager`] under `/api/groups/:group_id/...`.
//! Each handler checks group access through the [`GroupAuthorizer`]
//! before touching the manager.

use crate::auth::{extract_bearer_token, GroupAuthorizer};
use crate::error::{IntegrationError, IntegrationResult};
use crate::integration::{
    GitHubConfigRequest, GitHubConfigResponse, GitHubRepoInfo, IntegrationManager,
    JiraConfigRequest, JiraConfigResponse, JiraProjectInfo,
};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::HeaderMap,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

#[cfg(test)]
mod tests;

/// Shared application state for the integration API
#[derive(Clone)]
pub struct IntegrationAppState {
    pub manager: Arc<IntegrationManager>,
    pub authorizer: Arc<dyn GroupAuthorizer>,
}

/// Response for POST /api/groups/:group_id/github-config/test
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct GitHubConnectionResponse {
    pub success: bool,
    pub repository: GitHubRepoInfo,
}

/// Response for POST /api/groups/:group_id/jira-config/test
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct JiraConnectionResponse {
    pub success: bool,
    pub project: JiraProjectInfo,
}

/// Create integration API router
pub fn create_integration_router(state: IntegrationAppState) -> Router {
    Router::new()
        .route(
            "/api/groups/:group_id/github-config",
            get(get_github_config).post(save_github_config),
        )
        .route(
            "/api/groups/:group_id/github-config/test",
            post(test_github_connection),
        )
        .route(
            "/api/groups/:group_id/jira-config",
            get(get_jira_config).post(save_jira_config),
        )
        .route(
            "/api/groups/:group_id/jira-config/test",
            post(test_jira_connection),
        )
        .with_state(Arc::new(state))
}

/// Rejects the request unless the caller may manage `group_id`.
fn authorize(state: &IntegrationAppState, headers: &HeaderMap, group_id: i64) -> IntegrationResult<()> {
    let caller = extract_bearer_token(headers).ok();
    if state.authorizer.can_manage(caller.as_deref(), group_id) {
        return Ok(());
    }

    warn!(group_id = group_id, has_caller = caller.is_some(), "Group access denied");
    Err(IntegrationError::Forbidden(format!(
        "Not allowed to manage integrations of group {}",
        group_id
    )))
}

/// POST /api/groups/:group_id/github-config - Create or update the GitHub config
async fn save_github_config(
    State(state): State<Arc<IntegrationAppState>>,
    headers: HeaderMap,
    Path(group_id): Path<i64>,
    body: Result<Json<GitHubConfigRequest>, JsonRejection>,
) -> IntegrationResult<Json<GitHubConfigResponse>> {
    authorize(&state, &headers, group_id)?;
    debug!(group_id = group_id, "Saving GitHub config");

    let Json(body) = body?;
    let config = state.manager.save_github(group_id, &body)?;
    Ok(Json(state.manager.github_response(&config)))
}

/// GET /api/groups/:group_id/github-config - Masked GitHub config
async fn get_github_config(
    State(state): State<Arc<IntegrationAppState>>,
    headers: HeaderMap,
    Path(group_id): Path<i64>,
) -> IntegrationResult<Json<GitHubConfigResponse>> {
    authorize(&state, &headers, group_id)?;
    Ok(Json(state.manager.github_config(group_id)?))
}

/// POST /api/groups/:group_id/github-config/test - Fetch the configured repository
async fn test_github_connection(
    State(state): State<Arc<IntegrationAppState>>,
    headers: HeaderMap,
    Path(group_id): Path<i64>,
) -> IntegrationResult<Json<GitHubConnectionResponse>> {
    authorize(&state, &headers, group_id)?;

    let repository = state.manager.test_github_connection(group_id).await?;
    Ok(Json(GitHubConnectionResponse {
        success: true,
        repository,
    }))
}

/// POST /api/groups/:group_id/jira-config - Create or update the Jira config
async fn save_jira_config(
    State(state): State<Arc<IntegrationAppState>>,
    headers: HeaderMap,
    Path(group_id): Path<i64>,
    body: Result<Json<JiraConfigRequest>, JsonRejection>,
) -> IntegrationResult<Json<JiraConfigResponse>> {
    authorize(&state, &headers, group_id)?;
    debug!(group_id = group_id, "Saving Jira config");

    let Json(body) = body?;
    let config = state.manager.save_jira(group_id, &body)?;
    Ok(Json(state.manager.jira_response(&config)))
}

/// GET /api/groups/:group_id/jira-config - Masked Jira config
async fn get_jira_config(
    State(state): State<Arc<IntegrationAppState>>,
    headers: HeaderMap,
    Path(group_id): Path<i64>,
) -> IntegrationResult<Json<JiraConfigResponse>> {
    authorize(&state, &headers, group_id)?;
    Ok(Json(state.manager.jira_config(group_id)?))
}

/// POST /api/groups/:group_id/jira-config/test - Fetch the configured project
async fn test_jira_connection(
    State(state): State<Arc<IntegrationAppState>>,
    headers: HeaderMap,
    Path(group_id): Path<i64>,
) -> IntegrationResult<Json<JiraConnectionResponse>> {
    authorize(&state, &headers, group_id)?;

    let project = state.manager.test_jira_connection(group_id).await?;
    Ok(Json(JiraConnectionResponse {
        success: true,
        project,
    }))
}
