//! Unit tests for the integration API

use super::*;
use crate::auth::{AllowAll, GrantTable};
use crate::config::GrantConfig;
use crate::credentials::{CipherKey, TokenCipher};
use crate::integration::{HttpProviders, IntegrationStore};
use std::time::Duration;

fn state_with(authorizer: Arc<dyn GroupAuthorizer>) -> IntegrationAppState {
    let store = Arc::new(IntegrationStore::new(":memory:").unwrap());
    let cipher = Arc::new(TokenCipher::new(&CipherKey::from_bytes(&[3u8; 16]).unwrap()).unwrap());
    let providers =
        Arc::new(HttpProviders::new("http://127.0.0.1:9", Duration::from_secs(1)).unwrap());
    let manager = Arc::new(IntegrationManager::new(
        store,
        cipher,
        providers,
        Duration::from_secs(1),
    ));
    IntegrationAppState {
        manager,
        authorizer,
    }
}

fn bearer(token: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("authorization", format!("Bearer {}", token).parse().unwrap());
    headers
}

#[test]
fn test_authorize_allow_all() {
    let state = state_with(Arc::new(AllowAll));
    assert!(authorize(&state, &HeaderMap::new(), 100).is_ok());
}

#[test]
fn test_authorize_grant_table() {
    let table = GrantTable::new(&[GrantConfig {
        token: "lecturer-a".to_string(),
        groups: vec!["100".to_string()],
    }]);
    let state = state_with(Arc::new(table));

    assert!(authorize(&state, &bearer("lecturer-a"), 100).is_ok());

    let err = authorize(&state, &bearer("lecturer-a"), 200).unwrap_err();
    assert!(matches!(err, IntegrationError::Forbidden(_)));
    assert_eq!(err.status_code().as_u16(), 403);
    assert!(!err.to_string().contains("lecturer-a"));

    assert!(authorize(&state, &HeaderMap::new(), 100).is_err());
}

#[test]
fn test_github_connection_response_serialization() {
    let response = GitHubConnectionResponse {
        success: true,
        repository: GitHubRepoInfo {
            full_name: "octo/hello-world".to_string(),
            default_branch: "main".to_string(),
        },
    };

    let json = serde_json::to_string(&response).unwrap();
    assert!(json.contains("\"success\":true"));
    assert!(json.contains("\"full_name\":\"octo/hello-world\""));
    assert!(json.contains("\"default_branch\":\"main\""));
}

#[test]
fn test_jira_connection_response_serialization() {
    let response = JiraConnectionResponse {
        success: true,
        project: JiraProjectInfo {
            key: "SWP".to_string(),
            name: "Software Project".to_string(),
        },
    };

    let json = serde_json::to_string(&response).unwrap();
    assert!(json.contains("\"project\":{"));
    assert!(json.contains("\"key\":\"SWP\""));
}

#[test]
fn test_config_response_serialization() {
    let response = GitHubConfigResponse {
        repo_full_name: Some("octo/hello-world".to_string()),
        has_token: false,
        token_masked: None,
    };

    let json = serde_json::to_string(&response).unwrap();
    assert!(json.contains("\"has_token\":false"));
    assert!(json.contains("\"token_masked\":null"));
}
