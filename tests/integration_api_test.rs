// Integration tests for the group integration API

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use groupsync::api::{create_integration_router, IntegrationAppState};
use groupsync::auth::{AllowAll, GrantTable, GroupAuthorizer};
use groupsync::config::GrantConfig;
use groupsync::credentials::{CipherKey, TokenCipher};
use groupsync::integration::{
    GitHubRepoInfo, IntegrationManager, IntegrationStore, JiraProjectInfo, ProviderApi,
};
use provider_clients::ClientError;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;

/// Answers like a healthy GitHub/Jira and remembers the tokens it was given.
#[derive(Default)]
struct RecordingProviders {
    tokens: Mutex<Vec<String>>,
    reject: bool,
}

#[async_trait]
impl ProviderApi for RecordingProviders {
    async fn fetch_github_repo(&self, repo_full_name: &str, token: &str) -> Result<GitHubRepoInfo, ClientError> {
        self.tokens.lock().unwrap().push(token.to_string());
        if self.reject {
            return Err(ClientError::Unauthorized { provider: "GitHub" });
        }
        Ok(GitHubRepoInfo {
            full_name: repo_full_name.to_string(),
            default_branch: "main".to_string(),
        })
    }

    async fn fetch_jira_project(
        &self,
        _base_url: &str,
        project_key: &str,
        _email: &str,
        token: &str,
    ) -> Result<JiraProjectInfo, ClientError> {
        self.tokens.lock().unwrap().push(token.to_string());
        if self.reject {
            return Err(ClientError::Forbidden {
                provider: "Jira",
                detail: "no browse permission".to_string(),
            });
        }
        Ok(JiraProjectInfo {
            key: project_key.to_string(),
            name: "Software Project".to_string(),
        })
    }
}

struct TestApp {
    router: Router,
    providers: Arc<RecordingProviders>,
}

fn create_test_app_with(authorizer: Arc<dyn GroupAuthorizer>, providers: RecordingProviders) -> TestApp {
    let key = CipherKey::from_base64(&BASE64.encode([7u8; 32])).unwrap();
    let cipher = Arc::new(TokenCipher::new(&key).unwrap());
    let store = Arc::new(IntegrationStore::new(":memory:").unwrap());
    let providers = Arc::new(providers);

    let manager = Arc::new(IntegrationManager::new(
        store,
        cipher,
        providers.clone(),
        Duration::from_secs(2),
    ));
    let router = create_integration_router(IntegrationAppState {
        manager,
        authorizer,
    });

    TestApp { router, providers }
}

fn create_test_app() -> TestApp {
    create_test_app_with(Arc::new(AllowAll), RecordingProviders::default())
}

async fn send(router: &Router, method: &str, uri: &str, body: Option<Value>, bearer: Option<&str>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = bearer {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn test_github_config_lifecycle() {
    let app = create_test_app();
    let uri = "/api/groups/100/github-config";

    let (status, body) = send(&app.router, "GET", uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], 404);

    let (status, body) = send(
        &app.router,
        "POST",
        uri,
        Some(json!({"repo_full_name": "octo/hello-world", "token": "ghp_aaaaaaaaaaaaaaaa1234"})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["repo_full_name"], "octo/hello-world");
    assert_eq!(body["has_token"], true);
    assert_eq!(body["token_masked"], "****1234");
    assert!(!body.to_string().contains("ghp_aaaaaaaaaaaaaaaa1234"));

    let (status, body) = send(
        &app.router,
        "POST",
        uri,
        Some(json!({"repo_full_name": "octo/new-repo"})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["repo_full_name"], "octo/new-repo");
    assert_eq!(body["token_masked"], "****1234");

    let (status, body) = send(
        &app.router,
        "POST",
        uri,
        Some(json!({"repo_full_name": "octo/new-repo", "token": "ghp_bbbbbbbbbbbbbbbb5678"})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_masked"], "****5678");

    let (status, body) = send(&app.router, "GET", uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["repo_full_name"], "octo/new-repo");
    assert_eq!(body["token_masked"], "****5678");
}

#[tokio::test]
async fn test_github_create_without_token_is_bad_request() {
    let app = create_test_app();

    let (status, body) = send(
        &app.router,
        "POST",
        "/api/groups/100/github-config",
        Some(json!({"repo_full_name": "octo/hello-world", "token": "  "})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], 400);
    assert!(body["error"].as_str().unwrap().contains("Token is required"));
}

#[tokio::test]
async fn test_github_invalid_repo_is_bad_request() {
    let app = create_test_app();

    let (status, body) = send(
        &app.router,
        "POST",
        "/api/groups/100/github-config",
        Some(json!({"repo_full_name": "not-a-repo", "token": "ghp_x"})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid repo_full_name format. Expected: owner/repo");
}

#[tokio::test]
async fn test_jira_config_lifecycle() {
    let app = create_test_app();
    let uri = "/api/groups/5/jira-config";

    let (status, body) = send(
        &app.router,
        "POST",
        uri,
        Some(json!({
            "base_url": "https://org.atlassian.net/",
            "project_key": "SWP",
            "jira_email": "dev@example.com",
            "token": "jira-token-abcd"
        })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["account_email"], "dev@example.com");
    assert_eq!(body["token_masked"], "****abcd");

    let (status, body) = send(&app.router, "GET", uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["project_key"], "SWP");
    assert_eq!(body["has_token"], true);

    let (status, body) = send(
        &app.router,
        "POST",
        uri,
        Some(json!({
            "base_url": "ftp://org.atlassian.net",
            "project_key": "SWP",
            "account_email": "dev@example.com"
        })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "base_url must use http or https scheme");
}

#[tokio::test]
async fn test_connection_endpoints() {
    let app = create_test_app();

    let (status, _) = send(&app.router, "POST", "/api/groups/100/github-config/test", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    send(
        &app.router,
        "POST",
        "/api/groups/100/github-config",
        Some(json!({"repo_full_name": "octo/hello-world", "token": "ghp_live_token"})),
        None,
    )
    .await;
    let (status, body) = send(&app.router, "POST", "/api/groups/100/github-config/test", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["repository"]["full_name"], "octo/hello-world");
    assert_eq!(body["repository"]["default_branch"], "main");

    send(
        &app.router,
        "POST",
        "/api/groups/100/jira-config",
        Some(json!({
            "base_url": "https://org.atlassian.net",
            "project_key": "SWP",
            "account_email": "dev@example.com",
            "token": "jira_live_token"
        })),
        None,
    )
    .await;
    let (status, body) = send(&app.router, "POST", "/api/groups/100/jira-config/test", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["project"]["key"], "SWP");

    assert_eq!(
        *app.providers.tokens.lock().unwrap(),
        vec!["ghp_live_token".to_string(), "jira_live_token".to_string()]
    );
}

#[tokio::test]
async fn test_connection_upstream_rejection() {
    let app = create_test_app_with(
        Arc::new(AllowAll),
        RecordingProviders {
            reject: true,
            ..Default::default()
        },
    );

    send(
        &app.router,
        "POST",
        "/api/groups/1/github-config",
        Some(json!({"repo_full_name": "octo/hello-world", "token": "ghp_rejected_token"})),
        None,
    )
    .await;
    let (status, body) = send(&app.router, "POST", "/api/groups/1/github-config/test", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(!body.to_string().contains("ghp_rejected_token"));

    send(
        &app.router,
        "POST",
        "/api/groups/1/jira-config",
        Some(json!({
            "base_url": "https://org.atlassian.net",
            "project_key": "SWP",
            "account_email": "dev@example.com",
            "token": "jira_rejected_token"
        })),
        None,
    )
    .await;
    let (status, body) = send(&app.router, "POST", "/api/groups/1/jira-config/test", None, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(!body.to_string().contains("jira_rejected_token"));
}

#[tokio::test]
async fn test_group_access_is_enforced() {
    let table = GrantTable::new(&[GrantConfig {
        token: "lecturer-a".to_string(),
        groups: vec!["100".to_string()],
    }]);
    let app = create_test_app_with(Arc::new(table), RecordingProviders::default());
    let body = json!({"repo_full_name": "octo/hello-world", "token": "ghp_x"});

    let (status, _) = send(&app.router, "POST", "/api/groups/100/github-config", Some(body.clone()), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app.router,
        "POST",
        "/api/groups/200/github-config",
        Some(body.clone()),
        Some("lecturer-a"),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app.router, "GET", "/api/groups/200/jira-config", None, Some("lecturer-a")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app.router,
        "POST",
        "/api/groups/100/github-config",
        Some(body),
        Some("lecturer-a"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["has_token"], true);
}

#[tokio::test]
async fn test_non_numeric_group_id_is_rejected() {
    let app = create_test_app();

    let (status, _) = send(&app.router, "GET", "/api/groups/abc/github-config", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_missing_or_null_required_fields_are_bad_request() {
    let app = create_test_app();

    let cases = [
        (
            "/api/groups/100/github-config",
            json!({"token": "ghp_aaaaaaaaaaaaaaaa1234"}),
            "repo_full_name must not be blank",
        ),
        (
            "/api/groups/100/github-config",
            json!({"repo_full_name": null, "token": "ghp_aaaaaaaaaaaaaaaa1234"}),
            "repo_full_name must not be blank",
        ),
        (
            "/api/groups/100/jira-config",
            json!({"base_url": "https://org.atlassian.net", "project_key": "SWP", "token": "t"}),
            "account_email must be a valid email address",
        ),
        (
            "/api/groups/100/jira-config",
            json!({"base_url": null, "project_key": "SWP", "account_email": "dev@example.com", "token": "t"}),
            "base_url must not be blank",
        ),
    ];

    for (uri, body, expected) in cases {
        let (status, response) = send(&app.router, "POST", uri, Some(body), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(response["status"], 400);
        assert_eq!(response["error"], expected);
    }
}

#[tokio::test]
async fn test_unreadable_body_is_bad_request_without_echoing_values() {
    let app = create_test_app();

    let request = Request::builder()
        .method("POST")
        .uri("/api/groups/100/github-config")
        .header("content-type", "application/json")
        .body(Body::from("{\"repo_full_name\": \"octo/hello-world\", \"token\": "))
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"], "Request body is not valid JSON");

    let (status, body) = send(
        &app.router,
        "POST",
        "/api/groups/100/github-config",
        Some(json!({"repo_full_name": "octo/hello-world", "token": 987654321})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Request body has a field of the wrong type");
    assert!(!body.to_string().contains("987654321"));
}

#[tokio::test]
async fn test_camel_case_request_bodies() {
    let app = create_test_app();

    let (status, body) = send(
        &app.router,
        "POST",
        "/api/groups/100/github-config",
        Some(json!({"repoFullName": "octo/hello-world", "token": "ghp_aaaaaaaaaaaaaaaa1234"})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["repo_full_name"], "octo/hello-world");

    let (status, body) = send(
        &app.router,
        "POST",
        "/api/groups/100/jira-config",
        Some(json!({
            "baseUrl": "https://org.atlassian.net",
            "projectKey": "SWP",
            "jiraEmail": "dev@example.com",
            "token": "jira-token-abcd"
        })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["project_key"], "SWP");
    assert_eq!(body["account_email"], "dev@example.com");
}

#[tokio::test]
async fn test_jira_project_key_with_path_characters_is_rejected() {
    let app = create_test_app();

    for key in ["SWP/../../x", "A?b"] {
        let (status, body) = send(
            &app.router,
            "POST",
            "/api/groups/100/jira-config",
            Some(json!({
                "base_url": "https://org.atlassian.net",
                "project_key": key,
                "account_email": "dev@example.com",
                "token": "t"
            })),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", key);
        assert!(body["error"].as_str().unwrap().starts_with("project_key may only contain"));
    }
}
