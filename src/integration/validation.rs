//! Input validation for integration settings.
//!
//! Every check runs before any crypto or persistence call and fails with
//! [`IntegrationError::Validation`] (400).

use crate::error::{IntegrationError, IntegrationResult};
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

static REPO_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9._-]+/[A-Za-z0-9._-]+$").expect("valid regex"));

static PROJECT_KEY_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").expect("valid regex"));

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").expect("valid regex")
});

/// `owner/repo`, each segment made of alphanumerics and `-._`.
pub fn validate_repo_full_name(repo_full_name: &str) -> IntegrationResult<()> {
    if repo_full_name.trim().is_empty() {
        return Err(IntegrationError::validation("repo_full_name must not be blank"));
    }

    let invalid = || IntegrationError::validation("Invalid repo_full_name format. Expected: owner/repo");

    if !REPO_PATTERN.is_match(repo_full_name) {
        return Err(invalid());
    }
    // "." and ".." would be collapsed into a different API path
    if repo_full_name.split('/').any(|seg| seg.chars().all(|c| c == '.')) {
        return Err(invalid());
    }
    Ok(())
}

/// Absolute http/https URL with a non-blank host.
pub fn validate_base_url(base_url: &str) -> IntegrationResult<()> {
    if base_url.trim().is_empty() {
        return Err(IntegrationError::validation("base_url must not be blank"));
    }

    let url = Url::parse(base_url.trim())
        .map_err(|_| IntegrationError::validation("base_url is not a valid URL"))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(IntegrationError::validation(
            "base_url must use http or https scheme",
        ));
    }

    match url.host_str() {
        Some(host) if !host.trim().is_empty() => Ok(()),
        _ => Err(IntegrationError::validation(
            "base_url must contain a valid host",
        )),
    }
}

/// Jira project key: a letter followed by letters, digits or `_`.
pub fn validate_project_key(project_key: &str) -> IntegrationResult<()> {
    let key = project_key.trim();
    if key.is_empty() {
        return Err(IntegrationError::validation("project_key must not be blank"));
    }
    if !PROJECT_KEY_PATTERN.is_match(key) {
        return Err(IntegrationError::validation(
            "project_key may only contain letters, digits and underscores, starting with a letter",
        ));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> IntegrationResult<()> {
    if !EMAIL_PATTERN.is_match(email) {
        return Err(IntegrationError::validation(
            "account_email must be a valid email address",
        ));
    }
    Ok(())
}

/// Returns the token if one was actually supplied (non-blank).
pub fn supplied_token(token: Option<&str>) -> Option<&str> {
    token.filter(|t| !t.trim().is_empty())
}
