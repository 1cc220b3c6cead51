//! Caller identification and group-level authorization.
//!
//! The HTTP layer extracts the caller's bearer token and asks a
//! [`GroupAuthorizer`] whether that caller may manage a group's
//! integrations. The integration manager itself never checks access.

use crate::config::{AuthConfig, GrantConfig};
use axum::http::HeaderMap;
use std::collections::{HashMap, HashSet};
use std::fmt;
use thiserror::Error;


/// Decides whether a caller may read or change a group's integrations.
pub trait GroupAuthorizer: Send + Sync {
    /// `caller` is the bearer token of the request, if any.
    fn can_manage(&self, caller: Option<&str>, group_id: i64) -> bool;
}

/// Grants every caller access to every group. Used when auth is disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl GroupAuthorizer for AllowAll {
    fn can_manage(&self, _caller: Option<&str>, _group_id: i64) -> bool {
        true
    }
}

/// Static table of `bearer token → group ids`.
///
/// A grant whose group list contains `*` covers every group.
#[derive(Default)]
pub struct GrantTable {
    grants: HashMap<String, GroupScope>,
}

enum GroupScope {
    All,
    Groups(HashSet<i64>),
}

impl GrantTable {
    pub fn new(grants: &[GrantConfig]) -> Self {
        let mut table = HashMap::new();
        for grant in grants {
            let token = grant.token.trim();
            if token.is_empty() {
                continue;
            }
            let scope = if grant.groups.iter().any(|g| g == "*") {
                GroupScope::All
            } else {
                GroupScope::Groups(grant.groups.iter().filter_map(|g| g.parse().ok()).collect())
            };
            table.insert(token.to_string(), scope);
        }
        Self { grants: table }
    }
}

impl fmt::Debug for GrantTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GrantTable")
            .field("grants", &self.grants.len())
            .finish()
    }
}

impl GroupAuthorizer for GrantTable {
    fn can_manage(&self, caller: Option<&str>, group_id: i64) -> bool {
        let Some(caller) = caller else {
            return false;
        };
        match self.grants.get(caller) {
            Some(GroupScope::All) => true,
            Some(GroupScope::Groups(groups)) => groups.contains(&group_id),
            None => false,
        }
    }
}

/// Builds the authorizer described by `config`.
pub fn authorizer_from_config(config: &AuthConfig) -> Box<dyn GroupAuthorizer> {
    if config.enabled {
        Box::new(GrantTable::new(&config.grants))
    } else {
        Box::new(AllowAll)
    }
}

/// Extract bearer token from HTTP Authorization header
///
/// Expected format: "Authorization: Bearer <token>"
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<String, TokenError> {
    let auth_header = headers
        .get("authorization")
        .ok_or(TokenError::Missing)?
        .to_str()
        .map_err(|_| TokenError::InvalidFormat)?;

    parse_bearer_token(auth_header)
}

fn parse_bearer_token(header_value: &str) -> Result<String, TokenError> {
    let Some((scheme, token)) = header_value.split_once(' ') else {
        return Err(TokenError::InvalidFormat);
    };

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(TokenError::InvalidFormat);
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(TokenError::Empty);
    }

    Ok(token.to_string())
}

/// Token extraction errors
#[derive(Debug, Error, PartialEq, Clone)]
pub enum TokenError {
    #[error("Authorization token not provided")]
    Missing,
    /// Not "Bearer <token>"
    #[error("Invalid authorization token format")]
    InvalidFormat,
    #[error("Authorization token is empty")]
    Empty,
}
