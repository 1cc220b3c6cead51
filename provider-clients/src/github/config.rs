//! GitHub REST API request constants.

pub const ACCEPT: &str = "application/vnd.github+json";
pub const API_VERSION: &str = "2022-11-28";
pub const USER_AGENT: &str = "groupsync/0.1";
