//! HTTP clients for the external providers a group can integrate with.
//!
//! Each client performs a single read-only lookup used to verify that a
//! stored configuration actually works:
//!
//! ```text
//! ┌──────────────────────┐        ┌──────────────────────────────┐
//! │ GitHubClient         │  GET   │ /repos/{owner}/{repo}        │
//! │  bearer token        │ ─────▶ │ → full_name, default_branch  │
//! └──────────────────────┘        └──────────────────────────────┘
//! ┌──────────────────────┐        ┌──────────────────────────────┐
//! │ JiraClient           │  GET   │ /rest/api/3/project/{key}    │
//! │  basic email:token   │ ─────▶ │ → key, name                  │
//! └──────────────────────┘        └──────────────────────────────┘
//! ```
//!
//! Non-2xx responses are classified into [`ClientError`] variants. Error
//! messages never contain the token used for the request.

mod error;
pub mod github;
pub mod jira;

pub use error::{ClientError, TransportError};
pub use github::{GitHubClient, GitHubRepo};
pub use jira::{JiraClient, JiraProject};
