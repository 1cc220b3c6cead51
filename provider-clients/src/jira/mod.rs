pub mod api;

pub use api::{JiraClient, JiraProject};
