// HTTP API
pub mod api;

// Caller identification and group access checks
pub mod auth;

// File and environment configuration
pub mod config;

// Token encryption and masking
pub mod credentials;

// Error types shared by the manager and the HTTP layer
pub mod error;

// Per-group GitHub/Jira integration configs
pub mod integration;
