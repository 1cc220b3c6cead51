// HTTP API

pub mod integrations;

pub use integrations::{create_integration_router, IntegrationAppState};
