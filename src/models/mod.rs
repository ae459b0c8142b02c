//! # Data Models
//!
//! This module contains all the data models used throughout the Personas API.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod agent;
pub mod identity;
pub mod model_config;
pub mod model_provider;
pub mod oauth_state;
pub mod session;
pub mod user;

pub use agent::Entity as Agent;
pub use identity::Entity as Identity;
pub use model_config::Entity as ModelConfig;
pub use model_provider::Entity as ModelProvider;
pub use oauth_state::Entity as OAuthState;
pub use session::Entity as Session;
pub use user::Entity as User;

/// Basic service information response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    /// The name of the service
    pub service: String,
    /// The version of the service
    pub version: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            service: "personas".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
