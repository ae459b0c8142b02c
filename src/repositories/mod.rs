//! Repository layer encapsulating database access
//!
//! Each repository wraps SeaORM operations for one table. Handlers never
//! touch entities directly; ownership scoping lives here.

pub mod agent;
pub mod identity;
pub mod model_config;
pub mod model_provider;
pub mod oauth_state;
pub mod session;
pub mod user;

pub use agent::{AgentInput, AgentRepository};
pub use identity::IdentityRepository;
pub use model_config::ModelConfigRepository;
pub use model_provider::ModelProviderRepository;
pub use oauth_state::OAuthStateRepository;
pub use session::SessionRepository;
pub use user::UserRepository;
