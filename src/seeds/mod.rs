//! Database seeding
//!
//! Seeds reference data required for the service to be usable, currently
//! the model provider catalog.

pub mod provider;

pub use provider::seed_model_providers;
