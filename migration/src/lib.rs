//! Database migrations for the Personas API.
//!
//! This module contains all database migrations using SeaORM Migration.

pub use sea_orm_migration::prelude::*;

mod m2025_01_10_000001_create_users;
mod m2025_01_10_000002_create_identities;
mod m2025_01_10_000003_create_sessions;
mod m2025_01_10_000004_create_oauth_states;
mod m2025_01_10_000005_create_model_providers;
mod m2025_01_10_000006_create_user_model_configs;
mod m2025_01_10_000007_create_agents;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2025_01_10_000001_create_users::Migration),
            Box::new(m2025_01_10_000002_create_identities::Migration),
            Box::new(m2025_01_10_000003_create_sessions::Migration),
            Box::new(m2025_01_10_000004_create_oauth_states::Migration),
            Box::new(m2025_01_10_000005_create_model_providers::Migration),
            Box::new(m2025_01_10_000006_create_user_model_configs::Migration),
            Box::new(m2025_01_10_000007_create_agents::Migration),
        ]
    }
}
