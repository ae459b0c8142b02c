//! # Personas API Main Entry Point
//!
//! This is the main entry point for the Personas API service.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sea_orm_migration::MigratorTrait;

use personas::{
    config::ConfigLoader, db, migration::Migrator, seeds::seed_model_providers,
    server::run_server, telemetry,
};

#[derive(Parser)]
#[command(name = "personas", version, about = "Personas API service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run migrations, seed reference data, and start the HTTP server
    Serve,
    /// Apply pending database migrations and exit
    Migrate,
    /// Seed the model provider catalog and exit
    Seed,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_loader = ConfigLoader::new();
    let config = config_loader.load().context("loading configuration")?;
    config.validate().context("validating configuration")?;

    telemetry::init_tracing(&config).context("initializing telemetry")?;

    tracing::info!("Loaded configuration for profile: {}", config.profile);
    if let Ok(redacted_json) = config.redacted_json() {
        tracing::info!("Configuration: {}", redacted_json);
    }

    let pool = db::init_pool(&config)
        .await
        .context("initializing database connection pool")?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            Migrator::up(&pool, None)
                .await
                .context("applying migrations")?;
            seed_model_providers(&pool)
                .await
                .context("seeding model providers")?;
            run_server(config, pool).await
        }
        Command::Migrate => {
            Migrator::up(&pool, None)
                .await
                .context("applying migrations")?;
            tracing::info!("Migrations applied");
            Ok(())
        }
        Command::Seed => {
            seed_model_providers(&pool)
                .await
                .context("seeding model providers")?;
            Ok(())
        }
    }
}
