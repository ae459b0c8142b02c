//! Database pool setup and the readiness probe.

use anyhow::{Context, Result};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::time::Duration;
use tokio::time::sleep;

use crate::config::AppConfig;

const CONNECT_ATTEMPTS: u32 = 5;
const INITIAL_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Errors raised while opening the connection pool.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("database URL must not be empty")]
    MissingUrl,
    #[error("failed to connect to database after {attempts} attempts: {source}")]
    Connect {
        attempts: u32,
        source: sea_orm::DbErr,
    },
}

/// Opens the SeaORM connection pool described by the configuration.
///
/// Transient connect failures are retried with exponential backoff so the
/// service survives a database that comes up slightly after it does.
pub async fn init_pool(cfg: &AppConfig) -> Result<DatabaseConnection> {
    if cfg.database_url.is_empty() {
        return Err(DatabaseError::MissingUrl.into());
    }

    let mut options = ConnectOptions::new(&cfg.database_url);
    options
        .max_connections(cfg.db_max_connections)
        .acquire_timeout(Duration::from_millis(cfg.db_acquire_timeout_ms))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .sqlx_logging(true)
        .sqlx_logging_level(log::LevelFilter::Debug);

    let mut delay = INITIAL_RETRY_DELAY;
    let mut attempt = 1;

    loop {
        match Database::connect(options.clone()).await {
            Ok(conn) => {
                log::info!("Connected to database on attempt {}", attempt);
                return Ok(conn);
            }
            Err(source) if attempt < CONNECT_ATTEMPTS => {
                log::warn!(
                    "Database connect attempt {} failed ({}), retrying in {:?}",
                    attempt,
                    source,
                    delay
                );
                sleep(delay).await;
                delay *= 2;
                attempt += 1;
            }
            Err(source) => {
                log::error!("Giving up on database after {} attempts", attempt);
                return Err(DatabaseError::Connect {
                    attempts: attempt,
                    source,
                }
                .into());
            }
        }
    }
}

/// Runs a trivial query to confirm the pool can still reach the database.
pub async fn health_check(db: &DatabaseConnection) -> Result<()> {
    let stmt = Statement::from_string(db.get_database_backend(), "SELECT 1".to_string());

    db.query_one(stmt)
        .await
        .context("Database health check failed")?;

    Ok(())
}
