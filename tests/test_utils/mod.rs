//! Test utilities for integration testing.
//!
//! Provides an in-memory SQLite database with migrations applied, a
//! ready-to-use router, and fixture helpers for users, sessions, and form
//! bodies.

#![allow(dead_code)]

use anyhow::Result;
use axum::Router;
use chrono::{Duration, Utc};
use migration::{Migrator, MigratorTrait};
use sea_orm::{Database, DatabaseConnection};
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

use personas::auth::{generate_session_token, hash_session_token};
use personas::config::AppConfig;
use personas::repositories::{
    IdentityRepository, ModelProviderRepository, SessionRepository, UserRepository,
};
use personas::server::{create_app, create_test_app_state};

/// Sets up an in-memory SQLite database with all migrations applied.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = Database::connect("sqlite::memory:").await?;
    Migrator::up(&db, None).await?;
    Ok(db)
}

/// Application configuration for tests, rooted at the given storage dir.
pub fn test_config(storage_root: &Path) -> AppConfig {
    let mut config = AppConfig::default();
    config.profile = "test".to_string();
    config.app_url = "http://localhost:8080".to_string();
    config.avatar_storage_root = storage_root.to_string_lossy().into_owned();
    config.github_client_id = Some("test-client-id".to_string());
    config.github_client_secret = Some("test-client-secret".to_string());
    config
}

/// Builds the full application router over the given database.
pub fn build_app(db: DatabaseConnection, storage_root: &Path) -> Router {
    build_app_with_config(test_config(storage_root), db)
}

/// Builds the router with an explicit configuration, for tests that point
/// the OAuth client at a mock server.
pub fn build_app_with_config(config: AppConfig, db: DatabaseConnection) -> Router {
    let state = create_test_app_state(config, db);
    create_app(state)
}

/// Creates a user with one linked GitHub identity and an active session,
/// returning the user id and the plaintext session token.
pub async fn create_session_user(db: &DatabaseConnection) -> Result<(Uuid, String)> {
    let users = UserRepository::new(Arc::new(db.clone()));
    let identities = IdentityRepository::new(Arc::new(db.clone()));
    let sessions = SessionRepository::new(Arc::new(db.clone()));

    let user = users
        .create(Some("tester@example.com".to_string()), Some("Tester".to_string()))
        .await?;
    identities
        .create(user.id, "github", &Uuid::new_v4().to_string())
        .await?;

    let token = generate_session_token();
    sessions
        .create(user.id, &hash_session_token(&token), Utc::now() + Duration::hours(1))
        .await?;

    Ok((user.id, token))
}

/// Creates a session that expired in the past for the given user.
pub async fn create_expired_session(db: &DatabaseConnection, user_id: Uuid) -> Result<String> {
    let sessions = SessionRepository::new(Arc::new(db.clone()));
    let token = generate_session_token();
    sessions
        .create(user_id, &hash_session_token(&token), Utc::now() - Duration::hours(1))
        .await?;
    Ok(token)
}

/// Cookie header value carrying a session token.
pub fn session_cookie(token: &str) -> String {
    format!("personas_session={}", token)
}

/// Looks up a seeded provider id by slug.
pub async fn provider_id(db: &DatabaseConnection, slug: &str) -> Result<Uuid> {
    let repo = ModelProviderRepository::new(Arc::new(db.clone()));
    let provider = repo
        .find_by_slug(slug)
        .await?
        .ok_or_else(|| anyhow::anyhow!("provider '{}' not seeded", slug))?;
    Ok(provider.id)
}

pub const MULTIPART_BOUNDARY: &str = "----personas-test-boundary";

/// Content-Type header value for [`multipart_body`] payloads.
pub fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={}", MULTIPART_BOUNDARY)
}

/// Builds a multipart/form-data body from text fields and an optional file
/// part named `avatar`.
pub fn multipart_body(fields: &[(&str, &str)], avatar: Option<(&str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();

    for (name, value) in fields {
        body.extend_from_slice(format!("--{}\r\n", MULTIPART_BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
        );
        body.extend_from_slice(value.as_bytes());
        body.extend_from_slice(b"\r\n");
    }

    if let Some((filename, bytes)) = avatar {
        body.extend_from_slice(format!("--{}\r\n", MULTIPART_BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"avatar\"; filename=\"{}\"\r\n",
                filename
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }

    body.extend_from_slice(format!("--{}--\r\n", MULTIPART_BOUNDARY).as_bytes());
    body
}
