//! Integration tests for the service surface: root info, health, the public
//! provider catalog, avatar serving, and the preferences cookie.

mod test_utils;

use anyhow::Result;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

use personas::repositories::ModelProviderRepository;
use personas::seeds::seed_model_providers;
use test_utils::{build_app, create_session_user, session_cookie, setup_test_db};

async fn body_json(response: axum::response::Response) -> Result<serde_json::Value> {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[tokio::test]
async fn root_returns_service_info() -> Result<()> {
    let db = setup_test_db().await?;
    let storage = TempDir::new()?;
    let app = build_app(db, storage.path());

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty())?)
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await?;
    assert_eq!(json["service"], "personas");
    assert!(json["version"].is_string());
    Ok(())
}

#[tokio::test]
async fn healthz_reports_ok_with_live_database() -> Result<()> {
    let db = setup_test_db().await?;
    let storage = TempDir::new()?;
    let app = build_app(db, storage.path());

    let response = app
        .oneshot(Request::builder().uri("/healthz").body(Body::empty())?)
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await?;
    assert_eq!(json["status"], "ok");
    Ok(())
}

#[tokio::test]
async fn provider_seeding_is_idempotent() -> Result<()> {
    let db = setup_test_db().await?;

    seed_model_providers(&db).await?;
    seed_model_providers(&db).await?;

    let repo = ModelProviderRepository::new(Arc::new(db));
    let providers = repo.list().await?;
    assert_eq!(providers.len(), 6);

    let names: Vec<_> = providers.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["Anthropic", "Google", "Groq", "Mistral", "OpenAI", "OpenRouter"]
    );
    Ok(())
}

#[tokio::test]
async fn provider_catalog_is_public_and_sorted() -> Result<()> {
    let db = setup_test_db().await?;
    let storage = TempDir::new()?;
    seed_model_providers(&db).await?;
    let app = build_app(db, storage.path());

    // No session cookie: the catalog is readable by anyone.
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/model-providers")
                .body(Body::empty())?,
        )
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await?;
    let providers = json["model_providers"].as_array().unwrap();
    assert_eq!(providers.len(), 6);
    assert_eq!(providers[0]["name"], "Anthropic");
    assert_eq!(providers[0]["slug"], "anthropic");
    assert!(providers[0]["id"].is_string());
    Ok(())
}

#[tokio::test]
async fn stored_avatar_is_served_with_content_type() -> Result<()> {
    let db = setup_test_db().await?;
    let storage = TempDir::new()?;
    let owner = Uuid::new_v4();

    let dir = storage.path().join(owner.to_string());
    std::fs::create_dir_all(&dir)?;
    std::fs::write(dir.join(format!("{}-1700000000000.png", owner)), b"png bytes")?;

    let app = build_app(db, storage.path());
    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/avatars/{}/{}-1700000000000.png", owner, owner))
                .body(Body::empty())?,
        )
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "image/png"
    );
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    assert_eq!(&bytes[..], b"png bytes");
    Ok(())
}

#[tokio::test]
async fn missing_or_malformed_avatar_paths_are_not_found() -> Result<()> {
    let db = setup_test_db().await?;
    let storage = TempDir::new()?;
    let app = build_app(db, storage.path());

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/avatars/{}/missing.png", Uuid::new_v4()))
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Owner segment must be a UUID.
    let response = app
        .oneshot(
            Request::builder()
                .uri("/avatars/..%2Fsecrets/file.png")
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn preferences_round_trip_through_a_cookie() -> Result<()> {
    let db = setup_test_db().await?;
    let storage = TempDir::new()?;
    let (_user_id, token) = create_session_user(&db).await?;
    let app = build_app(db, storage.path());

    let request = Request::builder()
        .method("POST")
        .uri("/api/preferences")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .header(header::COOKIE, session_cookie(&token))
        .body(Body::from("show_sidebar=1&narrow_mode=0"))?;
    let response = app.oneshot(request).await?;

    assert_eq!(response.status(), StatusCode::OK);
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()?
        .to_string();
    assert!(set_cookie.starts_with("prefs="));
    assert!(set_cookie.contains("show_sidebar"));

    let json = body_json(response).await?;
    assert_eq!(json["success"], true);
    assert_eq!(json["preferences"]["show_sidebar"], true);
    assert_eq!(json["preferences"]["narrow_mode"], false);
    Ok(())
}

#[tokio::test]
async fn preferences_require_a_session() -> Result<()> {
    let db = setup_test_db().await?;
    let storage = TempDir::new()?;
    let app = build_app(db, storage.path());

    let request = Request::builder()
        .method("POST")
        .uri("/api/preferences")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("show_sidebar=1"))?;
    let response = app.oneshot(request).await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}
