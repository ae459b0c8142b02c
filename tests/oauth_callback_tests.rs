//! Integration tests for the OAuth callback against a mock provider:
//! first sign-in, identity linking, single-use state, and error redirects.

mod test_utils;

use anyhow::Result;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use personas::repositories::{IdentityRepository, OAuthStateRepository, UserRepository};
use test_utils::{build_app_with_config, create_session_user, setup_test_db, test_config};

/// Mounts GitHub's token-exchange and user endpoints on a mock server.
async fn mock_github(external_id: u64, login: &str, name: &str) -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/login/oauth/access_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "gho_test_token",
            "token_type": "bearer",
            "scope": "read:user user:email"
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/user"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": external_id,
            "login": login,
            "name": name,
            "email": format!("{}@example.com", login)
        })))
        .mount(&server)
        .await;

    server
}

fn callback_request(state: &str) -> Request<Body> {
    Request::builder()
        .uri(format!("/api/auth/callback?code=test-code&state={}", state))
        .body(Body::empty())
        .unwrap()
}

/// Extracts the session cookie pair from a Set-Cookie header.
fn session_pair(response: &axum::response::Response) -> Option<String> {
    let set_cookie = response.headers().get(header::SET_COOKIE)?.to_str().ok()?;
    let pair = set_cookie.split(';').next()?;
    pair.starts_with("personas_session=").then(|| pair.to_string())
}

#[tokio::test]
async fn first_sign_in_creates_user_identity_and_session() -> Result<()> {
    let db = setup_test_db().await?;
    let storage = TempDir::new()?;
    let github = mock_github(4242, "octo", "Octo Cat").await;

    let mut config = test_config(storage.path());
    config.github_oauth_base = Some(github.uri());
    config.github_api_base = Some(github.uri());
    let app = build_app_with_config(config, db.clone());

    let states = OAuthStateRepository::new(Arc::new(db.clone()));
    states
        .create("state-signin", "github", None, Some("/agents".to_string()), 15)
        .await?;

    let response = app.clone().oneshot(callback_request("state-signin")).await?;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/agents");

    let cookie = session_pair(&response).expect("session cookie issued");

    let request = Request::builder()
        .uri("/api/me")
        .header(header::COOKIE, &cookie)
        .body(Body::empty())?;
    let response = app.oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    let json: serde_json::Value = serde_json::from_slice(&bytes)?;
    assert_eq!(json["display_name"], "Octo Cat");
    assert_eq!(json["email"], "octo@example.com");
    assert_eq!(json["identities"], serde_json::json!(["github"]));

    let identities = IdentityRepository::new(Arc::new(db));
    let identity = identities
        .find_by_provider("github", "4242")
        .await?
        .expect("identity linked");
    assert_eq!(identity.provider_slug, "github");
    Ok(())
}

#[tokio::test]
async fn returning_user_signs_in_without_duplicate_account() -> Result<()> {
    let db = setup_test_db().await?;
    let storage = TempDir::new()?;
    let github = mock_github(4242, "octo", "Octo Cat").await;

    let mut config = test_config(storage.path());
    config.github_oauth_base = Some(github.uri());
    config.github_api_base = Some(github.uri());
    let app = build_app_with_config(config, db.clone());

    let users = UserRepository::new(Arc::new(db.clone()));
    let identities = IdentityRepository::new(Arc::new(db.clone()));
    let existing = users
        .create(Some("octo@example.com".to_string()), Some("Octo Cat".to_string()))
        .await?;
    identities.create(existing.id, "github", "4242").await?;

    let states = OAuthStateRepository::new(Arc::new(db.clone()));
    states.create("state-return", "github", None, None, 15).await?;

    let response = app.clone().oneshot(callback_request("state-return")).await?;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    // No `next` recorded, so the default destination applies.
    assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/dashboard");

    let cookie = session_pair(&response).expect("session cookie issued");
    let request = Request::builder()
        .uri("/api/me")
        .header(header::COOKIE, &cookie)
        .body(Body::empty())?;
    let response = app.oneshot(request).await?;
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    let json: serde_json::Value = serde_json::from_slice(&bytes)?;
    assert_eq!(json["id"], existing.id.to_string());
    Ok(())
}

#[tokio::test]
async fn linking_flow_attaches_identity_to_signed_in_user() -> Result<()> {
    let db = setup_test_db().await?;
    let storage = TempDir::new()?;
    let github = mock_github(7777, "second-octo", "Second Octo").await;

    let mut config = test_config(storage.path());
    config.github_oauth_base = Some(github.uri());
    config.github_api_base = Some(github.uri());
    let app = build_app_with_config(config, db.clone());

    let (user_id, _token) = create_session_user(&db).await?;

    let states = OAuthStateRepository::new(Arc::new(db.clone()));
    states
        .create(
            "state-link",
            "github",
            Some(user_id),
            Some("/settings".to_string()),
            15,
        )
        .await?;

    let response = app.oneshot(callback_request("state-link")).await?;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/settings");

    let identities = IdentityRepository::new(Arc::new(db));
    let linked = identities.find_by_provider("github", "7777").await?.unwrap();
    assert_eq!(linked.user_id, user_id);
    assert_eq!(identities.count_for_user(user_id).await?, 2);
    Ok(())
}

#[tokio::test]
async fn linking_an_identity_owned_by_someone_else_fails() -> Result<()> {
    let db = setup_test_db().await?;
    let storage = TempDir::new()?;
    let github = mock_github(4242, "octo", "Octo Cat").await;

    let mut config = test_config(storage.path());
    config.github_oauth_base = Some(github.uri());
    config.github_api_base = Some(github.uri());
    let app = build_app_with_config(config, db.clone());

    // The provider account already belongs to another local user.
    let users = UserRepository::new(Arc::new(db.clone()));
    let identities = IdentityRepository::new(Arc::new(db.clone()));
    let owner = users.create(None, Some("Owner".to_string())).await?;
    identities.create(owner.id, "github", "4242").await?;

    let (linker_id, _token) = create_session_user(&db).await?;

    let states = OAuthStateRepository::new(Arc::new(db.clone()));
    states
        .create("state-steal", "github", Some(linker_id), None, 15)
        .await?;

    let response = app.oneshot(callback_request("state-steal")).await?;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response.headers().get(header::LOCATION).unwrap(),
        "/auth-code-error"
    );

    // The identity still belongs to its original owner.
    let identity = identities.find_by_provider("github", "4242").await?.unwrap();
    assert_eq!(identity.user_id, owner.id);
    Ok(())
}

#[tokio::test]
async fn state_tokens_are_single_use() -> Result<()> {
    let db = setup_test_db().await?;
    let storage = TempDir::new()?;
    let github = mock_github(4242, "octo", "Octo Cat").await;

    let mut config = test_config(storage.path());
    config.github_oauth_base = Some(github.uri());
    config.github_api_base = Some(github.uri());
    let app = build_app_with_config(config, db.clone());

    let states = OAuthStateRepository::new(Arc::new(db.clone()));
    states.create("state-once", "github", None, None, 15).await?;

    let first = app.clone().oneshot(callback_request("state-once")).await?;
    assert_eq!(first.status(), StatusCode::SEE_OTHER);
    assert_eq!(first.headers().get(header::LOCATION).unwrap(), "/dashboard");

    let replay = app.oneshot(callback_request("state-once")).await?;
    assert_eq!(replay.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        replay.headers().get(header::LOCATION).unwrap(),
        "/auth-code-error"
    );
    Ok(())
}

#[tokio::test]
async fn unknown_state_redirects_to_error_page() -> Result<()> {
    let db = setup_test_db().await?;
    let storage = TempDir::new()?;
    let app = build_app_with_config(test_config(storage.path()), db);

    let response = app.oneshot(callback_request("never-issued")).await?;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response.headers().get(header::LOCATION).unwrap(),
        "/auth-code-error"
    );
    Ok(())
}

#[tokio::test]
async fn absolute_next_urls_fall_back_to_dashboard() -> Result<()> {
    let db = setup_test_db().await?;
    let storage = TempDir::new()?;
    let github = mock_github(4242, "octo", "Octo Cat").await;

    let mut config = test_config(storage.path());
    config.github_oauth_base = Some(github.uri());
    config.github_api_base = Some(github.uri());
    let app = build_app_with_config(config, db.clone());

    let states = OAuthStateRepository::new(Arc::new(db.clone()));
    states
        .create(
            "state-offsite",
            "github",
            None,
            Some("https://evil.example/phish".to_string()),
            15,
        )
        .await?;

    let response = app.oneshot(callback_request("state-offsite")).await?;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/dashboard");
    Ok(())
}
