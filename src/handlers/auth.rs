//! # Authentication Handlers
//!
//! Sign-in, OAuth callback, logout, and identity linking endpoints. The
//! browser-facing endpoints answer with 303 redirects the way form posts
//! expect; the JSON endpoints use the problem+json envelope.

use std::sync::Arc;

use axum::{
    extract::{Form, Query, State},
    http::{HeaderMap, HeaderValue, header::SET_COOKIE},
    response::{IntoResponse, Json, Redirect, Response},
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::{CurrentUser, SESSION_COOKIE, generate_session_token, hash_session_token};
use crate::error::{ApiError, field_errors, not_found};
use crate::oauth::{GitHubOAuthClient, generate_state_token};
use crate::repositories::{
    IdentityRepository, OAuthStateRepository, SessionRepository, UserRepository,
};
use crate::server::AppState;

/// OAuth state lifetime in minutes
const STATE_TTL_MINUTES: i64 = 15;
/// Where the browser lands after a failed callback
const AUTH_ERROR_PATH: &str = "/auth-code-error";
/// Default post-login destination
const DEFAULT_NEXT: &str = "/dashboard";

/// Login form body
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginForm {
    /// Identity provider slug (currently only `github`)
    pub provider: String,
    /// Optional path to return to after sign-in
    pub next: Option<String>,
}

/// Callback query parameters from the identity provider
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
}

/// Identity link/unlink form body
#[derive(Debug, Deserialize, ToSchema)]
pub struct IdentityForm {
    /// Identity provider slug
    pub provider: String,
    /// `"0"` to start a link flow, `"1"` to unlink the existing identity
    pub connected: String,
}

/// Current-user response payload
#[derive(Debug, Serialize, ToSchema)]
pub struct MeResponse {
    pub id: Uuid,
    pub email: Option<String>,
    pub display_name: Option<String>,
    /// Slugs of the identity providers linked to this account
    pub identities: Vec<String>,
}

/// Begin an OAuth sign-in flow
#[utoipa::path(
    post,
    path = "/api/login",
    request_body(content = LoginForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Redirect to the provider authorize URL"),
        (status = 400, description = "Unknown provider", body = ApiError)
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Redirect, ApiError> {
    if form.provider != "github" {
        return Err(field_errors(
            json!({ "provider": format!("Unknown provider '{}'", form.provider) }),
        ));
    }

    let client = GitHubOAuthClient::from_config(&state.config)
        .map_err(|e| ApiError::from(anyhow::Error::new(e)))?;

    let state_token = generate_state_token();
    let states = OAuthStateRepository::new(Arc::new(state.db.clone()));
    states
        .create(&state_token, &form.provider, None, form.next, STATE_TTL_MINUTES)
        .await?;

    let authorize_url = client
        .build_authorize_url(&state_token)
        .map_err(|e| ApiError::from(anyhow::Error::new(e)))?;

    info!(provider = %form.provider, "Starting OAuth sign-in flow");
    Ok(Redirect::to(authorize_url.as_str()))
}

/// OAuth callback: exchange the code, resolve the user, start a session
#[utoipa::path(
    get,
    path = "/api/auth/callback",
    responses(
        (status = 303, description = "Redirect to the next page with a session cookie, or to /auth-code-error on failure")
    ),
    tag = "auth"
)]
pub async fn callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Result<Response, ApiError> {
    let (Some(code), Some(state_token)) = (query.code, query.state) else {
        warn!("OAuth callback missing code or state");
        return Ok(Redirect::to(AUTH_ERROR_PATH).into_response());
    };

    let states = OAuthStateRepository::new(Arc::new(state.db.clone()));
    let Some(oauth_state) = states.consume(&state_token).await? else {
        warn!("OAuth callback with unknown or expired state");
        return Ok(Redirect::to(AUTH_ERROR_PATH).into_response());
    };

    let client = GitHubOAuthClient::from_config(&state.config)
        .map_err(|e| ApiError::from(anyhow::Error::new(e)))?;

    let profile = match client.exchange_code(&code).await {
        Ok(token) => match client.fetch_user(&token.access_token).await {
            Ok(profile) => profile,
            Err(e) => {
                warn!("Fetching provider profile failed: {}", e);
                return Ok(Redirect::to(AUTH_ERROR_PATH).into_response());
            }
        },
        Err(e) => {
            warn!("OAuth code exchange failed: {}", e);
            return Ok(Redirect::to(AUTH_ERROR_PATH).into_response());
        }
    };

    let users = UserRepository::new(Arc::new(state.db.clone()));
    let identities = IdentityRepository::new(Arc::new(state.db.clone()));
    let external_id = profile.id.to_string();

    let existing = identities
        .find_by_provider(&oauth_state.provider_slug, &external_id)
        .await?;

    let user_id = match (existing, oauth_state.user_id) {
        // Returning user signing in, or re-authorizing an identity they own.
        (Some(identity), linking) => {
            if linking.is_some_and(|linker| linker != identity.user_id) {
                warn!("Identity already linked to a different account");
                return Ok(Redirect::to(AUTH_ERROR_PATH).into_response());
            }
            identity.user_id
        }
        // Signed-in user linking a new identity.
        (None, Some(linker)) => {
            identities
                .create(linker, &oauth_state.provider_slug, &external_id)
                .await?;
            linker
        }
        // First sign-in: create the account and its identity.
        (None, None) => {
            let user = users
                .create(profile.email.clone(), profile.name.clone().or(Some(profile.login.clone())))
                .await?;
            identities
                .create(user.id, &oauth_state.provider_slug, &external_id)
                .await?;
            info!(user_id = %user.id, "Created user on first sign-in");
            user.id
        }
    };

    let sessions = SessionRepository::new(Arc::new(state.db.clone()));
    let token = generate_session_token();
    let expires_at = Utc::now() + Duration::hours(state.config.session_ttl_hours as i64);
    sessions
        .create(user_id, &hash_session_token(&token), expires_at)
        .await?;

    let next = oauth_state
        .next
        .filter(|n| n.starts_with('/'))
        .unwrap_or_else(|| DEFAULT_NEXT.to_string());

    let mut headers = HeaderMap::new();
    headers.insert(
        SET_COOKIE,
        session_cookie(&token, state.config.session_ttl_hours)?,
    );

    info!(user_id = %user_id, "Session established");
    Ok((headers, Redirect::to(&next)).into_response())
}

/// End the current session
#[utoipa::path(
    post,
    path = "/api/logout",
    responses(
        (status = 303, description = "Session cleared, redirect to /"),
        (status = 401, description = "Not signed in", body = ApiError)
    ),
    tag = "auth"
)]
pub async fn logout(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Response, ApiError> {
    let sessions = SessionRepository::new(Arc::new(state.db.clone()));
    sessions.delete(user.session_id).await?;

    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, clear_session_cookie()?);

    Ok((headers, Redirect::to("/")).into_response())
}

/// Link or unlink an identity for the signed-in user
#[utoipa::path(
    post,
    path = "/api/identities",
    request_body(content = IdentityForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Identity unlinked"),
        (status = 303, description = "Redirect to the provider authorize URL for linking"),
        (status = 400, description = "Validation error", body = ApiError),
        (status = 404, description = "No such identity", body = ApiError),
        (status = 409, description = "Cannot unlink the last identity", body = ApiError)
    ),
    tag = "auth"
)]
pub async fn identities(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<IdentityForm>,
) -> Result<Response, ApiError> {
    match form.connected.as_str() {
        "0" => {
            if form.provider != "github" {
                return Err(field_errors(
                    json!({ "provider": format!("Unknown provider '{}'", form.provider) }),
                ));
            }

            let client = GitHubOAuthClient::from_config(&state.config)
                .map_err(|e| ApiError::from(anyhow::Error::new(e)))?;

            let state_token = generate_state_token();
            let states = OAuthStateRepository::new(Arc::new(state.db.clone()));
            states
                .create(
                    &state_token,
                    &form.provider,
                    Some(user.id),
                    Some("/settings".to_string()),
                    STATE_TTL_MINUTES,
                )
                .await?;

            let authorize_url = client
                .build_authorize_url(&state_token)
                .map_err(|e| ApiError::from(anyhow::Error::new(e)))?;

            Ok(Redirect::to(authorize_url.as_str()).into_response())
        }
        "1" => {
            let repo = IdentityRepository::new(Arc::new(state.db.clone()));
            let linked = repo.list_for_user(user.id).await?;

            let Some(identity) = linked.iter().find(|i| i.provider_slug == form.provider) else {
                return Err(not_found(&format!(
                    "No linked identity for provider '{}'",
                    form.provider
                )));
            };

            if linked.len() <= 1 {
                return Err(ApiError::new(
                    axum::http::StatusCode::CONFLICT,
                    "CONFLICT",
                    "Cannot unlink the last identity on an account",
                ));
            }

            repo.delete(identity.id).await?;
            info!(user_id = %user.id, provider = %form.provider, "Identity unlinked");
            Ok(Json(json!({ "success": true })).into_response())
        }
        other => Err(field_errors(
            json!({ "connected": format!("Expected \"0\" or \"1\", got \"{}\"", other) }),
        )),
    }
}

/// Return the signed-in user's profile and linked identities
#[utoipa::path(
    get,
    path = "/api/me",
    responses(
        (status = 200, description = "Current user", body = MeResponse),
        (status = 401, description = "Not signed in", body = ApiError)
    ),
    tag = "auth"
)]
pub async fn me(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<MeResponse>, ApiError> {
    let repo = IdentityRepository::new(Arc::new(state.db.clone()));
    let linked = repo.list_for_user(user.id).await?;

    Ok(Json(MeResponse {
        id: user.id,
        email: user.email,
        display_name: user.display_name,
        identities: linked.into_iter().map(|i| i.provider_slug).collect(),
    }))
}

fn session_cookie(token: &str, ttl_hours: u64) -> Result<HeaderValue, ApiError> {
    let value = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE,
        token,
        ttl_hours * 3600
    );
    HeaderValue::from_str(&value)
        .map_err(|e| ApiError::from(anyhow::anyhow!("invalid cookie value: {}", e)))
}

fn clear_session_cookie() -> Result<HeaderValue, ApiError> {
    let value = format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE);
    HeaderValue::from_str(&value)
        .map_err(|e| ApiError::from(anyhow::anyhow!("invalid cookie value: {}", e)))
}
