//! # Authentication and Authorization
//!
//! Session-based authentication for the Personas API. A session is an opaque
//! random token carried either in the `personas_session` cookie or as a
//! `Bearer` token; only its SHA-256 hash is stored server-side.

use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION, header::COOKIE, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::error::{ApiError, unauthorized};
use crate::repositories::{SessionRepository, UserRepository};
use crate::server::AppState;

/// Name of the session cookie issued at login
pub const SESSION_COOKIE: &str = "personas_session";

/// Authenticated user attached to the request by the session middleware
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: Uuid,
    pub email: Option<String>,
    pub display_name: Option<String>,
    /// ID of the session backing this request, used by logout
    pub session_id: Uuid,
}

impl FromRef<AppState> for Arc<AppConfig> {
    fn from_ref(app_state: &AppState) -> Self {
        Arc::clone(&app_state.config)
    }
}

/// Generate a new opaque session token (32 random bytes, base64url)
pub fn generate_session_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Hash a session token for storage and lookup
pub fn hash_session_token(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    hex::encode(digest)
}

/// Session middleware that resolves the bearer credential, if any, into a
/// `CurrentUser` request extension.
///
/// The middleware never rejects: anonymous requests pass through without the
/// extension, and the `CurrentUser` / `PageUser` extractors decide whether
/// that is an error for the route at hand.
pub async fn session_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let Some(token) = extract_session_token(request.headers()) {
        let sessions = SessionRepository::new(Arc::new(state.db.clone()));
        let users = UserRepository::new(Arc::new(state.db.clone()));

        // The lookup is by hash equality on an indexed column; a row coming
        // back already means the presented token hashes to the stored value.
        let token_hash = hash_session_token(&token);
        if let Some(session) = sessions.find_by_token_hash(&token_hash).await? {
            if session.expires_at > Utc::now() {
                if let Some(user) = users.find_by_id(session.user_id).await? {
                    tracing::debug!(user_id = %user.id, "Authenticated session request");
                    request.extensions_mut().insert(CurrentUser {
                        id: user.id,
                        email: user.email,
                        display_name: user.display_name,
                        session_id: session.id,
                    });
                }
            } else {
                // Expired sessions are reaped lazily on first use.
                let _ = sessions.delete(session.id).await;
            }
        }
    }

    Ok(next.run(request).await)
}

/// Pull the session token from the cookie or the Authorization header
pub fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(cookie_header) = headers.get(COOKIE).and_then(|v| v.to_str().ok()) {
        for pair in cookie_header.split(';') {
            let mut parts = pair.trim().splitn(2, '=');
            if parts.next() == Some(SESSION_COOKIE) {
                if let Some(value) = parts.next() {
                    if !value.is_empty() {
                        return Some(value.to_string());
                    }
                }
            }
        }
    }

    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .map(|token| token.to_string())
}

/// Rejection that issues a 303 redirect to `/login`
#[derive(Debug)]
pub struct LoginRedirect;

impl IntoResponse for LoginRedirect {
    fn into_response(self) -> Response {
        (StatusCode::SEE_OTHER, [("location", "/login")]).into_response()
    }
}

/// Whether the request looks like a browser page navigation rather than an
/// API call. Such requests get redirected to `/login` instead of a 401.
fn is_html_navigation(parts: &Parts) -> bool {
    parts.method == axum::http::Method::GET
        && parts
            .headers
            .get(axum::http::header::ACCEPT)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|accept| accept.contains("text/html"))
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<CurrentUser>() {
            return Ok(user.clone());
        }

        if is_html_navigation(parts) {
            Err(LoginRedirect.into_response())
        } else {
            Err(unauthorized(None).into_response())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn token_generation_is_unique_and_urlsafe() {
        let t1 = generate_session_token();
        let t2 = generate_session_token();

        assert_ne!(t1, t2);
        assert!(t1.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        // 32 bytes of entropy -> 43 base64url chars
        assert_eq!(t1.len(), 43);
    }

    #[test]
    fn token_hash_is_stable_hex() {
        let hash1 = hash_session_token("some-token");
        let hash2 = hash_session_token("some-token");

        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
        assert_ne!(hash1, hash_session_token("other-token"));
    }

    #[test]
    fn extracts_token_from_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; personas_session=abc123; other=1"),
        );

        assert_eq!(extract_session_token(&headers).as_deref(), Some("abc123"));
    }

    #[test]
    fn extracts_token_from_bearer_header() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer xyz789"));

        assert_eq!(extract_session_token(&headers).as_deref(), Some("xyz789"));
    }

    #[test]
    fn cookie_takes_precedence_over_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("personas_session=cookie-token"));
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer header-token"));

        assert_eq!(
            extract_session_token(&headers).as_deref(),
            Some("cookie-token")
        );
    }

    #[test]
    fn missing_credentials_yield_none() {
        let headers = HeaderMap::new();
        assert!(extract_session_token(&headers).is_none());

        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("personas_session="));
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwdw=="));
        assert!(extract_session_token(&headers).is_none());
    }
}
