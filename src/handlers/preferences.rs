//! # Preference Handlers
//!
//! Display preferences live entirely in a cookie the client sends back; the
//! server validates and echoes them without persisting anything.

use axum::{
    extract::Form,
    http::{HeaderMap, HeaderValue, header::SET_COOKIE},
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

use crate::auth::CurrentUser;
use crate::error::ApiError;

/// Name of the display-preferences cookie
pub const PREFS_COOKIE: &str = "prefs";
/// Preferences cookie lifetime (one year)
const PREFS_MAX_AGE_SECS: u64 = 60 * 60 * 24 * 365;

/// Form body for preference updates
#[derive(Debug, Deserialize, ToSchema)]
pub struct PreferencesForm {
    pub show_sidebar: Option<String>,
    pub narrow_mode: Option<String>,
}

/// Preferences as stored in the cookie
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Preferences {
    pub show_sidebar: bool,
    pub narrow_mode: bool,
}

/// Update display preferences via a Set-Cookie round trip
#[utoipa::path(
    post,
    path = "/api/preferences",
    request_body(content = PreferencesForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Preferences echoed into the prefs cookie"),
        (status = 401, description = "Not signed in", body = ApiError)
    ),
    tag = "preferences"
)]
pub async fn update_preferences(
    _user: CurrentUser,
    Form(form): Form<PreferencesForm>,
) -> Result<Response, ApiError> {
    let prefs = Preferences {
        show_sidebar: truthy(form.show_sidebar.as_deref()),
        narrow_mode: truthy(form.narrow_mode.as_deref()),
    };

    let encoded = serde_json::to_string(&prefs)
        .map_err(|e| ApiError::from(anyhow::anyhow!("failed to encode preferences: {}", e)))?;
    let cookie = format!(
        "{}={}; Path=/; SameSite=Lax; Max-Age={}",
        PREFS_COOKIE,
        cookie_encode(&encoded),
        PREFS_MAX_AGE_SECS
    );

    let mut headers = HeaderMap::new();
    headers.insert(
        SET_COOKIE,
        HeaderValue::from_str(&cookie)
            .map_err(|e| ApiError::from(anyhow::anyhow!("invalid cookie value: {}", e)))?,
    );

    Ok((headers, Json(json!({ "success": true, "preferences": prefs }))).into_response())
}

fn truthy(value: Option<&str>) -> bool {
    matches!(value, Some("1") | Some("true") | Some("on"))
}

/// Percent-encode the JSON payload so it is cookie-safe
fn cookie_encode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}
