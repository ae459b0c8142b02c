//! Problem+json error responses.
//!
//! Every failure leaves the API as an [`ApiError`]: a status code, a stable
//! SCREAMING_SNAKE_CASE code, a human-readable message, optional structured
//! details (form validation uses a `fieldErrors` object), and a correlation
//! trace ID.

use axum::{
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use utoipa::ToSchema;

use crate::telemetry;

/// Error categories the API can answer with.
#[derive(Debug, Error)]
pub enum ErrorType {
    #[error("Bad Request")]
    BadRequest,
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Forbidden")]
    Forbidden,
    #[error("Not Found")]
    NotFound,
    #[error("Conflict")]
    Conflict,
    #[error("Internal Server Error")]
    InternalServerError,
    #[error("Service Unavailable")]
    ServiceUnavailable,
}

impl ErrorType {
    /// HTTP status for this category.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict => StatusCode::CONFLICT,
            Self::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Stable machine-readable code for this category.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::BadRequest => "VALIDATION_FAILED",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden => "FORBIDDEN",
            Self::NotFound => "NOT_FOUND",
            Self::Conflict => "CONFLICT",
            Self::InternalServerError => "INTERNAL_SERVER_ERROR",
            Self::ServiceUnavailable => "SERVICE_UNAVAILABLE",
        }
    }
}

/// The problem+json body sent to clients.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ApiError {
    /// Response status; lives on the struct for [`IntoResponse`] but is not
    /// serialized into the body.
    #[serde(skip_serializing, skip_deserializing)]
    pub status: StatusCode,
    /// Machine-readable error code.
    pub code: Box<str>,
    /// Human-readable description.
    pub message: Box<str>,
    /// Structured details; validation failures carry `fieldErrors` here.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Box<serde_json::Value>>,
    /// Correlation ID for matching a response to server logs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<Box<str>>,
}

impl ApiError {
    pub fn new<S: Into<String>>(status: StatusCode, code: S, message: S) -> Self {
        Self {
            status,
            code: code.into().into_boxed_str(),
            message: message.into().into_boxed_str(),
            details: None,
            trace_id: Self::current_trace_id(),
        }
    }

    pub fn with_details<V: Into<serde_json::Value>>(mut self, details: V) -> Self {
        self.details = Some(Box::new(details.into()));
        self
    }

    /// Request trace ID when one is in scope, otherwise a fresh correlation
    /// ID so the response is still traceable.
    fn current_trace_id() -> Option<Box<str>> {
        telemetry::current_trace_id()
            .map(String::into_boxed_str)
            .or_else(|| {
                Some(format!("corr-{}", &uuid::Uuid::new_v4().to_string()[..8]).into_boxed_str())
            })
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut headers = HeaderMap::new();
        headers.insert(
            "content-type",
            HeaderValue::from_static("application/problem+json"),
        );

        (self.status, headers, axum::Json(self)).into_response()
    }
}

impl From<ErrorType> for ApiError {
    fn from(error_type: ErrorType) -> Self {
        Self::new(
            error_type.status_code(),
            error_type.error_code(),
            &error_type.to_string(),
        )
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(error: anyhow::Error) -> Self {
        tracing::error!("Internal error: {:?}", error);

        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_SERVER_ERROR",
            "An internal error occurred",
        )
    }
}

impl From<sea_orm::DbErr> for ApiError {
    fn from(error: sea_orm::DbErr) -> Self {
        if is_unique_violation(&error) {
            tracing::debug!(?error, "Unique constraint violation");
            return Self::new(StatusCode::CONFLICT, "CONFLICT", "Resource already exists");
        }

        match error {
            sea_orm::DbErr::RecordNotFound(record) => Self::new(
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                &format!("Record not found: {}", record),
            ),
            sea_orm::DbErr::Conn(conn_err) => {
                tracing::error!("Database connection error: {:?}", conn_err);
                Self::new(
                    StatusCode::SERVICE_UNAVAILABLE,
                    "SERVICE_UNAVAILABLE",
                    "Database service unavailable",
                )
            }
            other => {
                tracing::error!("Database error: {:?}", other);
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_SERVER_ERROR",
                    "Database error occurred",
                )
            }
        }
    }
}

/// Whether a database error is a unique-constraint violation.
///
/// Probes the driver error code directly because sea-orm does not classify
/// these; Postgres reports 23505, SQLite 1555/2067.
fn is_unique_violation(error: &sea_orm::DbErr) -> bool {
    use sea_orm::RuntimeErr;

    const PG_UNIQUE: &str = "23505";
    const SQLITE_DUPLICATE_CODES: &[&str] = &["1555", "2067"];

    let runtime_err = match error {
        sea_orm::DbErr::Query(RuntimeErr::SqlxError(sqlx_err))
        | sea_orm::DbErr::Exec(RuntimeErr::SqlxError(sqlx_err)) => sqlx_err,
        _ => return false,
    };

    let Some(db_error) = runtime_err.as_database_error() else {
        return false;
    };

    if db_error.is_unique_violation() {
        return true;
    }

    db_error.code().is_some_and(|code| {
        let code = code.as_ref();
        code == PG_UNIQUE || SQLITE_DUPLICATE_CODES.contains(&code)
    })
}

/// 401 with an optional custom message.
pub fn unauthorized(message: Option<&str>) -> ApiError {
    ApiError::new(
        StatusCode::UNAUTHORIZED,
        "UNAUTHORIZED",
        message.unwrap_or("Authentication required"),
    )
}

/// 403 with an optional custom message.
pub fn forbidden(message: Option<&str>) -> ApiError {
    ApiError::new(
        StatusCode::FORBIDDEN,
        "FORBIDDEN",
        message.unwrap_or("Insufficient permissions"),
    )
}

/// 404 with the given message.
pub fn not_found(message: &str) -> ApiError {
    ApiError::new(StatusCode::NOT_FOUND, "NOT_FOUND", message)
}

/// 400 with free-form details.
pub fn validation_error(message: &str, details: serde_json::Value) -> ApiError {
    ApiError::new(StatusCode::BAD_REQUEST, "VALIDATION_FAILED", message).with_details(details)
}

/// 400 carrying per-field messages under `fieldErrors`, the shape the form
/// components consume.
pub fn field_errors(fields: serde_json::Value) -> ApiError {
    ApiError::new(
        StatusCode::BAD_REQUEST,
        "VALIDATION_FAILED",
        "Validation failed",
    )
    .with_details(json!({ "fieldErrors": fields }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use serde_json::json;

    #[test]
    fn error_carries_code_and_message() {
        let error = ApiError::new(StatusCode::BAD_REQUEST, "VALIDATION_FAILED", "Bad input");

        assert_eq!(error.code.as_ref(), "VALIDATION_FAILED");
        assert_eq!(error.message.as_ref(), "Bad input");
        assert!(error.details.is_none());
    }

    #[test]
    fn error_type_maps_status_and_code() {
        let error: ApiError = ErrorType::NotFound.into();
        assert_eq!(error.status, StatusCode::NOT_FOUND);
        assert_eq!(error.code.as_ref(), "NOT_FOUND");

        let error: ApiError = ErrorType::Conflict.into();
        assert_eq!(error.status, StatusCode::CONFLICT);
        assert_eq!(error.code.as_ref(), "CONFLICT");
    }

    #[test]
    fn anyhow_errors_become_opaque_500s() {
        let error: ApiError = anyhow::anyhow!("connection pool exhausted").into();

        assert_eq!(error.status, StatusCode::INTERNAL_SERVER_ERROR);
        // Internal detail must not leak into the client-facing message.
        assert!(!error.message.contains("pool"));
    }

    #[test]
    fn responses_use_problem_json_content_type() {
        let response = not_found("Agent not found").into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "application/problem+json"
        );
    }

    #[test]
    fn fallback_trace_id_is_generated() {
        let error = unauthorized(None);

        let trace_id = error.trace_id.unwrap();
        assert!(trace_id.starts_with("corr-"));
        assert_eq!(trace_id.len(), "corr-".len() + 8);
    }

    #[test]
    fn record_not_found_maps_to_404() {
        let error: ApiError = sea_orm::DbErr::RecordNotFound("agents".to_string()).into();

        assert_eq!(error.status, StatusCode::NOT_FOUND);
        assert!(error.message.contains("agents"));
    }

    #[test]
    fn auth_helpers_default_messages() {
        assert_eq!(
            unauthorized(None).message.as_ref(),
            "Authentication required"
        );
        assert_eq!(
            forbidden(Some("Not your agent")).message.as_ref(),
            "Not your agent"
        );
        assert_eq!(forbidden(None).status, StatusCode::FORBIDDEN);
    }

    #[test]
    fn field_errors_nest_under_details() {
        let error = field_errors(json!({ "name": "Name is required" }));

        assert_eq!(error.status, StatusCode::BAD_REQUEST);
        assert_eq!(error.code.as_ref(), "VALIDATION_FAILED");

        let details = error.details.unwrap();
        assert_eq!(details["fieldErrors"]["name"], "Name is required");
    }
}
