//! # Server Configuration
//!
//! This module contains the server setup and configuration for the Personas API.

use std::sync::Arc;

use axum::{
    Router,
    extract::Request,
    middleware::Next,
    response::Response,
    routing::{get, post},
};
use sea_orm::DatabaseConnection;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use uuid::Uuid;

use crate::auth::session_middleware;
use crate::config::AppConfig;
use crate::crypto::CryptoKey;
use crate::handlers;
use crate::storage::{AvatarStorage, LocalAvatarStorage};
use crate::telemetry::{self, TraceContext};

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DatabaseConnection,
    pub crypto_key: CryptoKey,
    pub storage: Arc<dyn AvatarStorage>,
}

/// Builds the application state from configuration and an open pool
pub fn build_app_state(config: AppConfig, db: DatabaseConnection) -> anyhow::Result<AppState> {
    let crypto_key = CryptoKey::new(
        config
            .crypto_key
            .clone()
            .ok_or_else(|| anyhow::anyhow!("PERSONAS_CRYPTO_KEY is required"))?,
    )
    .map_err(|e| anyhow::anyhow!("invalid crypto key: {}", e))?;

    let storage: Arc<dyn AvatarStorage> = Arc::new(LocalAvatarStorage::new(
        &config.avatar_storage_root,
        &config.app_url,
    ));

    Ok(AppState {
        config: Arc::new(config),
        db,
        crypto_key,
        storage,
    })
}

/// Attach a request-scoped trace context so errors and logs can carry a
/// correlation id.
async fn trace_context_middleware(mut request: Request, next: Next) -> Response {
    let trace_id = format!("req-{}", &Uuid::new_v4().to_string()[..8]);
    let context = TraceContext {
        trace_id: trace_id.clone(),
    };

    request.extensions_mut().insert(context.clone());
    telemetry::with_trace_context(context, next.run(request)).await
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz))
        .route("/api/login", post(handlers::auth::login))
        .route("/api/auth/callback", get(handlers::auth::callback))
        .route("/api/logout", post(handlers::auth::logout))
        .route("/api/identities", post(handlers::auth::identities))
        .route("/api/me", get(handlers::auth::me))
        .route(
            "/api/agents",
            get(handlers::agents::list_agents).post(handlers::agents::mutate_agent),
        )
        .route(
            "/api/model-configs",
            get(handlers::model_configs::list_model_configs)
                .post(handlers::model_configs::mutate_model_config),
        )
        .route(
            "/api/model-providers",
            get(handlers::providers::list_model_providers),
        )
        .route("/api/preferences", post(handlers::preferences::update_preferences))
        .route("/avatars/{owner}/{file}", get(handlers::serve_avatar))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            session_middleware,
        ))
        .layer(axum::middleware::from_fn(trace_context_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
        .merge(
            utoipa_swagger_ui::SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()),
        )
}

/// Starts the server with the given configuration
pub async fn run_server(config: AppConfig, db: DatabaseConnection) -> anyhow::Result<()> {
    let addr = config
        .bind_addr()
        .map_err(|e| anyhow::anyhow!("Invalid server address: {}", e))?;
    let profile = config.profile.clone();

    let state = build_app_state(config, db)?;
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Server listening on: {}", addr);
    tracing::info!("Running in profile: {}", profile);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Build an `AppState` for tests with a throwaway crypto key.
pub fn create_test_app_state(config: AppConfig, db: DatabaseConnection) -> AppState {
    let crypto_key = CryptoKey::new(vec![0u8; 32]).expect("valid test crypto key");
    let storage: Arc<dyn AvatarStorage> = Arc::new(LocalAvatarStorage::new(
        &config.avatar_storage_root,
        &config.app_url,
    ));

    AppState {
        config: Arc::new(config),
        db,
        crypto_key,
        storage,
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::healthz,
        crate::handlers::serve_avatar,
        crate::handlers::auth::login,
        crate::handlers::auth::callback,
        crate::handlers::auth::logout,
        crate::handlers::auth::identities,
        crate::handlers::auth::me,
        crate::handlers::agents::list_agents,
        crate::handlers::agents::mutate_agent,
        crate::handlers::model_configs::list_model_configs,
        crate::handlers::model_configs::mutate_model_config,
        crate::handlers::providers::list_model_providers,
        crate::handlers::preferences::update_preferences,
    ),
    components(
        schemas(
            crate::models::ServiceInfo,
            crate::error::ApiError,
            crate::handlers::auth::MeResponse,
            crate::handlers::agents::AgentView,
            crate::handlers::agents::AgentsResponse,
            crate::handlers::model_configs::ModelConfigView,
            crate::handlers::model_configs::ModelConfigsResponse,
            crate::handlers::providers::ModelProviderView,
            crate::handlers::providers::ModelProvidersResponse,
            crate::handlers::preferences::Preferences,
        )
    ),
    info(
        title = "Personas API",
        description = "API for managing AI chat personas and model credentials",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;
