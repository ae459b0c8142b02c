//! # Model Provider Handlers
//!
//! Public read-only listing of the seeded model provider catalog.

use std::sync::Arc;

use axum::{extract::State, response::Json};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::model_provider;
use crate::repositories::ModelProviderRepository;
use crate::server::AppState;

/// Model provider as serialized in API responses
#[derive(Debug, Serialize, ToSchema)]
pub struct ModelProviderView {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
}

impl From<model_provider::Model> for ModelProviderView {
    fn from(model: model_provider::Model) -> Self {
        Self {
            id: model.id,
            slug: model.slug,
            name: model.name,
        }
    }
}

/// Response containing the provider catalog
#[derive(Debug, Serialize, ToSchema)]
pub struct ModelProvidersResponse {
    pub model_providers: Vec<ModelProviderView>,
}

/// List all supported model providers, sorted by name
#[utoipa::path(
    get,
    path = "/api/model-providers",
    responses(
        (status = 200, description = "Provider catalog", body = ModelProvidersResponse),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "model-providers"
)]
pub async fn list_model_providers(
    State(state): State<AppState>,
) -> Result<Json<ModelProvidersResponse>, ApiError> {
    let providers = ModelProviderRepository::new(Arc::new(state.db.clone()))
        .list()
        .await?;

    Ok(Json(ModelProvidersResponse {
        model_providers: providers.into_iter().map(ModelProviderView::from).collect(),
    }))
}
