//! # Model Configuration Handlers
//!
//! Owner-scoped CRUD for provider credential configurations. The secret API
//! key is accepted on insert and, behind an explicit `api_key_changed` gate,
//! on update; it is never serialized back out.

use std::sync::Arc;

use axum::{
    extract::{Form, State},
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::crypto::encrypt_api_key;
use crate::error::{ApiError, field_errors, forbidden, not_found, validation_error};
use crate::models::model_config;
use crate::repositories::{ModelConfigRepository, ModelProviderRepository};
use crate::server::AppState;

/// Model configuration as serialized in API responses
///
/// The stored ciphertext never leaves the service; `has_api_key` tells the
/// form whether a key is on file.
#[derive(Debug, Serialize, ToSchema)]
pub struct ModelConfigView {
    pub id: Uuid,
    pub name: String,
    pub model_provider_id: Uuid,
    pub is_default: bool,
    pub has_api_key: bool,
}

impl From<model_config::Model> for ModelConfigView {
    fn from(model: model_config::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            model_provider_id: model.model_provider_id,
            is_default: model.is_default,
            has_api_key: !model.api_key_ciphertext.is_empty(),
        }
    }
}

/// Response for the model configuration listing
#[derive(Debug, Serialize, ToSchema)]
pub struct ModelConfigsResponse {
    pub model_configs: Vec<ModelConfigView>,
    pub model_providers: Vec<super::providers::ModelProviderView>,
}

/// Form body for model configuration mutations
#[derive(Debug, Deserialize, ToSchema)]
pub struct ModelConfigForm {
    pub action: String,
    pub id: Option<String>,
    pub name: Option<String>,
    pub model_provider_id: Option<String>,
    pub api_key: Option<String>,
    /// `"1"` when the form's key field was edited; the stored key is
    /// untouched otherwise
    pub api_key_changed: Option<String>,
    pub is_default: Option<String>,
}

/// List the signed-in user's model configurations plus the provider catalog
#[utoipa::path(
    get,
    path = "/api/model-configs",
    responses(
        (status = 200, description = "Configurations owned by the requesting user", body = ModelConfigsResponse),
        (status = 401, description = "Not signed in", body = ApiError)
    ),
    tag = "model-configs"
)]
pub async fn list_model_configs(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<ModelConfigsResponse>, ApiError> {
    let configs = ModelConfigRepository::new(Arc::new(state.db.clone()))
        .list_for_owner(user.id)
        .await?;
    let providers = ModelProviderRepository::new(Arc::new(state.db.clone()))
        .list()
        .await?;

    Ok(Json(ModelConfigsResponse {
        model_configs: configs.into_iter().map(ModelConfigView::from).collect(),
        model_providers: providers
            .into_iter()
            .map(super::providers::ModelProviderView::from)
            .collect(),
    }))
}

/// Create, update, or delete a model configuration via form action dispatch
#[utoipa::path(
    post,
    path = "/api/model-configs",
    request_body(content = ModelConfigForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Mutation succeeded"),
        (status = 400, description = "Validation error", body = ApiError),
        (status = 401, description = "Not signed in", body = ApiError),
        (status = 403, description = "Configuration belongs to another user", body = ApiError),
        (status = 404, description = "Configuration not found", body = ApiError)
    ),
    tag = "model-configs"
)]
pub async fn mutate_model_config(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<ModelConfigForm>,
) -> Result<Response, ApiError> {
    match form.action.as_str() {
        "insert" => insert_config(&state, &user, form).await,
        "update" => update_config(&state, &user, form).await,
        "delete" => delete_config(&state, &user, form).await,
        other => Err(validation_error(
            "Unknown form action",
            json!({ "action": other }),
        )),
    }
}

async fn insert_config(
    state: &AppState,
    user: &CurrentUser,
    form: ModelConfigForm,
) -> Result<Response, ApiError> {
    let name = require_field(form.name.as_deref(), "name")?;
    let provider_id = require_provider(state, form.model_provider_id.as_deref()).await?;
    let api_key = require_field(form.api_key.as_deref(), "api_key")?;
    let is_default = truthy(form.is_default.as_deref());

    let ciphertext = encrypt_api_key(&state.crypto_key, user.id, provider_id, &api_key)
        .map_err(|e| ApiError::from(anyhow::Error::new(e)))?;

    let repo = ModelConfigRepository::new(Arc::new(state.db.clone()));
    if is_default {
        repo.clear_default_for_owner(user.id).await?;
    }
    let created = repo
        .create(user.id, provider_id, &name, ciphertext, is_default)
        .await?;

    info!(config_id = %created.id, owner_id = %user.id, "Model configuration created");
    Ok(Json(json!({ "success": true })).into_response())
}

async fn update_config(
    state: &AppState,
    user: &CurrentUser,
    form: ModelConfigForm,
) -> Result<Response, ApiError> {
    let repo = ModelConfigRepository::new(Arc::new(state.db.clone()));
    let existing = find_owned_config(&repo, user, form.id.as_deref()).await?;

    let name = require_field(form.name.as_deref(), "name")?;
    let provider_id = require_provider(state, form.model_provider_id.as_deref()).await?;
    let is_default = truthy(form.is_default.as_deref());

    // The stored key is only replaced when the client flags an edit and
    // actually sent a key; an untouched masked field changes nothing.
    let key_changed = form.api_key_changed.as_deref() == Some("1");
    let new_ciphertext = if key_changed {
        match form.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => Some(
                encrypt_api_key(&state.crypto_key, user.id, provider_id, key)
                    .map_err(|e| ApiError::from(anyhow::Error::new(e)))?,
            ),
            _ => None,
        }
    } else {
        None
    };

    // The ciphertext AAD binds the key to (owner, provider); carrying the
    // stored ciphertext over to a different provider would leave a key the
    // row's own ids can no longer decrypt.
    if provider_id != existing.model_provider_id && new_ciphertext.is_none() {
        return Err(field_errors(json!({
            "api_key": "Changing the provider requires re-entering the API key"
        })));
    }

    if is_default && !existing.is_default {
        repo.clear_default_for_owner(user.id).await?;
    }

    repo.update(existing.id, provider_id, &name, new_ciphertext, is_default)
        .await?;

    info!(config_id = %existing.id, "Model configuration updated");
    Ok(Json(json!({ "success": true })).into_response())
}

async fn delete_config(
    state: &AppState,
    user: &CurrentUser,
    form: ModelConfigForm,
) -> Result<Response, ApiError> {
    let repo = ModelConfigRepository::new(Arc::new(state.db.clone()));
    let existing = find_owned_config(&repo, user, form.id.as_deref()).await?;

    // Agents referencing this config have their reference nulled by the FK.
    repo.delete(existing.id).await?;

    info!(config_id = %existing.id, "Model configuration deleted");
    Ok(Json(json!({ "success": true })).into_response())
}

async fn find_owned_config(
    repo: &ModelConfigRepository,
    user: &CurrentUser,
    id: Option<&str>,
) -> Result<model_config::Model, ApiError> {
    let id = id
        .and_then(|raw| raw.parse::<Uuid>().ok())
        .ok_or_else(|| field_errors(json!({ "id": "A valid model config id is required" })))?;

    let config = repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| not_found("Model configuration not found"))?;

    if config.owner_id != user.id {
        warn!(config_id = %id, requester = %user.id, "Cross-user model config access rejected");
        return Err(forbidden(Some("Model configuration belongs to another user")));
    }

    Ok(config)
}

fn require_field(value: Option<&str>, field: &str) -> Result<String, ApiError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => {
            let mut fields = serde_json::Map::new();
            fields.insert(field.to_string(), json!("This field is required"));
            Err(field_errors(serde_json::Value::Object(fields)))
        }
    }
}

async fn require_provider(state: &AppState, raw: Option<&str>) -> Result<Uuid, ApiError> {
    let id = raw
        .and_then(|v| v.parse::<Uuid>().ok())
        .ok_or_else(|| {
            field_errors(json!({ "model_provider_id": "A valid provider id is required" }))
        })?;

    let repo = ModelProviderRepository::new(Arc::new(state.db.clone()));
    repo.find_by_id(id)
        .await?
        .map(|provider| provider.id)
        .ok_or_else(|| field_errors(json!({ "model_provider_id": "No such model provider" })))
}

fn truthy(value: Option<&str>) -> bool {
    matches!(value, Some("1") | Some("true") | Some("on"))
}
