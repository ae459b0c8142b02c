//! # Agent Handlers
//!
//! Listing and form-action mutation of agent profiles. The POST endpoint
//! accepts a multipart form whose `action` field selects insert, update, or
//! delete, matching the submit buttons on the agents page.

use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    response::{IntoResponse, Json, Redirect, Response},
};
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::error::{ApiError, field_errors, forbidden, not_found, validation_error};
use crate::models::agent;
use crate::repositories::{AgentInput, AgentRepository, ModelConfigRepository};
use crate::server::AppState;
use crate::storage::key_from_public_url;

/// Agent as serialized in API responses
#[derive(Debug, Serialize, ToSchema)]
pub struct AgentView {
    pub id: Uuid,
    pub name: String,
    pub is_public: bool,
    pub avatar_url: Option<String>,
    pub system_prompt: Option<String>,
    pub bio: Option<String>,
    pub lore: Option<String>,
    pub model_config_id: Option<Uuid>,
}

impl From<agent::Model> for AgentView {
    fn from(model: agent::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            is_public: model.is_public,
            avatar_url: model.avatar_url,
            system_prompt: model.system_prompt,
            bio: model.bio,
            lore: model.lore,
            model_config_id: model.model_config_id,
        }
    }
}

/// Response for the agents listing
#[derive(Debug, Serialize, ToSchema)]
pub struct AgentsResponse {
    pub agents: Vec<AgentView>,
}

/// Parsed multipart submission for the agents endpoint
#[derive(Debug, Default)]
struct AgentForm {
    action: Option<String>,
    id: Option<String>,
    name: Option<String>,
    is_public: bool,
    system_prompt: Option<String>,
    bio: Option<String>,
    lore: Option<String>,
    model_config_id: Option<String>,
    avatar: Option<AvatarUpload>,
}

#[derive(Debug)]
struct AvatarUpload {
    extension: String,
    bytes: Vec<u8>,
}

/// List the signed-in user's agents
#[utoipa::path(
    get,
    path = "/api/agents",
    responses(
        (status = 200, description = "Agents owned by the requesting user", body = AgentsResponse),
        (status = 401, description = "Not signed in", body = ApiError)
    ),
    tag = "agents"
)]
pub async fn list_agents(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<AgentsResponse>, ApiError> {
    let repo = AgentRepository::new(Arc::new(state.db.clone()));
    let agents = repo.list_for_owner(user.id).await?;

    Ok(Json(AgentsResponse {
        agents: agents.into_iter().map(AgentView::from).collect(),
    }))
}

/// Create, update, or delete an agent via form action dispatch
#[utoipa::path(
    post,
    path = "/api/agents",
    responses(
        (status = 200, description = "Update or delete succeeded"),
        (status = 303, description = "Insert succeeded, redirect to /agents"),
        (status = 400, description = "Validation error", body = ApiError),
        (status = 401, description = "Not signed in", body = ApiError),
        (status = 403, description = "Agent belongs to another user", body = ApiError),
        (status = 404, description = "Agent not found", body = ApiError)
    ),
    tag = "agents"
)]
pub async fn mutate_agent(
    State(state): State<AppState>,
    user: CurrentUser,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let form = parse_agent_form(multipart).await?;

    match form.action.as_deref() {
        Some("insert") => insert_agent(&state, &user, form).await,
        Some("update") => update_agent(&state, &user, form).await,
        Some("delete") => delete_agent(&state, &user, form).await,
        other => Err(validation_error(
            "Unknown form action",
            json!({ "action": other.unwrap_or("<missing>") }),
        )),
    }
}

async fn insert_agent(
    state: &AppState,
    user: &CurrentUser,
    form: AgentForm,
) -> Result<Response, ApiError> {
    let name = require_name(&form)?;
    let model_config_id = resolve_model_config(state, user, form.model_config_id.as_deref()).await?;

    // The blob goes up before the row exists; an insert failure can strand a
    // blob, which the storage layout keeps scoped under the owner's prefix.
    let avatar_url = match form.avatar {
        Some(upload) => Some(store_avatar(state, user.id, &upload).await?),
        None => None,
    };

    let repo = AgentRepository::new(Arc::new(state.db.clone()));
    let created = repo
        .create(
            user.id,
            AgentInput {
                name,
                is_public: form.is_public,
                avatar_url,
                system_prompt: form.system_prompt,
                bio: form.bio,
                lore: form.lore,
                model_config_id,
            },
        )
        .await?;

    info!(agent_id = %created.id, owner_id = %user.id, "Agent created");
    Ok(Redirect::to("/agents").into_response())
}

async fn update_agent(
    state: &AppState,
    user: &CurrentUser,
    form: AgentForm,
) -> Result<Response, ApiError> {
    let repo = AgentRepository::new(Arc::new(state.db.clone()));
    let existing = find_owned_agent(&repo, user, form.id.as_deref()).await?;
    let name = require_name(&form)?;
    let model_config_id = resolve_model_config(state, user, form.model_config_id.as_deref()).await?;

    let previous_avatar = existing.avatar_url.clone();

    let avatar_url = match form.avatar {
        Some(upload) => Some(store_avatar(state, user.id, &upload).await?),
        None => previous_avatar.clone(),
    };
    let replaced_avatar = avatar_url != previous_avatar;

    repo.update(
        existing.id,
        AgentInput {
            name,
            is_public: form.is_public,
            avatar_url,
            system_prompt: form.system_prompt,
            bio: form.bio,
            lore: form.lore,
            model_config_id,
        },
    )
    .await?;

    // Stale blob cleanup is best effort: the row already points at the new
    // blob, so a failed delete only leaves an orphan behind.
    if replaced_avatar {
        if let Some(old_url) = previous_avatar {
            discard_avatar_blob(state, &old_url).await;
        }
    }

    info!(agent_id = %existing.id, "Agent updated");
    Ok(Json(json!({ "success": true })).into_response())
}

async fn delete_agent(
    state: &AppState,
    user: &CurrentUser,
    form: AgentForm,
) -> Result<Response, ApiError> {
    let repo = AgentRepository::new(Arc::new(state.db.clone()));
    let existing = find_owned_agent(&repo, user, form.id.as_deref()).await?;

    repo.delete(existing.id).await?;

    if let Some(avatar_url) = existing.avatar_url {
        discard_avatar_blob(state, &avatar_url).await;
    }

    info!(agent_id = %existing.id, "Agent deleted");
    Ok(Json(json!({ "success": true })).into_response())
}

/// Fetch an agent and enforce ownership: 404 for unknown ids, 403 when the
/// row belongs to someone else.
async fn find_owned_agent(
    repo: &AgentRepository,
    user: &CurrentUser,
    id: Option<&str>,
) -> Result<agent::Model, ApiError> {
    let id = id
        .and_then(|raw| raw.parse::<Uuid>().ok())
        .ok_or_else(|| field_errors(json!({ "id": "A valid agent id is required" })))?;

    let agent = repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| not_found("Agent not found"))?;

    if agent.owner_id != user.id {
        warn!(agent_id = %id, owner_id = %agent.owner_id, requester = %user.id, "Cross-user agent access rejected");
        return Err(forbidden(Some("Agent belongs to another user")));
    }

    Ok(agent)
}

const NAME_MAX_CHARS: usize = 255;

fn require_name(form: &AgentForm) -> Result<String, ApiError> {
    let name = match form.name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => name,
        _ => return Err(field_errors(json!({ "name": "Name is required" }))),
    };

    if name.chars().count() > NAME_MAX_CHARS {
        return Err(field_errors(json!({
            "name": format!("Name must be at most {} characters", NAME_MAX_CHARS)
        })));
    }

    Ok(name.to_string())
}

/// Validate an optional model config reference against the requester's own
/// configurations.
async fn resolve_model_config(
    state: &AppState,
    user: &CurrentUser,
    raw: Option<&str>,
) -> Result<Option<Uuid>, ApiError> {
    let Some(raw) = raw.filter(|v| !v.is_empty()) else {
        return Ok(None);
    };

    let id = raw.parse::<Uuid>().map_err(|_| {
        field_errors(json!({ "model_config_id": "Must be a valid model config id" }))
    })?;

    let repo = ModelConfigRepository::new(Arc::new(state.db.clone()));
    match repo.find_by_id(id).await? {
        Some(config) if config.owner_id == user.id => Ok(Some(id)),
        _ => Err(field_errors(
            json!({ "model_config_id": "No such model configuration" }),
        )),
    }
}

async fn store_avatar(
    state: &AppState,
    owner_id: Uuid,
    upload: &AvatarUpload,
) -> Result<String, ApiError> {
    let key = state
        .storage
        .put(owner_id, &upload.extension, &upload.bytes)
        .await
        .map_err(|e| match e {
            crate::storage::StorageError::UnsupportedType(ext) => field_errors(
                json!({ "avatar": format!("Unsupported avatar file type '.{}'", ext) }),
            ),
            other => ApiError::from(anyhow::Error::new(other)),
        })?;

    Ok(state.storage.public_url(&key))
}

/// Best-effort removal of a stored avatar blob. URLs that do not point into
/// the avatar store are ignored.
async fn discard_avatar_blob(state: &AppState, url: &str) {
    let Some(key) = key_from_public_url(url) else {
        return;
    };

    if let Err(e) = state.storage.delete(&key).await {
        warn!(key, "Stale avatar blob cleanup failed: {}", e);
    }
}

async fn parse_agent_form(mut multipart: Multipart) -> Result<AgentForm, ApiError> {
    let mut form = AgentForm::default();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        validation_error("Malformed multipart body", json!({ "body": e.to_string() }))
    })? {
        let Some(name) = field.name().map(|n| n.to_string()) else {
            continue;
        };

        match name.as_str() {
            "avatar" => {
                let filename = field.file_name().map(|f| f.to_string());
                let bytes = field.bytes().await.map_err(|e| {
                    validation_error("Failed to read avatar upload", json!({ "avatar": e.to_string() }))
                })?;

                // Browsers submit an empty file part when no avatar is chosen.
                if bytes.is_empty() {
                    continue;
                }

                let extension = filename
                    .as_deref()
                    .and_then(|f| f.rsplit_once('.').map(|(_, ext)| ext.to_string()))
                    .ok_or_else(|| {
                        field_errors(json!({ "avatar": "Avatar file must have an extension" }))
                    })?;

                form.avatar = Some(AvatarUpload {
                    extension,
                    bytes: bytes.to_vec(),
                });
            }
            other => {
                let value = field.text().await.map_err(|e| {
                    validation_error(
                        "Malformed multipart body",
                        json!({ "field": other, "error": e.to_string() }),
                    )
                })?;

                match other {
                    "action" => form.action = Some(value),
                    "id" => form.id = Some(value),
                    "name" => form.name = Some(value),
                    "is_public" => {
                        form.is_public = matches!(value.as_str(), "1" | "true" | "on")
                    }
                    "system_prompt" => form.system_prompt = non_empty(value),
                    "bio" => form.bio = non_empty(value),
                    "lore" => form.lore = non_empty(value),
                    "model_config_id" => form.model_config_id = Some(value),
                    _ => {}
                }
            }
        }
    }

    Ok(form)
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() { None } else { Some(value) }
}
