//! Configuration API handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use sf_auth::permissions::builtin::{CONFIGURATION_READ, CONFIGURATION_WRITE};
use sf_core::traits::{Entity, Id};
use sf_db::{ConfigEntryRepository, Repository};
use sf_models::{validate, ConfigEntry, NewConfigEntry, UpdateConfigEntry};

use super::{created, found, many, one, Created, Envelope};
use crate::error::ApiResult;
use crate::extractors::{AppState, AuthenticatedUser, CurrentRequest, ListQuery};

/// GET /configuration
pub async fn list_entries(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    query: ListQuery,
) -> ApiResult<Envelope<ConfigEntry>> {
    auth.require(&CONFIGURATION_READ)?;

    let repo = ConfigEntryRepository::new(state.pool()?.clone());
    let rows = repo.list(&query.model, state.default_limit()).await?;
    Ok(many(&state, &query.request, rows))
}

/// GET /configuration/:id
pub async fn get_entry(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    Path(id): Path<Id>,
    CurrentRequest(request): CurrentRequest,
) -> ApiResult<Envelope<ConfigEntry>> {
    auth.require(&CONFIGURATION_READ)?;

    let repo = ConfigEntryRepository::new(state.pool()?.clone());
    let row = found(repo.find_by_id(id).await?, ConfigEntry::TYPE_NAME, id)?;
    Ok(one(&state, &request, row.into()))
}

/// POST /configuration
pub async fn create_entry(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    CurrentRequest(request): CurrentRequest,
    Json(payload): Json<NewConfigEntry>,
) -> ApiResult<Created<ConfigEntry>> {
    auth.require(&CONFIGURATION_WRITE)?;
    validate(&payload)?;

    let repo = ConfigEntryRepository::new(state.pool()?.clone());
    let row = repo.create(payload).await?;

    tracing::info!(key = %row.key, "Configuration entry created");
    Ok(created(&state, &request, ConfigEntry::from(row)))
}

/// PATCH /configuration/:id
pub async fn update_entry(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    Path(id): Path<Id>,
    CurrentRequest(request): CurrentRequest,
    Json(payload): Json<UpdateConfigEntry>,
) -> ApiResult<Envelope<ConfigEntry>> {
    auth.require(&CONFIGURATION_WRITE)?;

    let repo = ConfigEntryRepository::new(state.pool()?.clone());
    let row = repo.update(id, payload).await?;

    tracing::info!(key = %row.key, "Configuration entry updated");
    Ok(one(&state, &request, row.into()))
}

/// DELETE /configuration/:id
pub async fn delete_entry(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    Path(id): Path<Id>,
) -> ApiResult<StatusCode> {
    auth.require(&CONFIGURATION_WRITE)?;

    let repo = ConfigEntryRepository::new(state.pool()?.clone());
    repo.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
