//! Roles API handlers
//!
//! Every endpoint requires `roles.manage`.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use sf_auth::permissions::builtin::ROLES_MANAGE;
use sf_auth::permissions::unknown_permissions;
use sf_core::error::ValidationErrors;
use sf_core::traits::{Entity, Id};
use sf_db::{Repository, RoleRepository};
use sf_models::{validate, NewRole, Role, UpdateRole};

use super::{created, found, many, one, Created, Envelope};
use crate::error::ApiResult;
use crate::extractors::{AppState, AuthenticatedUser, CurrentRequest, ListQuery};

/// List roles
///
/// GET /roles
pub async fn list_roles(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    query: ListQuery,
) -> ApiResult<Envelope<Role>> {
    auth.require(&ROLES_MANAGE)?;

    let repo = RoleRepository::new(state.pool()?.clone());
    let rows = repo.list(&query.model, state.default_limit()).await?;
    Ok(many(&state, &query.request, rows))
}

/// GET /roles/:id
pub async fn get_role(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    Path(id): Path<Id>,
    CurrentRequest(request): CurrentRequest,
) -> ApiResult<Envelope<Role>> {
    auth.require(&ROLES_MANAGE)?;

    let repo = RoleRepository::new(state.pool()?.clone());
    let row = found(repo.find_by_id(id).await?, Role::TYPE_NAME, id)?;
    Ok(one(&state, &request, row.into()))
}

/// POST /roles
pub async fn create_role(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    CurrentRequest(request): CurrentRequest,
    Json(payload): Json<NewRole>,
) -> ApiResult<Created<Role>> {
    auth.require(&ROLES_MANAGE)?;

    let mut errors = validate(&payload).err().unwrap_or_default();
    errors.merge(check_permissions(&payload.permissions));
    errors.into_result()?;

    let repo = RoleRepository::new(state.pool()?.clone());
    let row = repo.create(payload).await?;

    tracing::info!(role_id = row.id, name = %row.name, "Role created");
    Ok(created(&state, &request, Role::from(row)))
}

/// PATCH /roles/:id
pub async fn update_role(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    Path(id): Path<Id>,
    CurrentRequest(request): CurrentRequest,
    Json(payload): Json<UpdateRole>,
) -> ApiResult<Envelope<Role>> {
    auth.require(&ROLES_MANAGE)?;

    let mut errors = validate(&payload).err().unwrap_or_default();
    if let Some(permissions) = &payload.permissions {
        errors.merge(check_permissions(permissions));
    }
    errors.into_result()?;

    let repo = RoleRepository::new(state.pool()?.clone());
    let row = repo.update(id, payload).await?;
    Ok(one(&state, &request, row.into()))
}

/// DELETE /roles/:id
pub async fn delete_role(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    Path(id): Path<Id>,
) -> ApiResult<StatusCode> {
    auth.require(&ROLES_MANAGE)?;

    let repo = RoleRepository::new(state.pool()?.clone());
    repo.delete(id).await?;

    tracing::info!(role_id = id, "Role deleted");
    Ok(StatusCode::NO_CONTENT)
}

fn check_permissions(permissions: &[String]) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    for name in unknown_permissions(permissions) {
        errors.add("permissions", format!("contains unknown permission '{}'", name));
    }
    errors
}
