//! Users API handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use sf_auth::permissions::builtin::{ROLES_MANAGE, USERS_READ, USERS_WRITE};
use sf_core::error::ValidationErrors;
use sf_core::traits::{Entity, Id};
use sf_db::{NewUserRecord, Repository, RepositoryError, UserRepository};
use sf_models::{validate, validate_password, AssignRoles, NewUser, Role, UpdateUser, User};
use sf_queries::QueryResponse;

use super::auth::hash;
use super::{created, found, many, one, Created, Envelope};
use crate::error::{ApiError, ApiResult};
use crate::extractors::{AppState, AuthenticatedUser, CurrentRequest, ListQuery};

/// List users
///
/// GET /users
pub async fn list_users(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    query: ListQuery,
) -> ApiResult<Envelope<User>> {
    auth.require(&USERS_READ)?;

    let repo = UserRepository::new(state.pool()?.clone());
    let rows = repo.list(&query.model, state.default_limit()).await?;
    Ok(many(&state, &query.request, rows))
}

/// Get a single user
///
/// GET /users/:id
pub async fn get_user(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    Path(id): Path<Id>,
    CurrentRequest(request): CurrentRequest,
) -> ApiResult<Envelope<User>> {
    if !auth.is_self(id) {
        auth.require(&USERS_READ)?;
    }

    let repo = UserRepository::new(state.pool()?.clone());
    let row = found(repo.find_by_id(id).await?, User::TYPE_NAME, id)?;
    Ok(one(&state, &request, row.into_model()))
}

/// Create a user
///
/// POST /users
pub async fn create_user(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    CurrentRequest(request): CurrentRequest,
    Json(payload): Json<NewUser>,
) -> ApiResult<Created<User>> {
    auth.require(&USERS_WRITE)?;

    let mut errors = validate(&payload).err().unwrap_or_default();
    if let Err(password_errors) =
        validate_password("password", &payload.password, state.config.auth.password_min_length)
    {
        errors.merge(password_errors);
    }
    errors.into_result()?;

    let repo = UserRepository::new(state.pool()?.clone());
    let password_hash = hash(payload.password.clone()).await?;
    let row = repo
        .create(NewUserRecord {
            email: payload.email,
            first_name: payload.first_name,
            last_name: payload.last_name,
            password_hash,
            status: payload.status,
            is_admin: payload.is_admin,
        })
        .await?;

    tracing::info!(user_id = row.id, created_by = auth.id, "User created");
    Ok(created(&state, &request, row.into_model()))
}

/// Update a user; users may edit their own name without `users.write`
///
/// PATCH /users/:id
pub async fn update_user(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    Path(id): Path<Id>,
    CurrentRequest(request): CurrentRequest,
    Json(payload): Json<UpdateUser>,
) -> ApiResult<Envelope<User>> {
    let self_service = auth.is_self(id) && !payload.touches_privileged_fields();
    if !self_service {
        auth.require(&USERS_WRITE)?;
    }

    validate(&payload)?;

    let repo = UserRepository::new(state.pool()?.clone());
    let row = repo.update(id, payload).await?;
    Ok(one(&state, &request, row.into_model()))
}

/// Delete a user
///
/// DELETE /users/:id
pub async fn delete_user(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    Path(id): Path<Id>,
) -> ApiResult<StatusCode> {
    auth.require(&USERS_WRITE)?;

    if auth.is_self(id) {
        return Err(ApiError::conflict("You cannot delete your own account"));
    }

    let repo = UserRepository::new(state.pool()?.clone());
    repo.delete(id).await?;

    tracing::info!(user_id = id, deleted_by = auth.id, "User deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Roles held by a user
///
/// GET /users/:id/roles
pub async fn list_user_roles(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    Path(id): Path<Id>,
    CurrentRequest(request): CurrentRequest,
) -> ApiResult<Envelope<Role>> {
    if !auth.is_self(id) {
        auth.require(&USERS_READ)?;
    }

    let repo = UserRepository::new(state.pool()?.clone());
    if !repo.exists(id).await? {
        return Err(ApiError::not_found(User::TYPE_NAME, id));
    }

    let roles = repo.roles(id).await?;
    Ok(many(&state, &request, QueryResponse::many(roles)))
}

/// Replace the roles held by a user
///
/// PUT /users/:id/roles
pub async fn set_user_roles(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    Path(id): Path<Id>,
    CurrentRequest(request): CurrentRequest,
    Json(payload): Json<AssignRoles>,
) -> ApiResult<Envelope<Role>> {
    auth.require(&ROLES_MANAGE)?;

    let repo = UserRepository::new(state.pool()?.clone());
    if !repo.exists(id).await? {
        return Err(ApiError::not_found(User::TYPE_NAME, id));
    }

    let roles = match repo.set_roles(id, &payload.unique_ids()).await {
        Ok(roles) => roles,
        Err(RepositoryError::NotFound(_)) => {
            return Err(ValidationErrors::single("roleIds", "contains unknown roles").into());
        }
        Err(e) => return Err(e.into()),
    };

    Ok(many(&state, &request, QueryResponse::many(roles)))
}
