//! Authentication handlers
//!
//! Registration, login, the current user, and password changes.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use sf_auth::permissions::builtin;
use sf_auth::{hash_password, verify_password};
use sf_core::error::ValidationErrors;
use sf_db::{NewUserRecord, Repository, UserRepository};
use sf_models::{validate, validate_password, ChangePassword, Entity, Login, RegisterUser, User};

use super::{created, one, Created, Envelope};
use crate::error::{ApiError, ApiResult};
use crate::extractors::{AppState, AuthenticatedUser, CurrentRequest};

const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// Verified against when the email is unknown so both failures cost one argon2 run
const UNKNOWN_USER_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$c3RvcmVmcm9udGR1bW15$AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

/// Register a new account
///
/// POST /auth/register
pub async fn register(
    State(state): State<AppState>,
    CurrentRequest(request): CurrentRequest,
    Json(payload): Json<RegisterUser>,
) -> ApiResult<Created<User>> {
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
            status: Default::default(),
            is_admin: false,
        })
        .await?;

    if let Some(role) = &state.config.auth.default_role {
        if !repo.assign_role_by_name(row.id, role).await? {
            tracing::debug!(role = %role, "Default role does not exist, skipping assignment");
        }
    }

    tracing::info!(user_id = row.id, "User registered");
    Ok(created(&state, &request, row.into_model()))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
}

/// Exchange credentials for a bearer token
///
/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<Login>,
) -> ApiResult<Json<TokenResponse>> {
    validate(&payload)?;

    let repo = UserRepository::new(state.pool()?.clone());
    let Some(row) = repo.find_by_email(&payload.email).await? else {
        verify(payload.password, UNKNOWN_USER_HASH.to_string()).await?;
        tracing::debug!("Login attempt for unknown email");
        return Err(ApiError::unauthorized(INVALID_CREDENTIALS));
    };

    if !verify(payload.password, row.password_hash.clone()).await? {
        tracing::debug!(user_id = row.id, "Login attempt with wrong password");
        return Err(ApiError::unauthorized(INVALID_CREDENTIALS));
    }
    if !row.is_active() {
        return Err(ApiError::unauthorized("Account is locked"));
    }

    let issued = state.jwt.issue(row.id, Some(row.email.clone()))?;
    tracing::info!(user_id = row.id, "User logged in");

    Ok(Json(TokenResponse {
        access_token: issued.token,
        token_type: "Bearer",
        expires_in: issued.expires_in,
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    #[serde(flatten)]
    pub user: User,
    pub permissions: Vec<String>,
}

/// The authenticated user and their effective permissions
///
/// GET /auth/me
pub async fn me(
    State(state): State<AppState>,
    CurrentRequest(request): CurrentRequest,
    auth: AuthenticatedUser,
) -> ApiResult<Envelope<MeResponse>> {
    let permissions = if auth.is_admin {
        builtin::ALL.iter().map(|p| p.name.to_string()).collect()
    } else {
        auth.current.permissions().into_iter().map(str::to_string).collect()
    };

    Ok(one(
        &state,
        &request,
        MeResponse {
            user: auth.user,
            permissions,
        },
    ))
}

/// Change the authenticated user's password
///
/// POST /auth/password
pub async fn change_password(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    Json(payload): Json<ChangePassword>,
) -> ApiResult<StatusCode> {
    let mut errors = validate(&payload).err().unwrap_or_default();
    if let Err(password_errors) = validate_password(
        "newPassword",
        &payload.new_password,
        state.config.auth.password_min_length,
    ) {
        errors.merge(password_errors);
    }
    errors.into_result()?;

    let repo = UserRepository::new(state.pool()?.clone());
    let row = repo
        .find_by_id(auth.id)
        .await?
        .ok_or_else(|| ApiError::not_found(User::TYPE_NAME, auth.id))?;

    if !verify(payload.current_password, row.password_hash).await? {
        return Err(ValidationErrors::single("currentPassword", "is incorrect").into());
    }

    let password_hash = hash(payload.new_password).await?;
    repo.update_password(auth.id, &password_hash).await?;

    tracing::info!(user_id = auth.id, "Password changed");
    Ok(StatusCode::NO_CONTENT)
}

/// Argon2 off the async executor
pub(crate) async fn hash(password: String) -> ApiResult<String> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?
        .map_err(ApiError::from)
}

pub(crate) async fn verify(password: String, stored_hash: String) -> ApiResult<bool> {
    tokio::task::spawn_blocking(move || verify_password(&password, &stored_hash))
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?
        .map_err(ApiError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hash_round_trip() {
        let hashed = hash("s3cret-pass".to_string()).await.unwrap();
        assert!(verify("s3cret-pass".to_string(), hashed.clone()).await.unwrap());
        assert!(!verify("other-pass1".to_string(), hashed).await.unwrap());
    }

    #[tokio::test]
    async fn test_unknown_user_hash_never_matches() {
        assert!(!verify("s3cret-pass".to_string(), UNKNOWN_USER_HASH.to_string()).await.unwrap());
        assert!(!verify(String::new(), UNKNOWN_USER_HASH.to_string()).await.unwrap());
    }

    #[test]
    fn test_token_response_shape() {
        let body = serde_json::to_value(TokenResponse {
            access_token: "abc".to_string(),
            token_type: "Bearer",
            expires_in: 3600,
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({ "accessToken": "abc", "tokenType": "Bearer", "expiresIn": 3600 })
        );
    }
}
