//! Axum extractors for API handlers

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, OriginalUri, Query},
    http::{header::AUTHORIZATION, request::Parts},
};
use sf_auth::{extract_bearer_token, CurrentUser, JwtService};
use sf_core::config::AppConfig;
use sf_core::error::AppError;
use sf_db::{Repository, UserRepository};
use sf_models::User;
use sf_queries::{HypermediaProcessor, ParameterProcessor, QueryModel, RequestInfo};
use sqlx::PgPool;

use crate::error::{ApiError, ApiResult};

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: Option<PgPool>,
    pub jwt: JwtService,
    pub hypermedia: HypermediaProcessor,
    pub params: ParameterProcessor,
}

impl AppState {
    pub fn new(config: AppConfig, db: Option<PgPool>) -> Result<Self, AppError> {
        let params = ParameterProcessor::new(config.query.reference_offset()?);
        let hypermedia = HypermediaProcessor::new(config.server.public_url.clone());

        let expires_in = i64::try_from(config.auth.token_expiration_seconds)
            .map_err(|_| AppError::Config("auth.token_expiration_seconds is out of range".to_string()))?;
        let mut jwt = JwtService::new(config.auth.jwt_secret.as_bytes(), expires_in);
        if let Some(issuer) = &config.auth.issuer {
            jwt = jwt.with_issuer(issuer.clone());
        }

        Ok(Self {
            config: Arc::new(config),
            db,
            jwt,
            hypermedia,
            params,
        })
    }

    /// The pool, or 503 when the server started without a database
    pub fn pool(&self) -> ApiResult<&PgPool> {
        self.db
            .as_ref()
            .ok_or_else(|| ApiError::ServiceUnavailable("Database is not available".to_string()))
    }

    pub fn default_limit(&self) -> u64 {
        self.config.query.default_limit
    }
}

/// Authenticated user extractor
///
/// Resolves the bearer token to an active user and the union of their
/// roles' permissions.
pub struct AuthenticatedUser {
    pub current: CurrentUser,
    pub user: User,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);

        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(extract_bearer_token)
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

        let user_id = app_state.jwt.get_user_id(token)?;

        let repo = UserRepository::new(app_state.pool()?.clone());
        let row = repo
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| ApiError::unauthorized("Invalid token"))?;

        if !row.is_active() {
            tracing::debug!(user_id, "Rejected token for inactive user");
            return Err(ApiError::unauthorized("Account is locked"));
        }

        let permissions = repo.permissions(user_id).await?;
        let user = row.into_model();
        let mut current = CurrentUser::new(user.id, user.email.clone()).with_permissions(permissions);
        current.is_admin = user.is_admin;

        Ok(AuthenticatedUser { current, user })
    }
}

impl std::ops::Deref for AuthenticatedUser {
    type Target = CurrentUser;
    fn deref(&self) -> &Self::Target {
        &self.current
    }
}

/// Method, path and raw query of the incoming request, as seen before any
/// router nesting
pub struct CurrentRequest(pub RequestInfo);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentRequest
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let uri = parts
            .extensions
            .get::<OriginalUri>()
            .map(|original| original.0.clone())
            .unwrap_or_else(|| parts.uri.clone());

        Ok(CurrentRequest(RequestInfo::new(
            parts.method.as_str(),
            uri.path(),
            uri.query(),
        )))
    }
}

/// Parsed filter/sort/pagination parameters plus the request they came from
pub struct ListQuery {
    pub model: QueryModel,
    pub request: RequestInfo,
}

#[async_trait]
impl<S> FromRequestParts<S> for ListQuery
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let CurrentRequest(request) = CurrentRequest::from_request_parts(parts, state).await?;

        let Query(pairs) = Query::<Vec<(String, String)>>::try_from_uri(&parts.uri)
            .unwrap_or_else(|_| Query(Vec::new()));
        let model = app_state.params.process(pairs);

        Ok(ListQuery { model, request })
    }
}
