//! API error handling
//!
//! Every failure renders as
//! `{"errors": [{"error": "<code>", "message": "<text>"}]}`, with one entry
//! per message for validation failures.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use sf_auth::{JwtError, PasswordError};
use sf_core::error::{AppError, ValidationErrors};
use sf_db::RepositoryError;

const DATABASE_FAILURE: &str = "A database error occurred";
const INTERNAL_FAILURE: &str = "An internal error occurred";

/// API error types; the `Database` and `Internal` payloads are logged, never
/// sent to the client
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    Validation(ValidationErrors),
    Unauthorized(String),
    Forbidden(String),
    Conflict(String),
    ServiceUnavailable(String),
    Database(String),
    Internal(String),
}

impl ApiError {
    pub fn not_found(resource: &'static str, id: impl std::fmt::Display) -> Self {
        ApiError::NotFound(format!("{} with id {} not found", resource, id))
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        ApiError::Unauthorized(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        ApiError::Forbidden(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        ApiError::Conflict(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        ApiError::Internal(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Database(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "not_found",
            ApiError::Validation(_) => "validation_failed",
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::Conflict(_) => "conflict",
            ApiError::ServiceUnavailable(_) => "service_unavailable",
            ApiError::Database(_) => "database_error",
            ApiError::Internal(_) => "internal_error",
        }
    }

    fn entries(&self) -> Vec<ErrorEntry> {
        let code = self.error_code();
        match self {
            ApiError::Validation(errors) => {
                let mut entries: Vec<ErrorEntry> = errors
                    .errors
                    .iter()
                    .flat_map(|(field, messages)| {
                        messages.iter().map(move |message| ErrorEntry {
                            error: code,
                            message: format!("{} {}", field, message),
                            field: Some(field.clone()),
                        })
                    })
                    .collect();
                entries.extend(errors.base_errors.iter().map(|message| ErrorEntry {
                    error: code,
                    message: message.clone(),
                    field: None,
                }));
                entries
            }
            ApiError::NotFound(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::Conflict(msg)
            | ApiError::ServiceUnavailable(msg) => vec![ErrorEntry {
                error: code,
                message: msg.clone(),
                field: None,
            }],
            // Driver and runtime detail stays in the log
            ApiError::Database(_) => vec![ErrorEntry {
                error: code,
                message: DATABASE_FAILURE.to_string(),
                field: None,
            }],
            ApiError::Internal(_) => vec![ErrorEntry {
                error: code,
                message: INTERNAL_FAILURE.to_string(),
                field: None,
            }],
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorEntry {
    error: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<String>,
}

#[derive(Debug, Serialize)]
struct ErrorEnvelope {
    errors: Vec<ErrorEntry>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.error_code(), error = ?self, "Request failed");
        }
        let body = ErrorEnvelope {
            errors: self.entries(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        ApiError::Validation(errors)
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::NotFound { entity, field, value } => {
                ApiError::NotFound(format!("{} with {} {} not found", entity, field, value))
            }
            AppError::Unauthorized { message } => ApiError::Unauthorized(message),
            AppError::Forbidden { message } => ApiError::Forbidden(message),
            AppError::Validation(errors) => ApiError::Validation(errors),
            AppError::Conflict { message } => ApiError::Conflict(message),
            AppError::Database(message) => ApiError::Database(message),
            AppError::Internal(message) | AppError::Config(message) => ApiError::Internal(message),
        }
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(message) => ApiError::NotFound(message),
            RepositoryError::Conflict(message) => ApiError::Conflict(message),
            RepositoryError::Database(e) => ApiError::Database(e.to_string()),
        }
    }
}

impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::EncodingFailed(message) => ApiError::Internal(message),
            JwtError::Expired => ApiError::unauthorized("Token has expired"),
            JwtError::Missing => ApiError::unauthorized("Authentication required"),
            JwtError::Invalid(_) => ApiError::unauthorized("Invalid token"),
        }
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::{json, Value};

    async fn body_of(err: ApiError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_not_found_envelope() {
        let (status, body) = body_of(ApiError::not_found("Product", 9)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(
            body,
            json!({ "errors": [ { "error": "not_found", "message": "Product with id 9 not found" } ] })
        );
    }

    #[tokio::test]
    async fn test_validation_envelope_lists_each_message() {
        let mut errors = ValidationErrors::new();
        errors.add("email", "is not a valid email address");
        errors.add("price", "must be greater than or equal to 0");
        errors.add_base("Nothing to update");

        let (status, body) = body_of(errors.into()).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let entries = body["errors"].as_array().unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0]["field"], "email");
        assert_eq!(entries[0]["message"], "email is not a valid email address");
        assert_eq!(entries[2]["message"], "Nothing to update");
        assert!(entries[2].get("field").is_none());
    }

    #[test]
    fn test_repository_error_mapping() {
        let err: ApiError = RepositoryError::Conflict("SKU has already been taken".into()).into();
        assert_eq!(err.status_code(), StatusCode::CONFLICT);

        let err: ApiError = RepositoryError::Database(sqlx::Error::PoolTimedOut).into();
        assert_eq!(err.error_code(), "database_error");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_database_error_body_is_generic() {
        let err: ApiError = RepositoryError::Database(sqlx::Error::Protocol(
            "relation \"users\" does not exist at db-primary:5432".into(),
        ))
        .into();
        let (status, body) = body_of(err).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body,
            json!({ "errors": [ { "error": "database_error", "message": "A database error occurred" } ] })
        );
        assert!(!body.to_string().contains("db-primary"));
    }

    #[tokio::test]
    async fn test_internal_error_body_is_generic() {
        let (_, body) = body_of(ApiError::internal("task panicked at src/worker.rs")).await;
        assert_eq!(body["errors"][0]["message"], "An internal error occurred");
    }

    #[test]
    fn test_jwt_errors_are_unauthorized() {
        let err: ApiError = JwtError::Expired.into();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        let err: ApiError = JwtError::Invalid("bad signature".into()).into();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_app_error_mapping() {
        let err: ApiError = AppError::forbidden("Missing permission 'users.read'").into();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        let err: ApiError = AppError::not_found("User", 3).into();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }
}
