//! API handlers
//!
//! Each module covers one resource. Lists run the request's query model
//! through the repository; single-resource responses are wrapped the same
//! way with no offset, so they never carry a next link.

pub mod auth;
pub mod configuration;
pub mod products;
pub mod roles;
pub mod users;

use axum::{
    http::{header, StatusCode},
    Json,
};
use sf_core::traits::{Entity, Id};
use sf_queries::{HypermediaResponse, QueryResponse, RequestInfo};

use crate::error::{ApiError, ApiResult};
use crate::extractors::AppState;

/// Envelope response body
pub type Envelope<T> = Json<HypermediaResponse<T>>;

/// 201 with a `Location` header pointing at the new entity
pub type Created<T> = (StatusCode, [(header::HeaderName, String); 1], Envelope<T>);

pub(crate) fn many<R, M>(state: &AppState, request: &RequestInfo, response: QueryResponse<R>) -> Envelope<M>
where
    M: From<R>,
{
    Json(state.hypermedia.respond(response.map(M::from), request))
}

pub(crate) fn one<M>(state: &AppState, request: &RequestInfo, item: M) -> Envelope<M> {
    Json(state.hypermedia.respond(QueryResponse::one(item), request))
}

pub(crate) fn created<M: Entity>(state: &AppState, request: &RequestInfo, item: M) -> Created<M> {
    let location = format!("{}{}", state.hypermedia.base_url(), item.resource_path());
    (
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        one(state, request, item),
    )
}

pub(crate) fn found<T>(row: Option<T>, resource: &'static str, id: Id) -> ApiResult<T> {
    row.ok_or_else(|| ApiError::not_found(resource, id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;
    use chrono::Utc;
    use sf_core::config::AppConfig;
    use sf_models::Role;

    #[test]
    fn test_created_points_at_new_entity() {
        let state = AppState::new(AppConfig::default(), None).unwrap();
        let request = RequestInfo::get("/roles", None);
        let role = Role {
            id: 12,
            name: "editor".into(),
            description: None,
            permissions: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let response = created(&state, &request, role).into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(
            response.headers()[header::LOCATION],
            "http://localhost:8080/roles/12"
        );
    }

    #[test]
    fn test_found_names_the_resource() {
        match found::<Role>(None, Role::TYPE_NAME, 4) {
            Err(ApiError::NotFound(message)) => assert_eq!(message, "Role with id 4 not found"),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
