//! API routes

use std::collections::BTreeMap;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use sf_core::traits::Entity;
use sf_models::{ConfigEntry, Product, Role, User};

use crate::extractors::AppState;
use crate::handlers::{auth, configuration, products, roles, users};

/// Create the complete API router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(api_root))
        .nest("/auth", auth_router())
        .nest(User::COLLECTION_PATH, users_router())
        .nest(Role::COLLECTION_PATH, roles_router())
        .nest(ConfigEntry::COLLECTION_PATH, configuration_router())
        .nest(Product::COLLECTION_PATH, products_router())
}

fn auth_router() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/me", get(auth::me))
        .route("/password", post(auth::change_password))
}

fn users_router() -> Router<AppState> {
    Router::new()
        .route("/", get(users::list_users).post(users::create_user))
        .route(
            "/:id",
            get(users::get_user)
                .patch(users::update_user)
                .delete(users::delete_user),
        )
        .route(
            "/:id/roles",
            get(users::list_user_roles).put(users::set_user_roles),
        )
}

fn roles_router() -> Router<AppState> {
    Router::new()
        .route("/", get(roles::list_roles).post(roles::create_role))
        .route(
            "/:id",
            get(roles::get_role)
                .patch(roles::update_role)
                .delete(roles::delete_role),
        )
}

fn configuration_router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(configuration::list_entries).post(configuration::create_entry),
        )
        .route(
            "/:id",
            get(configuration::get_entry)
                .patch(configuration::update_entry)
                .delete(configuration::delete_entry),
        )
}

fn products_router() -> Router<AppState> {
    Router::new()
        .route("/", get(products::list_products).post(products::create_product))
        .route(
            "/:id",
            get(products::get_product)
                .patch(products::update_product)
                .delete(products::delete_product),
        )
}

const COLLECTIONS: &[(&str, &str)] = &[
    ("users", User::COLLECTION_PATH),
    ("roles", Role::COLLECTION_PATH),
    ("configuration", ConfigEntry::COLLECTION_PATH),
    ("products", Product::COLLECTION_PATH),
    ("me", "/auth/me"),
];

async fn api_root(State(state): State<AppState>) -> Json<ApiRoot> {
    let base = state.hypermedia.base_url();
    let links = COLLECTIONS
        .iter()
        .map(|(name, path)| {
            (
                *name,
                RootLink {
                    href: format!("{}{}", base, path),
                },
            )
        })
        .collect();

    Json(ApiRoot {
        type_name: "Root",
        instance_name: "Storefront RS",
        version: env!("CARGO_PKG_VERSION"),
        links,
    })
}

#[derive(Serialize)]
struct ApiRoot {
    #[serde(rename = "_type")]
    type_name: &'static str,
    #[serde(rename = "instanceName")]
    instance_name: &'static str,
    version: &'static str,
    links: BTreeMap<&'static str, RootLink>,
}

#[derive(Serialize)]
struct RootLink {
    href: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use serde_json::Value;
    use sf_core::config::AppConfig;
    use tower::ServiceExt;

    fn app() -> Router {
        let state = AppState::new(AppConfig::default(), None).unwrap();
        router().with_state(state)
    }

    async fn send(request: Request<Body>) -> (StatusCode, Value) {
        let response = app().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_api_root_links() {
        let (status, body) = send(get("/")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["_type"], "Root");
        assert_eq!(body["links"]["products"]["href"], "http://localhost:8080/products");
        assert_eq!(body["links"]["me"]["href"], "http://localhost:8080/auth/me");
    }

    #[tokio::test]
    async fn test_protected_endpoints_require_token() {
        for uri in ["/users", "/users/1", "/roles", "/configuration", "/auth/me"] {
            let (status, body) = send(get(uri)).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{}", uri);
            assert_eq!(body["errors"][0]["error"], "unauthorized");
        }
    }

    #[tokio::test]
    async fn test_public_products_without_database() {
        let (status, body) = send(get("/products?limit=5")).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["errors"][0]["error"], "service_unavailable");
    }

    #[tokio::test]
    async fn test_product_write_requires_token() {
        let request = post_json("/products", serde_json::json!({ "name": "Oak table", "sku": "OAK-1", "price": 10.0 }));
        let (status, _) = send(request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_register_validates_before_database() {
        let request = post_json(
            "/auth/register",
            serde_json::json!({
                "email": "not-an-email",
                "password": "short",
                "firstName": "Ada",
                "lastName": "Lovelace"
            }),
        );
        let (status, body) = send(request).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let fields: Vec<&str> = body["errors"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|e| e["field"].as_str())
            .collect();
        assert!(fields.contains(&"email"));
        assert!(fields.contains(&"password"));
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let (status, _) = send(get("/orders")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
