//! Products API handlers
//!
//! Reads are public; writes require `products.write`.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use sf_auth::permissions::builtin::PRODUCTS_WRITE;
use sf_core::traits::{Entity, Id};
use sf_db::{ProductRepository, Repository};
use sf_models::{validate, NewProduct, Product, UpdateProduct};

use super::{created, found, many, one, Created, Envelope};
use crate::error::ApiResult;
use crate::extractors::{AppState, AuthenticatedUser, CurrentRequest, ListQuery};

/// List products
///
/// GET /products
pub async fn list_products(
    State(state): State<AppState>,
    query: ListQuery,
) -> ApiResult<Envelope<Product>> {
    let repo = ProductRepository::new(state.pool()?.clone());
    let rows = repo.list(&query.model, state.default_limit()).await?;
    Ok(many(&state, &query.request, rows))
}

/// GET /products/:id
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Id>,
    CurrentRequest(request): CurrentRequest,
) -> ApiResult<Envelope<Product>> {
    let repo = ProductRepository::new(state.pool()?.clone());
    let row = found(repo.find_by_id(id).await?, Product::TYPE_NAME, id)?;
    Ok(one(&state, &request, row.into()))
}

/// POST /products
pub async fn create_product(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    CurrentRequest(request): CurrentRequest,
    Json(payload): Json<NewProduct>,
) -> ApiResult<Created<Product>> {
    auth.require(&PRODUCTS_WRITE)?;
    validate(&payload)?;

    let repo = ProductRepository::new(state.pool()?.clone());
    let row = repo.create(payload).await?;

    tracing::info!(product_id = row.id, sku = %row.sku, "Product created");
    Ok(created(&state, &request, Product::from(row)))
}

/// PATCH /products/:id
pub async fn update_product(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    Path(id): Path<Id>,
    CurrentRequest(request): CurrentRequest,
    Json(payload): Json<UpdateProduct>,
) -> ApiResult<Envelope<Product>> {
    auth.require(&PRODUCTS_WRITE)?;
    validate(&payload)?;

    let repo = ProductRepository::new(state.pool()?.clone());
    let row = repo.update(id, payload).await?;
    Ok(one(&state, &request, row.into()))
}

/// DELETE /products/:id
pub async fn delete_product(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    Path(id): Path<Id>,
) -> ApiResult<StatusCode> {
    auth.require(&PRODUCTS_WRITE)?;

    let repo = ProductRepository::new(state.pool()?.clone());
    repo.delete(id).await?;

    tracing::info!(product_id = id, "Product deleted");
    Ok(StatusCode::NO_CONTENT)
}
