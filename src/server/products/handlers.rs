use std::sync::Arc;

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    response::IntoResponse,
};

use crate::error::Error;
use crate::server::AppState;
use crate::server::dto::{ListProductsParams, ProductRequest, SearchParams};
use crate::server::response::{ApiError, SERVER_ERROR, StoreOptionExt, StoreResultExt};
use crate::server::validation::{changed_by, validate_list_query, validate_product};
use crate::types::SEARCH_LIMIT;

fn json_body(body: Result<Json<ProductRequest>, JsonRejection>) -> Result<ProductRequest, ApiError> {
    body.map(|Json(req)| req)
        .map_err(|e| ApiError::bad_request(format!("Invalid JSON body: {}", e.body_text())))
}

fn product_id(path: Result<Path<i64>, PathRejection>) -> Result<i64, ApiError> {
    path.map(|Path(id)| id)
        .map_err(|e| ApiError::bad_request(format!("Invalid product id: {}", e.body_text())))
}

/// GET /products - Paginated, filterable listing
pub async fn list_products(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListProductsParams>,
) -> Result<impl IntoResponse, ApiError> {
    let query = validate_list_query(&params)?;

    let products = state
        .store
        .list_products(&query)
        .api_err("Failed to list products")?;

    Ok(Json(products))
}

/// GET /products/search - Case-insensitive name lookup
pub async fn search_products(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<impl IntoResponse, ApiError> {
    let name = params.name.unwrap_or_default();

    let products = state
        .store
        .search_products(&name, SEARCH_LIMIT)
        .api_err("Failed to search products")?;

    Ok(Json(products))
}

/// POST /products - Create a product
pub async fn create_product(
    State(state): State<Arc<AppState>>,
    body: Result<Json<ProductRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let req = json_body(body)?;
    let input = validate_product(&req)?;
    let store = state.store.as_ref();

    if store
        .find_product_id_by_name(&input.name, None)
        .api_err("Failed to check product name")?
        .is_some()
    {
        return Err(ApiError::bad_request("Product already exists"));
    }

    let product = match store.create_product(&input) {
        Ok(product) => product,
        Err(Error::AlreadyExists) => return Err(ApiError::bad_request("Product already exists")),
        Err(e) => {
            tracing::error!("Failed to create product: {e}");
            return Err(ApiError::internal(SERVER_ERROR));
        }
    };

    tracing::debug!("Created product {} ({})", product.id, product.name);

    Ok((StatusCode::CREATED, Json(product)))
}

/// PUT /products/{id} - Replace a product, logging any stock change
pub async fn update_product(
    State(state): State<Arc<AppState>>,
    path: Result<Path<i64>, PathRejection>,
    body: Result<Json<ProductRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let id = product_id(path)?;
    let req = json_body(body)?;
    let input = validate_product(&req)?;
    let changed_by = changed_by(&req);
    let store = state.store.as_ref();

    if store
        .find_product_id_by_name(&input.name, Some(id))
        .api_err("Failed to check product name")?
        .is_some()
    {
        return Err(ApiError::bad_request("Product name must be unique"));
    }

    let updated = match store.update_product(id, &input, &changed_by) {
        Ok(updated) => updated,
        Err(Error::AlreadyExists) => {
            return Err(ApiError::bad_request("Product name must be unique"));
        }
        Err(e) => {
            tracing::error!("Failed to update product {id}: {e}");
            return Err(ApiError::internal(SERVER_ERROR));
        }
    };

    let product = updated.or_not_found("Not found")?;

    Ok(Json(product))
}

/// GET /products/{id}/history - Stock changes, newest first
pub async fn product_history(
    State(state): State<Arc<AppState>>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let id = product_id(path)?;
    let history = state
        .store
        .list_history(id)
        .api_err("Failed to load product history")?;

    Ok(Json(history))
}
