mod handlers;
mod transfer;

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post, put},
};

use crate::server::AppState;

/// Largest accepted CSV upload.
pub const MAX_IMPORT_SIZE: usize = 10 * 1024 * 1024;

pub fn products_router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/products",
            get(handlers::list_products).post(handlers::create_product),
        )
        .route("/products/search", get(handlers::search_products))
        .route(
            "/products/import",
            post(transfer::import_products).layer(DefaultBodyLimit::max(MAX_IMPORT_SIZE)),
        )
        .route("/products/export", get(transfer::export_products))
        .route("/products/{id}", put(handlers::update_product))
        .route("/products/{id}/history", get(handlers::product_history))
}
