//! # Stockroom
//!
//! An inventory service: products with case-insensitively unique names, an
//! audit log of stock changes, and CSV import/export. Usable both as a
//! standalone binary and as a library.
//!
//! ## Library Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use stockroom::server::{AppState, create_router};
//! use stockroom::store::{SqliteStore, Store};
//!
//! let store = SqliteStore::new("./data.db").unwrap();
//! store.initialize().unwrap();
//!
//! let state = Arc::new(AppState::new(Arc::new(store)));
//! let router = create_router(state);
//! // Serve with axum...
//! ```

pub mod config;
pub mod error;
pub mod server;
pub mod store;
pub mod transfer;
pub mod types;
