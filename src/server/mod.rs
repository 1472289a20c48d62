pub mod dto;
mod products;
pub mod response;
mod router;
pub mod validation;

pub use products::{MAX_IMPORT_SIZE, products_router};
pub use router::{AppState, create_router};
