mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use crate::error::Result;
use crate::types::*;

/// Store defines the database interface.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // Product operations
    /// Inserts a product and returns the stored row. Fails with
    /// `Error::AlreadyExists` when the name collides ignoring case.
    fn create_product(&self, input: &ProductInput) -> Result<Product>;
    fn get_product(&self, id: i64) -> Result<Option<Product>>;
    fn find_product_id_by_name(&self, name: &str, excluding: Option<i64>) -> Result<Option<i64>>;
    fn list_products(&self, query: &ProductQuery) -> Result<Vec<Product>>;
    fn search_products(&self, name: &str, limit: u32) -> Result<Vec<Product>>;
    /// Overwrites every field of the product and records a log entry when the
    /// stock changes. Returns `None` when no product has this id.
    fn update_product(
        &self,
        id: i64,
        input: &ProductInput,
        changed_by: &str,
    ) -> Result<Option<Product>>;
    fn all_products(&self) -> Result<Vec<Product>>;
    fn count_products(&self) -> Result<i64>;

    // Inventory log operations
    fn list_history(&self, product_id: i64) -> Result<Vec<InventoryLog>>;
}
