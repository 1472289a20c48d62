use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const STATUS_IN_STOCK: &str = "In Stock";
pub const STATUS_OUT_OF_STOCK: &str = "Out of Stock";

pub const DEFAULT_UNIT: &str = "pcs";
pub const DEFAULT_CATEGORY: &str = "Uncategorized";
pub const DEFAULT_CHANGED_BY: &str = "admin";

/// Status assigned when a write does not supply one.
#[must_use]
pub fn status_for_stock(stock: i64) -> &'static str {
    if stock > 0 {
        STATUS_IN_STOCK
    } else {
        STATUS_OUT_OF_STOCK
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub unit: String,
    pub category: String,
    pub brand: Option<String>,
    pub stock: i64,
    pub status: String,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One stock change. Written by `update_product` only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryLog {
    pub id: i64,
    pub product_id: i64,
    pub old_stock: i64,
    pub new_stock: i64,
    pub changed_by: String,
    pub timestamp: DateTime<Utc>,
}

/// Validated field set for creating or updating a product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductInput {
    pub name: String,
    pub unit: String,
    pub category: String,
    pub brand: Option<String>,
    pub stock: i64,
    pub status: String,
    pub image: Option<String>,
}

impl ProductInput {
    /// Field tuple in export column order.
    #[must_use]
    pub fn from_product(product: &Product) -> Self {
        Self {
            name: product.name.clone(),
            unit: product.unit.clone(),
            category: product.category.clone(),
            brand: product.brand.clone(),
            stock: product.stock,
            status: product.status.clone(),
            image: product.image.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateEntry {
    pub name: String,
    #[serde(rename = "existingId")]
    pub existing_id: i64,
}

/// A CSV row rejected for a reason other than a blank or duplicate name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidRow {
    /// 1-based line number in the uploaded file, header included.
    pub line: u64,
    pub name: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReport {
    pub added: u64,
    pub skipped: u64,
    pub duplicates: Vec<DuplicateEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub invalid: Vec<InvalidRow>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_for_stock() {
        assert_eq!(status_for_stock(3), "In Stock");
        assert_eq!(status_for_stock(0), "Out of Stock");
    }

    #[test]
    fn test_import_report_wire_format() {
        let report = ImportReport {
            added: 1,
            skipped: 1,
            duplicates: vec![DuplicateEntry {
                name: "Widget".to_string(),
                existing_id: 7,
            }],
            invalid: Vec::new(),
        };
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["duplicates"][0]["existingId"], 7);
        assert!(value.get("invalid").is_none());
    }
}
