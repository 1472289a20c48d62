//! CSV import and export of the product table.
//!
//! Both directions use the same fixed column set, so an export can be fed back
//! into [`import_csv`] on another instance.

mod export;
mod import;

pub use export::export_csv;
pub use import::{ImportRecord, import_csv, import_records, parse_import};

/// Column order shared by export and import.
pub const CSV_COLUMNS: [&str; 7] = ["name", "unit", "category", "brand", "stock", "status", "image"];

pub const EXPORT_FILENAME: &str = "products_export.csv";
