use csv::Writer;

use super::CSV_COLUMNS;
use crate::error::{Error, Result};
use crate::types::Product;

/// Renders products as CSV. The header row is written even when there are
/// no products; missing brand and image become empty cells.
pub fn export_csv(products: &[Product]) -> Result<Vec<u8>> {
    let mut writer = Writer::from_writer(Vec::new());
    writer.write_record(CSV_COLUMNS)?;

    for product in products {
        let stock = product.stock.to_string();
        writer.write_record([
            product.name.as_str(),
            product.unit.as_str(),
            product.category.as_str(),
            product.brand.as_deref().unwrap_or(""),
            stock.as_str(),
            product.status.as_str(),
            product.image.as_deref().unwrap_or(""),
        ])?;
    }

    writer
        .into_inner()
        .map_err(|e| Error::Io(e.into_error()))
}
