use csv::{ReaderBuilder, StringRecord, Trim};
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{
    DEFAULT_CATEGORY, DEFAULT_UNIT, DuplicateEntry, ImportReport, InvalidRow, ProductInput,
    status_for_stock,
};

/// One data row of an uploaded CSV, trimmed, with absent columns left empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ImportRecord {
    #[serde(skip)]
    pub line: u64,
    pub name: String,
    pub unit: String,
    pub category: String,
    pub brand: String,
    pub stock: String,
    pub status: String,
    pub image: String,
}

enum RowOutcome {
    Blank,
    Invalid(String),
    Ready(ProductInput),
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

/// Empty means zero. Integral decimals such as `4.0` are accepted as well.
fn parse_stock(value: &str) -> Option<i64> {
    if value.is_empty() {
        return Some(0);
    }
    if let Ok(n) = value.parse::<i64>() {
        return (n >= 0).then_some(n);
    }
    let f = value.parse::<f64>().ok()?;
    // i64::MAX is not exactly representable; stay below 2^63.
    let integral = f.is_finite() && f.fract() == 0.0 && (0.0..9.223_372_036_854_775e18).contains(&f);
    integral.then_some(f as i64)
}

impl ImportRecord {
    fn into_outcome(self) -> RowOutcome {
        if self.name.is_empty() {
            return RowOutcome::Blank;
        }

        let Some(stock) = parse_stock(&self.stock) else {
            return RowOutcome::Invalid(format!(
                "stock must be a non-negative integer, got '{}'",
                self.stock
            ));
        };

        let status = non_empty(&self.status).unwrap_or_else(|| status_for_stock(stock).to_string());

        RowOutcome::Ready(ProductInput {
            unit: non_empty(&self.unit).unwrap_or_else(|| DEFAULT_UNIT.to_string()),
            category: non_empty(&self.category).unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
            brand: non_empty(&self.brand),
            image: non_empty(&self.image),
            name: self.name,
            stock,
            status,
        })
    }
}

/// Parses the whole upload before anything is written. Header names are
/// matched ignoring case; unknown columns are ignored. An empty upload yields
/// no records.
pub fn parse_import(data: &[u8]) -> Result<Vec<ImportRecord>> {
    let mut reader = ReaderBuilder::new().trim(Trim::All).from_reader(data);

    let headers: StringRecord = reader
        .headers()?
        .iter()
        .map(|h| h.to_ascii_lowercase())
        .collect();
    if headers.iter().all(str::is_empty) {
        return Ok(Vec::new());
    }

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let mut record: ImportRecord = row.deserialize(Some(&headers))?;
        record.line = row.position().map_or(0, |p| p.line());
        records.push(record);
    }
    Ok(records)
}

/// Inserts records one at a time. A failure part way through leaves the rows
/// already added in place.
pub fn import_records(store: &dyn Store, records: Vec<ImportRecord>) -> Result<ImportReport> {
    let mut report = ImportReport::default();

    for record in records {
        let line = record.line;
        let name = record.name.clone();
        let input = match record.into_outcome() {
            RowOutcome::Blank => {
                report.skipped += 1;
                continue;
            }
            RowOutcome::Invalid(reason) => {
                tracing::debug!("Skipping CSV line {line}: {reason}");
                report.skipped += 1;
                report.invalid.push(InvalidRow { line, name, reason });
                continue;
            }
            RowOutcome::Ready(input) => input,
        };

        if let Some(existing_id) = store.find_product_id_by_name(&input.name, None)? {
            report.skipped += 1;
            report.duplicates.push(DuplicateEntry {
                name: input.name,
                existing_id,
            });
            continue;
        }

        match store.create_product(&input) {
            Ok(_) => report.added += 1,
            Err(Error::AlreadyExists) => {
                let existing_id = store
                    .find_product_id_by_name(&input.name, None)?
                    .ok_or(Error::NotFound)?;
                report.skipped += 1;
                report.duplicates.push(DuplicateEntry {
                    name: input.name,
                    existing_id,
                });
            }
            Err(e) => return Err(e),
        }
    }

    Ok(report)
}

/// Parses and imports a CSV upload.
pub fn import_csv(store: &dyn Store, data: &[u8]) -> Result<ImportReport> {
    let records = parse_import(data)?;
    let report = import_records(store, records)?;
    tracing::info!(
        "CSV import finished: {} added, {} skipped ({} duplicates)",
        report.added,
        report.skipped,
        report.duplicates.len()
    );
    Ok(report)
}
