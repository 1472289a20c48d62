use serde_json::Value;

use crate::server::dto::{ListProductsParams, ProductRequest};
use crate::server::response::{ApiError, FieldError};
use crate::types::{
    DEFAULT_CHANGED_BY, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT, ProductInput, ProductQuery, SortField,
    SortOrder, status_for_stock,
};

const MAX_TEXT_LEN: usize = 255;
const MAX_IMAGE_LEN: usize = 2048;

fn trimmed(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn required_text(
    value: Option<&str>,
    field: &'static str,
    errors: &mut Vec<FieldError>,
) -> Option<String> {
    match trimmed(value) {
        None => {
            errors.push(FieldError::new(field, format!("{field} is required")));
            None
        }
        Some(v) if v.chars().count() > MAX_TEXT_LEN => {
            errors.push(FieldError::new(
                field,
                format!("{field} cannot exceed {MAX_TEXT_LEN} characters"),
            ));
            None
        }
        Some(v) => Some(v),
    }
}

fn parse_stock(value: Option<&Value>) -> Result<i64, FieldError> {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    match parsed {
        Some(stock) if stock >= 0 => Ok(stock),
        _ => Err(FieldError::new(
            "stock",
            "stock must be a non-negative integer",
        )),
    }
}

/// Checks a create/update body and normalizes it into a `ProductInput`.
/// Every failing field is reported, not just the first.
pub fn validate_product(req: &ProductRequest) -> Result<ProductInput, ApiError> {
    let mut errors = Vec::new();

    let name = required_text(req.name.as_deref(), "name", &mut errors);
    let unit = required_text(req.unit.as_deref(), "unit", &mut errors);
    let category = required_text(req.category.as_deref(), "category", &mut errors);
    let stock = match parse_stock(req.stock.as_ref()) {
        Ok(stock) => Some(stock),
        Err(e) => {
            errors.push(e);
            None
        }
    };

    let image = trimmed(req.image.as_deref());
    if image.as_ref().is_some_and(|i| i.len() > MAX_IMAGE_LEN) {
        errors.push(FieldError::new(
            "image",
            format!("image cannot exceed {MAX_IMAGE_LEN} characters"),
        ));
    }

    match (name, unit, category, stock) {
        (Some(name), Some(unit), Some(category), Some(stock)) if errors.is_empty() => {
            Ok(ProductInput {
                name,
                unit,
                category,
                brand: trimmed(req.brand.as_deref()),
                stock,
                status: trimmed(req.status.as_deref())
                    .unwrap_or_else(|| status_for_stock(stock).to_string()),
                image,
            })
        }
        _ => Err(ApiError::validation(errors)),
    }
}

/// Who to record against a stock change.
pub fn changed_by(req: &ProductRequest) -> String {
    trimmed(req.changed_by.as_deref()).unwrap_or_else(|| DEFAULT_CHANGED_BY.to_string())
}

fn parse_bounded(
    value: Option<&str>,
    field: &'static str,
    default: u32,
    max: u32,
) -> Result<u32, FieldError> {
    let Some(raw) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(default);
    };
    match raw.parse::<u32>() {
        Ok(n) if (1..=max).contains(&n) => Ok(n),
        _ => Err(FieldError::new(
            field,
            format!("{field} must be an integer between 1 and {max}"),
        )),
    }
}

/// Turns raw listing parameters into a query. `sort` and `order` are checked
/// against fixed allow-lists before they reach SQL.
pub fn validate_list_query(params: &ListProductsParams) -> Result<ProductQuery, ApiError> {
    let mut errors = Vec::new();
    let mut query = ProductQuery::default();

    match parse_bounded(params.page.as_deref(), "page", 1, u32::MAX) {
        Ok(page) => query.page = page,
        Err(e) => errors.push(e),
    }
    match parse_bounded(
        params.limit.as_deref(),
        "limit",
        DEFAULT_LIST_LIMIT,
        MAX_LIST_LIMIT,
    ) {
        Ok(limit) => query.limit = limit,
        Err(e) => errors.push(e),
    }

    if let Some(sort) = trimmed(params.sort.as_deref()) {
        match SortField::parse(&sort) {
            Some(field) => query.sort = field,
            None => {
                let allowed: Vec<&str> = SortField::ALL.iter().map(|f| f.column()).collect();
                errors.push(FieldError::new(
                    "sort",
                    format!("sort must be one of: {}", allowed.join(", ")),
                ));
            }
        }
    }

    if let Some(order) = trimmed(params.order.as_deref()) {
        match SortOrder::parse(&order) {
            Some(order) => query.order = order,
            None => errors.push(FieldError::new("order", "order must be asc or desc")),
        }
    }

    query.category = trimmed(params.category.as_deref());
    query.name_contains = params.q.clone().filter(|q| !q.is_empty());

    if errors.is_empty() {
        Ok(query)
    } else {
        Err(ApiError::validation(errors))
    }
}
