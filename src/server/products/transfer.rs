use std::sync::Arc;

use axum::{
    Json,
    extract::{
        Multipart, State,
        multipart::{MultipartError, MultipartRejection},
    },
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::IntoResponse,
};

use super::MAX_IMPORT_SIZE;
use crate::error::Error;
use crate::server::AppState;
use crate::server::response::{ApiError, SERVER_ERROR, StoreResultExt};
use crate::transfer::{EXPORT_FILENAME, export_csv, import_csv};

const FILE_REQUIRED: &str = "CSV file required (field \"file\")";

fn multipart_error(context: &str, e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::payload_too_large(format!(
            "CSV upload exceeds maximum allowed size ({MAX_IMPORT_SIZE} bytes)"
        ))
    } else {
        ApiError::bad_request(format!("{context}: {}", e.body_text()))
    }
}

async fn read_file_field(multipart: &mut Multipart) -> Result<Vec<u8>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error("Failed to read multipart", e))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let data = field
            .bytes()
            .await
            .map_err(|e| multipart_error("Failed to read file", e))?;
        return Ok(data.to_vec());
    }

    Err(ApiError::bad_request(FILE_REQUIRED))
}

/// POST /products/import - Bulk insert from an uploaded CSV
pub async fn import_products(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let mut multipart = multipart.map_err(|_| ApiError::bad_request(FILE_REQUIRED))?;
    let data = read_file_field(&mut multipart).await?;

    let report = match import_csv(state.store.as_ref(), &data) {
        Ok(report) => report,
        Err(e @ Error::Csv(_)) => {
            tracing::warn!("Rejected CSV import: {e}");
            return Err(ApiError::bad_request(format!("Invalid CSV: {e}")));
        }
        Err(e) => {
            tracing::error!("CSV import failed: {e}");
            return Err(ApiError::internal(SERVER_ERROR));
        }
    };

    Ok(Json(report))
}

/// GET /products/export - Download every product as CSV
pub async fn export_products(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let products = state
        .store
        .all_products()
        .api_err("Failed to load products for export")?;

    let body = export_csv(&products).map_err(|e| {
        tracing::error!("Failed to render CSV export: {e}");
        ApiError::internal(SERVER_ERROR)
    })?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/csv; charset=utf-8"),
    );
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&format!("attachment; filename=\"{EXPORT_FILENAME}\""))
            .unwrap_or_else(|_| HeaderValue::from_static("attachment")),
    );

    Ok((StatusCode::OK, headers, body))
}
