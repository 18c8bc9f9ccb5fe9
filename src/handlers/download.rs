// handlers/download.rs - Spreadsheet download responses

use axum::{
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::services::export::{encode, ExportFormat};

#[derive(Debug, Default, Deserialize)]
pub struct ExportQuery {
    pub format: Option<ExportFormat>,
}

/// Encode rows and serve them as an attachment named after the resource and today's date
pub fn attachment<T: Serialize>(rows: &[T], resource: &str, format: ExportFormat) -> Result<Response, ApiError> {
    let body = encode(rows, format).map_err(|e| {
        tracing::error!("Failed to encode {} export: {}", resource, e);
        ApiError::internal_server_error("Failed to build export")
    })?;

    let disposition = format.content_disposition(resource, Utc::now().date_naive());
    let disposition = HeaderValue::from_str(&disposition)
        .map_err(|_| ApiError::internal_server_error("Failed to build export"))?;

    tracing::info!("Exported {} {} rows as {}", rows.len(), resource, format.extension());
    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(format.content_type())),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}
