//! OCR Routes
//!
//! Endpoints:
//! - POST /ocr - Recognize an uploaded image or PDF (multipart field `file`)

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde::Serialize;

use crate::ocr::{InputError, OcrError, OcrResponse};
use crate::state::AppState;

/// Multipart field carrying the upload
pub const FILE_FIELD: &str = "file";

// ============================================================================
// Error Response
// ============================================================================

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
}

impl IntoResponse for OcrError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();

        match &self {
            OcrError::ServiceUnavailable(_) => tracing::warn!("OCR request rejected: {}", self),
            _ => tracing::error!("OCR Error: {}", self),
        }

        let body = Json(ErrorResponse {
            detail: self.to_string(),
        });

        (status, body).into_response()
    }
}

// ============================================================================
// Router
// ============================================================================

pub fn router() -> Router<AppState> {
    Router::new().route("/ocr", post(perform_ocr))
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /ocr
///
/// Engine availability is checked before the upload is read.
async fn perform_ocr(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<OcrResponse>, OcrError> {
    let service = state.ocr();
    service.ready_engine()?;

    let mut multipart =
        multipart.map_err(|e| InputError::Upload(format!("Expected multipart form data: {}", e)))?;

    let (filename, contents) = read_file_field(&mut multipart).await?;

    tracing::debug!(
        filename = %filename,
        bytes = contents.len(),
        "Received OCR upload"
    );

    let response = service.process(&filename, contents).await?;
    Ok(Json(response))
}

/// Find the `file` field and read it fully
async fn read_file_field(multipart: &mut Multipart) -> Result<(String, Vec<u8>), InputError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| InputError::Upload(format!("Failed to read multipart field: {}", e)))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| InputError::Upload(format!("Failed to read file data: {}", e)))?;

        return Ok((filename, data.to_vec()));
    }

    Err(InputError::Upload(format!(
        "Missing required file field '{}'",
        FILE_FIELD
    )))
}
