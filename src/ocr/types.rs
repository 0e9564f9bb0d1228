//! OCR Types
//!
//! Defines the normalized line/page/document model and the error taxonomy
//! shared by the OCR pipeline.

use std::path::PathBuf;

use serde::Serialize;

/// A point of a bounding polygon, `[x, y]`
pub type Point = [f64; 2];

/// One recognized text line after normalization
///
/// Serialized as-is into the `results` array of the response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawLine {
    /// Recognized text
    pub text: String,
    /// Confidence score (0.0 - 1.0)
    pub confidence: f64,
    /// Bounding polygon, ordered points
    #[serde(rename = "box")]
    pub polygon: Vec<Point>,
    /// Page number (1-indexed)
    pub page: u32,
}

/// Normalized output of a single engine invocation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Recognition {
    /// Page numbers reported by the engine, in emission order.
    /// Pages without any line still show up here.
    pub page_numbers: Vec<u32>,
    /// All lines, in recognition order
    pub lines: Vec<RawLine>,
}

/// Per-page summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageSummary {
    pub page_number: u32,
    pub text: String,
    pub line_count: usize,
}

/// Response body of `POST /ocr`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OcrResponse {
    /// Whole-document text, pages joined with newlines
    pub text: String,
    pub results: Vec<RawLine>,
    pub pages: Vec<PageSummary>,
    pub page_count: usize,
    pub engine: String,
}

/// Decoded image ready for the engine
///
/// Interleaved 3-channel bytes in BGR order, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

/// Engine configuration variant selected at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineProfile {
    /// Text-line orientation (angle) correction
    pub textline_orientation: bool,
}

impl EngineProfile {
    /// Full configuration, orientation correction enabled
    pub const PRIMARY: Self = Self {
        textline_orientation: true,
    };

    /// Reduced configuration used when the primary one fails to start
    pub const REDUCED: Self = Self {
        textline_orientation: false,
    };
}

/// Upload or preparation failure
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("Invalid upload: {0}")]
    Upload(String),

    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("Failed to write temporary file {}: {source}", .path.display())]
    TempFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Image preparation task failed: {0}")]
    Task(String),
}

/// Recognition failure
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Failed to start OCR engine: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("OCR engine failed: {0}")]
    Invocation(String),

    #[error("Failed to parse OCR engine output: {0}")]
    Output(#[from] serde_json::Error),

    #[error("Unrecognized OCR engine output shape: {0}")]
    UnrecognizedShape(String),
}

/// Temporary artifact removal failure. Logged, never returned to callers.
#[derive(Debug, thiserror::Error)]
#[error("Failed to remove temporary file {}: {source}", .path.display())]
pub struct CleanupError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// OCR request error
#[derive(Debug, thiserror::Error)]
pub enum OcrError {
    #[error("OCR engine unavailable: {0}")]
    ServiceUnavailable(String),

    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl OcrError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
