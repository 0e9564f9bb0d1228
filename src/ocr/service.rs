//! OCR Service
//!
//! Runs one upload through the pipeline: prepare, recognize, aggregate.

use std::path::PathBuf;

use super::aggregate::aggregate;
use super::engine::{EngineHandle, EngineState};
use super::input::{self, PreparedInput};
use super::types::{OcrError, OcrResponse};

/// OCR service shared by all requests
#[derive(Clone)]
pub struct OcrService {
    engine: EngineState,
    engine_name: String,
    temp_dir: PathBuf,
}

impl OcrService {
    pub fn new(engine: EngineState, engine_name: impl Into<String>, temp_dir: PathBuf) -> Self {
        Self {
            engine,
            engine_name: engine_name.into(),
            temp_dir,
        }
    }

    /// Fails fast with `ServiceUnavailable` when the engine never started
    pub fn ready_engine(&self) -> Result<&EngineHandle, OcrError> {
        self.engine.handle()
    }

    /// Recognize an uploaded file
    ///
    /// Temporary files created for the upload are removed before this
    /// returns, whatever the outcome.
    pub async fn process(&self, filename: &str, contents: Vec<u8>) -> Result<OcrResponse, OcrError> {
        let engine = self.ready_engine()?;

        let mut prepared = input::prepare(&self.temp_dir, filename, contents).await?;
        let recognition = engine.recognize(&prepared).await;

        if let PreparedInput::Document(artifact) = &mut prepared {
            artifact.release().await;
        }

        let recognition = recognition?;
        let response = aggregate(recognition, &self.engine_name);

        tracing::info!(
            filename = %filename,
            pages = response.page_count,
            lines = response.results.len(),
            "OCR complete"
        );

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::engine::testing::MockEngine;
    use crate::ocr::input::{encode_png, InputKind};
    use crate::ocr::types::{EngineProfile, InputError};
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn service_with(engine: Arc<MockEngine>, temp_dir: &TempDir) -> OcrService {
        let state = EngineState::Ready(EngineHandle::new(engine, EngineProfile::PRIMARY, 1));
        OcrService::new(state, "paddle", temp_dir.path().to_path_buf())
    }

    fn dir_is_empty(temp_dir: &TempDir) -> bool {
        std::fs::read_dir(temp_dir.path()).unwrap().next().is_none()
    }

    #[tokio::test]
    async fn test_receipt_image() {
        let temp_dir = TempDir::new().unwrap();
        let engine = MockEngine::returning(json!([[
            [[[0, 0], [9, 0], [9, 2], [0, 2]], ["ACME STORE", 0.95]],
            [[[0, 3], [9, 3], [9, 5], [0, 5]], ["Milk 2.50", 0.80]],
            [[[0, 6], [9, 6], [9, 8], [0, 8]], ["TOTAL 2.50", 0.60]]
        ]]));
        let service = service_with(engine.clone(), &temp_dir);

        let response = service
            .process("receipt.png", encode_png(8, 8, [200, 200, 200]))
            .await
            .unwrap();

        assert_eq!(response.page_count, 1);
        assert_eq!(response.results.len(), 3);
        assert_eq!(response.pages[0].line_count, 3);
        assert_eq!(engine.seen.lock().unwrap()[0].pixels, Some((8, 8)));
    }

    #[tokio::test]
    async fn test_pdf_with_empty_second_page() {
        let temp_dir = TempDir::new().unwrap();
        let engine = MockEngine::returning(json!([
            { "res": { "page_index": 0, "rec_texts": ["Title", "Body"], "rec_scores": [0.9, 0.8],
                       "rec_polys": [[[0, 0], [1, 0], [1, 1], [0, 1]], [[0, 2], [1, 2], [1, 3], [0, 3]]] } },
            { "res": { "page_index": 1, "rec_texts": [], "rec_scores": [], "rec_polys": [] } }
        ]));
        let service = service_with(engine.clone(), &temp_dir);

        let response = service.process("doc.pdf", b"%PDF-1.7".to_vec()).await.unwrap();

        assert_eq!(response.page_count, 2);
        assert_eq!(response.pages[1].line_count, 0);
        assert_eq!(response.pages[1].text, "");

        let seen = engine.seen.lock().unwrap()[0].clone();
        assert_eq!(seen.kind, InputKind::Document);
        assert!(seen.file_present);
        assert!(dir_is_empty(&temp_dir));
    }

    #[tokio::test]
    async fn test_engine_error_still_cleans_up() {
        let temp_dir = TempDir::new().unwrap();
        let engine = MockEngine::failing("out of memory");
        let service = service_with(engine.clone(), &temp_dir);

        let result = service.process("Scan.PDF", b"%PDF".to_vec()).await;

        assert!(matches!(result, Err(OcrError::Engine(_))));
        assert_eq!(engine.calls(), 1);
        assert!(dir_is_empty(&temp_dir));
    }

    #[tokio::test]
    async fn test_cleanup_failure_keeps_result() {
        let temp_dir = TempDir::new().unwrap();
        let engine = MockEngine::returning(json!([
            { "res": { "page_index": 0, "rec_texts": ["kept"], "rec_scores": [0.9] } }
        ])).pinning_documents();
        let service = service_with(engine.clone(), &temp_dir);

        let response = service.process("doc.pdf", b"%PDF".to_vec()).await.unwrap();

        assert_eq!(response.page_count, 1);
        assert_eq!(response.results[0].text, "kept");
        assert_eq!(engine.calls(), 1);
        // The unremovable entry is left behind, only logged
        assert!(!dir_is_empty(&temp_dir));
    }

    #[tokio::test]
    async fn test_bad_image_never_reaches_engine() {
        let temp_dir = TempDir::new().unwrap();
        let engine = MockEngine::returning(json!([]));
        let service = service_with(engine.clone(), &temp_dir);

        let result = service.process("photo.jpg", b"not an image".to_vec()).await;

        assert!(matches!(result, Err(OcrError::Input(InputError::Decode(_)))));
        assert_eq!(engine.calls(), 0);
        assert!(dir_is_empty(&temp_dir));
    }

    #[tokio::test]
    async fn test_unavailable_engine_fails_fast() {
        let temp_dir = TempDir::new().unwrap();
        let service = OcrService::new(
            EngineState::Unavailable("no engine".into()),
            "paddle",
            temp_dir.path().to_path_buf(),
        );

        let result = service.process("doc.pdf", b"%PDF".to_vec()).await;

        assert!(matches!(result, Err(OcrError::ServiceUnavailable(_))));
        assert!(dir_is_empty(&temp_dir));
    }
}
