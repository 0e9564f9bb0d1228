//! OCR Module
//!
//! Bridges uploads to an external recognition engine and normalizes its
//! output into a paginated document.
//!
//! Pipeline per request:
//! - `input`: classify the upload, decode images or spill documents to disk
//! - `engine`: invoke the shared engine once (gated, no retry)
//! - `contract`: resolve the engine's output shape into normalized lines
//! - `aggregate`: build page summaries and the response document
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ocr_bridge::ocr::{CommandEngine, EngineState, OcrService};
//!
//! let engine = EngineState::initialize(1, |profile| CommandEngine::start(&config.engine, profile)).await;
//! let service = OcrService::new(engine, "paddle", std::env::temp_dir());
//!
//! let response = service.process("receipt.png", bytes).await?;
//! ```

mod aggregate;
mod artifact;
mod command;
mod contract;
mod engine;
mod input;
mod service;
mod types;

pub use aggregate::aggregate;
pub use artifact::TempArtifact;
pub use command::{CommandEngine, MODEL_SOURCE_CHECK_ENV};
pub use contract::{ContractKind, EngineOutput, PageRecord, PageResult};
pub use engine::{EngineHandle, EngineState, RecognitionEngine};
pub use input::{decode_bgr, prepare, InputKind, PreparedInput, DOCUMENT_EXTENSIONS};
pub use service::OcrService;
pub use types::{
    CleanupError, EngineError, EngineProfile, InputError, OcrError, OcrResponse, PageSummary,
    PixelBuffer, Point, RawLine, Recognition,
};

#[cfg(test)]
pub(crate) use engine::testing;
#[cfg(test)]
pub(crate) use input::encode_png;
