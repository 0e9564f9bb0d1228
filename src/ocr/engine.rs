//! Recognition Engine
//!
//! The engine is an opaque capability behind [`RecognitionEngine`]. A single
//! instance is built at startup and shared by every request through an
//! [`EngineState`]; concurrent recognitions are gated by a semaphore.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Semaphore;

use super::contract::EngineOutput;
use super::input::PreparedInput;
use super::types::{EngineError, EngineProfile, OcrError, Recognition};

/// Recognition engine binding
#[async_trait]
pub trait RecognitionEngine: Send + Sync {
    /// Run recognition once and return the engine's raw output
    async fn recognize(&self, input: &PreparedInput) -> Result<Value, EngineError>;
}

/// Started engine plus its concurrency gate
#[derive(Clone)]
pub struct EngineHandle {
    engine: Arc<dyn RecognitionEngine>,
    profile: EngineProfile,
    permits: Arc<Semaphore>,
}

impl EngineHandle {
    pub fn new(engine: Arc<dyn RecognitionEngine>, profile: EngineProfile, max_concurrent: usize) -> Self {
        Self {
            engine,
            profile,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    pub fn profile(&self) -> EngineProfile {
        self.profile
    }

    /// Invoke the engine once and normalize whichever contract it answered with
    pub async fn recognize(&self, input: &PreparedInput) -> Result<Recognition, EngineError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| EngineError::Invocation(e.to_string()))?;

        let raw = self.engine.recognize(input).await?;
        let output = EngineOutput::resolve(raw)?;

        tracing::debug!(contract = ?output.kind(), input = ?input.kind(), "Engine output resolved");

        Ok(output.normalize())
    }
}

/// Process-wide engine state, fixed at startup
#[derive(Clone)]
pub enum EngineState {
    Ready(EngineHandle),
    Unavailable(String),
}

impl EngineState {
    /// Build the engine: primary profile, then the reduced one, else unavailable
    pub async fn initialize<F, Fut>(max_concurrent: usize, mut start: F) -> Self
    where
        F: FnMut(EngineProfile) -> Fut,
        Fut: Future<Output = Result<Arc<dyn RecognitionEngine>, EngineError>>,
    {
        let primary_error = match start(EngineProfile::PRIMARY).await {
            Ok(engine) => {
                tracing::info!("OCR engine initialized with text-line orientation");
                return Self::Ready(EngineHandle::new(engine, EngineProfile::PRIMARY, max_concurrent));
            }
            Err(e) => e,
        };

        tracing::warn!(
            "OCR engine initialization failed: {}, falling back to basic settings",
            primary_error
        );

        match start(EngineProfile::REDUCED).await {
            Ok(engine) => {
                tracing::info!("OCR engine initialized with basic settings");
                Self::Ready(EngineHandle::new(engine, EngineProfile::REDUCED, max_concurrent))
            }
            Err(e) => {
                tracing::error!("OCR engine unavailable: {}", e);
                Self::Unavailable(e.to_string())
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// The handle, or `ServiceUnavailable` if the engine never started
    pub fn handle(&self) -> Result<&EngineHandle, OcrError> {
        match self {
            Self::Ready(handle) => Ok(handle),
            Self::Unavailable(reason) => Err(OcrError::ServiceUnavailable(format!(
                "OCR engine failed to initialize: {}",
                reason
            ))),
        }
    }
}
