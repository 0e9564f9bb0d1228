//! Command Engine
//!
//! Drives an external recognition executable. The executable prints the
//! page results as JSON on stdout, in either output contract.
//!
//! Invocation:
//! - startup check: `<cmd> [args] --lang <lang> [--use-textline-orientation] --check`
//! - document: `... --input <path>`
//! - image: `... --raw-bgr --width <w> --height <h>` with BGR bytes on stdin

use std::process::{Output, Stdio};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::engine::RecognitionEngine;
use super::input::PreparedInput;
use super::types::{EngineError, EngineProfile};
use crate::config::EngineConfig;

/// Environment variable that turns off the engine's model-source connectivity check
pub const MODEL_SOURCE_CHECK_ENV: &str = "PADDLE_PDX_DISABLE_MODEL_SOURCE_CHECK";

/// Engine backed by an external executable
pub struct CommandEngine {
    program: String,
    args: Vec<String>,
    language: String,
    profile: EngineProfile,
    disable_model_source_check: bool,
}

impl CommandEngine {
    pub fn new(config: &EngineConfig, profile: EngineProfile) -> Self {
        Self {
            program: config.command.clone(),
            args: config.args.clone(),
            language: config.language.clone(),
            profile,
            disable_model_source_check: config.disable_model_source_check,
        }
    }

    /// Construct and check the engine; fails if the executable rejects the profile
    pub async fn start(
        config: &EngineConfig,
        profile: EngineProfile,
    ) -> Result<Arc<dyn RecognitionEngine>, EngineError> {
        let engine = Self::new(config, profile);

        tracing::info!(
            program = %engine.program,
            language = %engine.language,
            textline_orientation = profile.textline_orientation,
            "Probing OCR engine"
        );

        let mut command = engine.base_command();
        command.arg("--check").stdin(Stdio::null());
        let output = command.output().await.map_err(EngineError::Spawn)?;
        check_status(&output)?;

        Ok(Arc::new(engine))
    }

    fn base_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg("--lang")
            .arg(&self.language)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if self.profile.textline_orientation {
            command.arg("--use-textline-orientation");
        }
        if self.disable_model_source_check {
            command.env(MODEL_SOURCE_CHECK_ENV, "True");
        }

        command
    }

    async fn run_document(&self, mut command: Command) -> Result<Output, EngineError> {
        command.stdin(Stdio::null());
        command.output().await.map_err(EngineError::Spawn)
    }

    async fn run_pixels(&self, mut command: Command, data: &[u8]) -> Result<Output, EngineError> {
        command.stdin(Stdio::piped());
        let mut child = command.spawn().map_err(EngineError::Spawn)?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| EngineError::Invocation("engine stdin unavailable".to_string()))?;

        let write = async move {
            let result = stdin.write_all(data).await;
            drop(stdin);
            result
        };
        let (written, output) = tokio::join!(write, child.wait_with_output());
        let output = output.map_err(EngineError::Spawn)?;

        // A broken pipe only matters if the engine also failed
        if let Err(e) = written {
            check_status(&output)?;
            tracing::warn!("OCR engine closed stdin early: {}", e);
        }

        Ok(output)
    }
}

#[async_trait]
impl RecognitionEngine for CommandEngine {
    async fn recognize(&self, input: &PreparedInput) -> Result<Value, EngineError> {
        let mut command = self.base_command();

        let output = match input {
            PreparedInput::Document(artifact) => {
                command.arg("--input").arg(artifact.path());
                self.run_document(command).await?
            }
            PreparedInput::Pixels(pixels) => {
                command
                    .arg("--raw-bgr")
                    .arg("--width")
                    .arg(pixels.width.to_string())
                    .arg("--height")
                    .arg(pixels.height.to_string());
                self.run_pixels(command, &pixels.data).await?
            }
        };

        check_status(&output)?;
        parse_output(&output.stdout)
    }
}

fn check_status(output: &Output) -> Result<(), EngineError> {
    if output.status.success() {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    Err(EngineError::Invocation(format!(
        "exit code {}: {}",
        output.status.code().unwrap_or(-1),
        stderr.trim()
    )))
}

/// Empty stdout means no pages
fn parse_output(stdout: &[u8]) -> Result<Value, EngineError> {
    if stdout.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_slice(stdout)?)
}
