//! OCR engine boundary.
//!
//! The loop depends only on the [`OcrEngine`] trait. [`TesseractOcr`] is the
//! production adapter: it shells out to the `tesseract` CLI with the frame
//! piped through stdin and the recognized text read from stdout, under a
//! timeout so a wedged engine cannot stall the worker forever.

use std::io::Cursor;
use std::process::Stdio;
use std::time::Duration;

use image::{DynamicImage, GrayImage, ImageFormat};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;

use crate::models::OcrSettings;

/// Errors produced by an OCR backend.
#[derive(Error, Debug)]
pub enum OcrError {
    /// The engine binary is missing or not runnable. Surfaced by
    /// [`OcrEngine::preflight`] so the loop never starts against a dead
    /// engine.
    #[error("OCR engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("OCR timed out after {0:?}")]
    Timeout(Duration),

    #[error("OCR failed: {0}")]
    Failed(String),

    #[error("OCR process error: {0}")]
    Process(#[from] std::io::Error),
}

/// Converts a preprocessed bitmap into text.
#[cfg_attr(test, mockall::automock)]
pub trait OcrEngine: Send + Sync {
    /// Verify the engine is installed and reachable. Called once before the
    /// loop enters Running.
    fn preflight(&self) -> Result<(), OcrError>;

    /// Recognize text in one frame. An empty string means "no text found"
    /// and is a valid result, not an error.
    fn recognize(&self, frame: &GrayImage) -> Result<String, OcrError>;
}

/// OCR adapter that drives the tesseract CLI as a subprocess.
pub struct TesseractOcr {
    command: String,
    language: String,
    engine_args: Vec<String>,
    timeout: Duration,
    runtime: tokio::runtime::Handle,
}

impl TesseractOcr {
    /// Build an adapter from settings. The runtime handle is used to drive
    /// the subprocess with a timeout; `recognize` itself stays a blocking
    /// call because it runs on the capture worker thread.
    pub fn new(settings: &OcrSettings, runtime: tokio::runtime::Handle) -> Self {
        Self {
            command: settings.command.clone(),
            language: settings.language.clone(),
            engine_args: settings
                .engine_config
                .split_whitespace()
                .map(str::to_string)
                .collect(),
            timeout: Duration::from_secs(settings.timeout_secs),
            runtime,
        }
    }

    async fn run_recognition(&self, png: Vec<u8>) -> Result<String, OcrError> {
        let mut child = Command::new(&self.command)
            .arg("stdin")
            .arg("stdout")
            .args(["-l", &self.language])
            .args(&self.engine_args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // A timeout drops the wait future; without this the wedged
            // engine would outlive it and accumulate across retries.
            .kill_on_drop(true)
            .spawn()?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| OcrError::Failed("failed to open tesseract stdin".to_string()))?;
        stdin.write_all(&png).await?;
        drop(stdin);

        let output = timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                tracing::warn!("tesseract timed out after {:?}", self.timeout);
                OcrError::Timeout(self.timeout)
            })??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::Failed(format!(
                "tesseract exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

impl OcrEngine for TesseractOcr {
    fn preflight(&self) -> Result<(), OcrError> {
        let command = self.command.clone();
        let check = self.runtime.block_on(async {
            timeout(
                Duration::from_secs(5),
                Command::new(&command)
                    .arg("--version")
                    .stdout(Stdio::piped())
                    .stderr(Stdio::piped())
                    .kill_on_drop(true)
                    .output(),
            )
            .await
        });

        match check {
            Ok(Ok(output)) if output.status.success() => {
                let version = String::from_utf8_lossy(&output.stdout);
                tracing::info!(
                    "OCR engine available: {}",
                    version.lines().next().unwrap_or("unknown version")
                );
                Ok(())
            }
            Ok(Ok(output)) => Err(OcrError::EngineUnavailable(format!(
                "{} --version exited with {}",
                self.command, output.status
            ))),
            Ok(Err(e)) => Err(OcrError::EngineUnavailable(format!(
                "failed to run {}: {}",
                self.command, e
            ))),
            Err(_) => Err(OcrError::EngineUnavailable(format!(
                "{} --version timed out",
                self.command
            ))),
        }
    }

    fn recognize(&self, frame: &GrayImage) -> Result<String, OcrError> {
        let mut png = Vec::new();
        DynamicImage::ImageLuma8(frame.clone())
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(|e| OcrError::Failed(format!("failed to encode frame: {e}")))?;

        self.runtime.block_on(self.run_recognition(png))
    }
}
