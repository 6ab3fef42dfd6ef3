//! Lenslate - continuous screen-region capture and translation
//!
//! Main entry point for the console application.
//!
//! # Overview
//!
//! This binary crate wires the shipped adapters to the capture loop. It
//! initializes:
//! - Logging infrastructure (file rotation + console output)
//! - Tokio async runtime (drives HTTP and subprocess I/O inside the adapters)
//! - Configuration loading ([`ConfigManager`])
//! - The capture loop ([`LoopController`]) with screen capture, tesseract
//!   OCR, and a LibreTranslate-compatible translation client
//!
//! The application uses a hybrid threading model:
//! - **Main thread**: blocks on Ctrl+C and owns the controller
//! - **Worker thread**: runs the capture → OCR → translate loop
//! - **Tokio workers**: service the adapters' async I/O
//!
//! # Execution Flow
//!
//! 1. Initialize logging → logs/lenslate.<date>
//! 2. Create tokio runtime with 2 worker threads
//! 3. Load settings from lenslate-data/lenslate.yaml
//! 4. Build the adapters and start the loop on the configured region
//! 5. Print each published result until Ctrl+C
//! 6. Stop the loop, log a metrics summary, shut the runtime down

use anyhow::{Context, Result};
use std::sync::Arc;

use lenslate::services::{HttpTranslator, ScreenCapture, TesseractOcr};
use lenslate::{APP_NAME, Collaborators, ConfigManager, LoopController, TranslationResult, VERSION};

fn main() -> Result<()> {
    let _log_guard = lenslate::logging::setup_logging("logs", "lenslate", false, true)?;

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);

    // The adapters run blocking from the worker thread and park their async
    // I/O here, so two workers are plenty.
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(2)
        .thread_name("lenslate-io")
        .build()?;

    let config_manager = ConfigManager::new("lenslate-data")?;
    let settings = config_manager.load_settings()?;

    let region = settings.capture.region.with_context(|| {
        format!(
            "No capture region configured; set capture.region in {}",
            config_manager.settings_path()
        )
    })?;

    let collaborators = Collaborators {
        capture: Arc::new(ScreenCapture::new()),
        ocr: Arc::new(TesseractOcr::new(&settings.ocr, runtime.handle().clone())),
        translator: Arc::new(HttpTranslator::new(
            &settings.translation,
            runtime.handle().clone(),
        )),
    };

    let mut controller = LoopController::new(
        settings.capture.clone(),
        settings.preprocess.clone(),
        collaborators,
    );

    // Print every published result; the receiver task ends when the
    // controller is dropped and the sink channel closes.
    let mut results = controller.subscribe();
    runtime.spawn(async move {
        while results.changed().await.is_ok() {
            let latest = results.borrow_and_update().clone();
            match latest {
                TranslationResult::Idle => {}
                TranslationResult::Translated(text) => {
                    println!("--- {} ---", wall_clock_timestamp());
                    println!("{text}\n");
                }
                TranslationResult::Error(message) => {
                    eprintln!("[{}] {message}", wall_clock_timestamp());
                }
            }
        }
    });

    controller
        .start(region)
        .context("Failed to start the capture loop")?;
    tracing::info!(%region, "Capture loop running, press Ctrl+C to stop");

    runtime
        .block_on(tokio::signal::ctrl_c())
        .context("Failed to listen for Ctrl+C")?;

    tracing::info!("Ctrl+C received, shutting down");
    controller.stop();
    controller.metrics().log_summary();

    runtime.shutdown_timeout(std::time::Duration::from_secs(5));

    tracing::info!("Application shutdown complete");
    Ok(())
}

/// Wall-clock timestamp for console output, seconds resolution.
fn wall_clock_timestamp() -> String {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let (hours, minutes, seconds) = ((now / 3600) % 24, (now / 60) % 60, now % 60);
    format!("{hours:02}:{minutes:02}:{seconds:02} UTC")
}
