// Lenslate - continuous screen-region capture and translation
//
// This is the library crate containing the capture loop, processing
// pipeline, and data structures. The binary crate (main.rs) wires the
// shipped adapters together and presents results on the console.

pub mod config;
pub mod controller;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod services;
pub mod state;

// Re-export commonly used types for convenience
pub use config::ConfigManager;
pub use controller::{Collaborators, LoopController, LoopError, LoopState};
pub use models::{CaptureRegion, Settings};
pub use state::{ResultSink, TranslationResult};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
