//! Data models for the capture-translate core.
//!
//! - [`CaptureRegion`]: validated screen rectangle sampled by the loop
//! - [`Settings`]: the full settings file with per-section defaults
//!
//! Frames flow through the pipeline as `image` crate types: a raw capture is
//! a `DynamicImage`, the preprocessed frame handed to OCR is a `GrayImage`.
//! Neither needs a wrapper type here; the pipeline stages own the invariants.

pub mod region;
pub mod settings;

pub use region::{CaptureRegion, RegionError};
pub use settings::{
    CaptureSettings, OcrSettings, PreprocessSettings, Settings, SettingsError, TranslationSettings,
};
