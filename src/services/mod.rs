//! Services module - the pipeline stages and collaborator boundaries of the
//! capture-translate loop.
//!
//! Everything here is framework-agnostic and has no dependency on the
//! presentation layer, which keeps each stage testable in isolation.
//!
//! # Components
//!
//! - [`preprocess`]: pure image pipeline (upscale → sharpen → grayscale →
//!   binarize) that makes OCR reliable on small screen text
//! - [`TextAggregator`]: change detection plus paragraph reflow; decides
//!   whether a frame's text is worth translating at all
//! - [`CaptureSource`] / [`ScreenCapture`]: screen grab boundary and its
//!   `xcap` adapter
//! - [`OcrEngine`] / [`TesseractOcr`]: recognition boundary and its
//!   tesseract subprocess adapter
//! - [`Translator`] / [`HttpTranslator`]: translation boundary and its
//!   LibreTranslate HTTP adapter
//!
//! The three collaborator traits are object-safe and `Send + Sync`; the loop
//! holds them as `Arc<dyn ...>` so tests substitute fakes freely.

pub mod aggregate;
pub mod capture;
pub mod ocr;
pub mod preprocess;
pub mod translate;

pub use aggregate::TextAggregator;
pub use capture::{CaptureError, CaptureSource, ScreenCapture};
pub use ocr::{OcrEngine, OcrError, TesseractOcr};
pub use preprocess::preprocess;
pub use translate::{HttpTranslator, TranslateError, Translator};
