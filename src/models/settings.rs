use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::CaptureRegion;

/// Validation failures detected when settings are loaded.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SettingsError {
    #[error("capture interval must be greater than zero")]
    ZeroInterval,

    #[error("pause poll interval must be greater than zero")]
    ZeroPausePoll,

    #[error("error backoff must be greater than zero")]
    ZeroBackoff,

    #[error("upscale factor must be at least 1, got {0}")]
    UpscaleFactorTooSmall(u32),

    #[error("OCR command must not be empty")]
    EmptyOcrCommand,

    #[error("OCR language must not be empty")]
    EmptyOcrLanguage,

    #[error("translation endpoint must not be empty")]
    EmptyTranslationEndpoint,

    #[error("translation {0} language must not be empty")]
    EmptyTranslationLanguage(&'static str),
}

/// Complete settings file, loaded from `lenslate.yaml` by
/// [`ConfigManager`](crate::config::ConfigManager).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub capture: CaptureSettings,
    pub preprocess: PreprocessSettings,
    pub ocr: OcrSettings,
    pub translation: TranslationSettings,
}

impl Settings {
    /// Validate every externally supplied value. Called once at load so the
    /// rest of the crate can assume the invariants hold.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.capture.interval_ms == 0 {
            return Err(SettingsError::ZeroInterval);
        }
        if self.capture.pause_poll_ms == 0 {
            return Err(SettingsError::ZeroPausePoll);
        }
        if self.capture.backoff_ms == 0 {
            return Err(SettingsError::ZeroBackoff);
        }
        if self.preprocess.upscale_factor < 1 {
            return Err(SettingsError::UpscaleFactorTooSmall(
                self.preprocess.upscale_factor,
            ));
        }
        if self.ocr.command.trim().is_empty() {
            return Err(SettingsError::EmptyOcrCommand);
        }
        if self.ocr.language.trim().is_empty() {
            return Err(SettingsError::EmptyOcrLanguage);
        }
        if self.translation.endpoint.trim().is_empty() {
            return Err(SettingsError::EmptyTranslationEndpoint);
        }
        if self.translation.source_language.trim().is_empty() {
            return Err(SettingsError::EmptyTranslationLanguage("source"));
        }
        if self.translation.target_language.trim().is_empty() {
            return Err(SettingsError::EmptyTranslationLanguage("target"));
        }
        Ok(())
    }
}

/// Loop cadence and the optional preconfigured region.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    /// Delay between successful iterations, in milliseconds.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// How often a paused worker re-checks its state, in milliseconds.
    #[serde(default = "default_pause_poll_ms")]
    pub pause_poll_ms: u64,

    /// Delay applied after a transient failure before the next attempt,
    /// in milliseconds. Deliberately longer than `interval_ms` so a failing
    /// dependency is not hammered.
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,

    /// Screen rectangle to sample. Optional here because the region normally
    /// arrives from the selection UI; headless runs configure it in the file.
    pub region: Option<CaptureRegion>,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            pause_poll_ms: default_pause_poll_ms(),
            backoff_ms: default_backoff_ms(),
            region: None,
        }
    }
}

/// Image pipeline knobs. The pipeline order itself is fixed; only the
/// parameters are configurable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessSettings {
    /// Integer upscale applied before anything else. Small UI text needs
    /// upscaling for the OCR engine to resolve glyph edges.
    #[serde(default = "default_upscale_factor")]
    pub upscale_factor: u32,

    /// Apply the sharpening kernel after upscaling.
    #[serde(default = "default_sharpen")]
    pub sharpen: bool,

    /// Luminance cutoff for binarization: below becomes black, at or above
    /// becomes white. The `u8` type keeps the value in [0, 255] by itself.
    #[serde(default = "default_threshold")]
    pub threshold: u8,
}

impl Default for PreprocessSettings {
    fn default() -> Self {
        Self {
            upscale_factor: default_upscale_factor(),
            sharpen: default_sharpen(),
            threshold: default_threshold(),
        }
    }
}

/// OCR engine invocation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrSettings {
    /// Executable name or path for the tesseract CLI.
    #[serde(default = "default_ocr_command")]
    pub command: String,

    /// Tesseract language pack identifier.
    #[serde(default = "default_ocr_language")]
    pub language: String,

    /// Extra engine flags passed verbatim, e.g. `--psm 6`.
    #[serde(default = "default_engine_config")]
    pub engine_config: String,

    #[serde(default = "default_ocr_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            command: default_ocr_command(),
            language: default_ocr_language(),
            engine_config: default_engine_config(),
            timeout_secs: default_ocr_timeout_secs(),
        }
    }
}

/// Translation service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationSettings {
    /// LibreTranslate-compatible endpoint URL.
    #[serde(default = "default_translation_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_source_language")]
    pub source_language: String,

    #[serde(default = "default_target_language")]
    pub target_language: String,

    /// API key sent with each request; empty for keyless instances.
    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_translation_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for TranslationSettings {
    fn default() -> Self {
        Self {
            endpoint: default_translation_endpoint(),
            source_language: default_source_language(),
            target_language: default_target_language(),
            api_key: String::new(),
            timeout_secs: default_translation_timeout_secs(),
        }
    }
}

fn default_interval_ms() -> u64 {
    800
}

fn default_pause_poll_ms() -> u64 {
    500
}

fn default_backoff_ms() -> u64 {
    2000
}

fn default_upscale_factor() -> u32 {
    3
}

fn default_sharpen() -> bool {
    true
}

fn default_threshold() -> u8 {
    200
}

fn default_ocr_command() -> String {
    "tesseract".to_string()
}

fn default_ocr_language() -> String {
    "eng".to_string()
}

fn default_engine_config() -> String {
    "--psm 6".to_string()
}

fn default_ocr_timeout_secs() -> u64 {
    15
}

fn default_translation_endpoint() -> String {
    "https://translate.argosopentech.com/translate".to_string()
}

fn default_source_language() -> String {
    "en".to_string()
}

fn default_target_language() -> String {
    "zh".to_string()
}

fn default_translation_timeout_secs() -> u64 {
    10
}
