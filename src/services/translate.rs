//! Translation service boundary.
//!
//! The loop depends only on the [`Translator`] trait. [`HttpTranslator`] is
//! the production adapter speaking the LibreTranslate JSON wire shape.
//!
//! The error taxonomy matters to the loop: [`TranslateError::InvalidPayload`]
//! means the submitted text itself was unacceptable (empty, untranslatable)
//! and retrying the same input is pointless, so the loop reports it without
//! backing off. [`TranslateError::Transient`] covers network and service
//! faults where a backoff before the next attempt is the right response.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::models::TranslationSettings;

/// Errors produced by a translation backend.
#[derive(Error, Debug)]
pub enum TranslateError {
    /// The input text was rejected by the service. Not transient: the same
    /// input will fail again.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// Network fault, timeout, or service-side failure. Worth retrying after
    /// a backoff.
    #[error("translation service error: {0}")]
    Transient(String),
}

/// Translates one aggregated text block.
#[cfg_attr(test, mockall::automock)]
pub trait Translator: Send + Sync {
    fn translate(&self, text: &str) -> Result<String, TranslateError>;
}

#[derive(Serialize)]
struct TranslateRequest<'a> {
    q: &'a str,
    source: &'a str,
    target: &'a str,
    format: &'static str,
    api_key: &'a str,
}

#[derive(Deserialize)]
struct TranslateResponse {
    #[serde(rename = "translatedText")]
    translated_text: String,
}

#[derive(Deserialize)]
struct TranslateErrorBody {
    error: String,
}

/// Translation adapter for LibreTranslate-compatible HTTP endpoints.
pub struct HttpTranslator {
    client: reqwest::Client,
    endpoint: String,
    source_language: String,
    target_language: String,
    api_key: String,
    timeout: Duration,
    runtime: tokio::runtime::Handle,
}

impl HttpTranslator {
    pub fn new(settings: &TranslationSettings, runtime: tokio::runtime::Handle) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: settings.endpoint.clone(),
            source_language: settings.source_language.clone(),
            target_language: settings.target_language.clone(),
            api_key: settings.api_key.clone(),
            timeout: Duration::from_secs(settings.timeout_secs),
            runtime,
        }
    }

    async fn request(&self, text: &str) -> Result<String, TranslateError> {
        let request = TranslateRequest {
            q: text,
            source: &self.source_language,
            target: &self.target_language,
            format: "text",
            api_key: &self.api_key,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| TranslateError::Transient(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TranslateError::Transient(e.to_string()))?;

        if status.is_client_error() {
            // 4xx means the service rejected this specific payload.
            let detail = serde_json::from_str::<TranslateErrorBody>(&body)
                .map(|b| b.error)
                .unwrap_or(body);
            return Err(TranslateError::InvalidPayload(detail));
        }
        if !status.is_success() {
            return Err(TranslateError::Transient(format!(
                "{} from {}",
                status, self.endpoint
            )));
        }

        let parsed: TranslateResponse = serde_json::from_str(&body)
            .map_err(|e| TranslateError::Transient(format!("unexpected response: {e}")))?;

        Ok(parsed.translated_text)
    }
}

impl Translator for HttpTranslator {
    fn translate(&self, text: &str) -> Result<String, TranslateError> {
        if text.trim().is_empty() {
            return Err(TranslateError::InvalidPayload(
                "empty text submitted for translation".to_string(),
            ));
        }

        tracing::debug!(chars = text.len(), "Submitting text for translation");
        self.runtime.block_on(self.request(text))
    }
}
