//! Change detection and paragraph reflow for raw OCR output.
//!
//! The OCR engine returns text with physical line wrapping. Sent as-is, a
//! sentence broken across lines translates poorly, so consecutive non-blank
//! lines are joined into one paragraph and paragraphs are separated by a
//! blank line. The aggregator also decides whether the text is worth
//! translating at all: unchanged text and pure-symbol noise are dropped so
//! the translation service is not called redundantly.

use regex::Regex;

/// Stateful per-session aggregator.
///
/// Carries the last *accepted* raw OCR text across calls. Comparison happens
/// on the raw text, not the reflowed form, so whitespace-only jitter in the
/// reflow cannot defeat change detection.
pub struct TextAggregator {
    /// Matches at least one ASCII letter; frames of pure digits or symbols
    /// are treated as recognizer noise.
    alphabetic: Regex,

    /// Raw text of the last frame that was forwarded to translation.
    last_accepted: String,
}

impl TextAggregator {
    pub fn new() -> Self {
        Self {
            alphabetic: Regex::new("[a-zA-Z]").expect("Invalid alphabetic regex"),
            last_accepted: String::new(),
        }
    }

    /// Decide whether `extracted` is new, material content and reflow it.
    ///
    /// Returns `Some(paragraphs)` only when the text is non-empty, differs
    /// verbatim from the previously accepted text, and contains at least one
    /// alphabetic character. Returns `None` otherwise, in which case the
    /// caller must not invoke translation and the comparison state is left
    /// untouched.
    pub fn aggregate(&mut self, extracted: &str) -> Option<String> {
        let trimmed = extracted.trim();

        if trimmed.is_empty() {
            return None;
        }
        if trimmed == self.last_accepted {
            return None;
        }
        if !self.alphabetic.is_match(trimmed) {
            tracing::debug!("Dropping non-alphabetic OCR output: {:?}", trimmed);
            return None;
        }

        self.last_accepted = trimmed.to_string();
        Some(reflow(trimmed))
    }

    /// The raw text most recently accepted for translation, if any.
    pub fn last_accepted(&self) -> Option<&str> {
        if self.last_accepted.is_empty() {
            None
        } else {
            Some(&self.last_accepted)
        }
    }
}

impl Default for TextAggregator {
    fn default() -> Self {
        Self::new()
    }
}

/// Join physically wrapped lines into semantic paragraphs.
///
/// Consecutive non-blank lines are joined with a single space; a blank line
/// flushes the current paragraph. Paragraphs are separated by a blank line
/// (`\n\n`) in the output.
fn reflow(text: &str) -> String {
    let mut paragraphs: Vec<String> = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            if !current.is_empty() {
                paragraphs.push(current.join(" "));
                current.clear();
            }
        } else {
            current.push(line);
        }
    }

    if !current.is_empty() {
        paragraphs.push(current.join(" "));
    }

    paragraphs.join("\n\n")
}
