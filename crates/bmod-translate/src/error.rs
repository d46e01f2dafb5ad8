// error.rs — Error types for plain-language translation.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TranslateError {
    /// No intent matched, or the matched intent's extractor could not build
    /// a valid rule from the text. Never a best-guess rule.
    #[error("unrecognized intent in {text:?}: {reason}")]
    UnrecognizedIntent { text: String, reason: String },

    /// A built-in pattern failed to compile.
    #[error("translator pattern error: {0}")]
    Pattern(#[from] regex::Error),
}

impl TranslateError {
    pub(crate) fn unrecognized(text: &str, reason: impl Into<String>) -> Self {
        TranslateError::UnrecognizedIntent {
            text: text.to_string(),
            reason: reason.into(),
        }
    }
}
