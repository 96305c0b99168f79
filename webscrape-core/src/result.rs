use serde::{Deserialize, Serialize};
use webscrape_common::ErrorKind;
use webscrape_drivers::SessionError;

/// Outcome of one extraction. `url` is present on both variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExtractionResult {
    Success {
        url: String,
        extracted_text: String,
    },
    Failure {
        url: String,
        error_kind: ErrorKind,
        message: String,
    },
}

impl ExtractionResult {
    pub fn success(url: impl Into<String>, extracted_text: impl Into<String>) -> Self {
        ExtractionResult::Success {
            url: url.into(),
            extracted_text: extracted_text.into(),
        }
    }

    pub fn failure(
        url: impl Into<String>,
        error_kind: ErrorKind,
        message: impl Into<String>,
    ) -> Self {
        ExtractionResult::Failure {
            url: url.into(),
            error_kind,
            message: message.into(),
        }
    }

    /// Failure carrying the backend's kind and verbatim message.
    pub fn from_session_error(url: impl Into<String>, err: SessionError) -> Self {
        Self::failure(url, err.kind, err.message)
    }

    pub fn url(&self) -> &str {
        match self {
            ExtractionResult::Success { url, .. } | ExtractionResult::Failure { url, .. } => url,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ExtractionResult::Success { .. })
    }

    pub fn extracted_text(&self) -> Option<&str> {
        match self {
            ExtractionResult::Success { extracted_text, .. } => Some(extracted_text),
            ExtractionResult::Failure { .. } => None,
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            ExtractionResult::Failure { error_kind, .. } => Some(*error_kind),
            ExtractionResult::Success { .. } => None,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            ExtractionResult::Failure { message, .. } => Some(message),
            ExtractionResult::Success { .. } => None,
        }
    }
}
