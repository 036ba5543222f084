//! Error body returned by the API on non-2xx responses.

use serde::{Deserialize, Serialize};

/// `{"ErrorCode": ..., "ErrorMessageJP": ..., "ErrorMessageEN": ...}`
///
/// All fields are optional on read; servers that return a bare status are
/// handled by the caller falling back to a generic message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    /// Application error code.
    #[serde(rename = "ErrorCode", default)]
    pub code: i64,
    /// Japanese message.
    #[serde(rename = "ErrorMessageJP", default)]
    pub message_jp: String,
    /// English message.
    #[serde(rename = "ErrorMessageEN", default)]
    pub message_en: String,
}

impl ApiErrorBody {
    /// Builds an error body with the same text in both languages.
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            code,
            message_jp: message.clone(),
            message_en: message,
        }
    }

    /// The human-readable message, preferring English.
    ///
    /// Returns `None` when the server sent no message at all.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        [self.message_en.as_str(), self.message_jp.as_str()]
            .into_iter()
            .find(|m| !m.trim().is_empty())
    }
}
