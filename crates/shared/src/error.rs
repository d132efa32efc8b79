use serde::{Deserialize, Serialize};

/// Shown when a failed response carries no message of its own.
pub const FALLBACK_ERROR_MESSAGE: &str = "Something went wrong, please try again.";

/// Error body returned by the places backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ApiError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
        }
    }

    /// Extracts the error message from an arbitrary JSON body.
    pub fn from_body(body: &serde_json::Value) -> Self {
        let message = body
            .get("message")
            .and_then(serde_json::Value::as_str)
            .filter(|message| !message.trim().is_empty())
            .map(str::to_string);
        Self { message }
    }

    pub fn message_or_default(&self) -> &str {
        self.message.as_deref().unwrap_or(FALLBACK_ERROR_MESSAGE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn takes_message_from_body() {
        let err = ApiError::from_body(&json!({ "message": "Could not delete." }));
        assert_eq!(err.message_or_default(), "Could not delete.");
    }

    #[test]
    fn falls_back_when_message_missing_or_blank() {
        assert_eq!(
            ApiError::from_body(&json!({})).message_or_default(),
            FALLBACK_ERROR_MESSAGE
        );
        assert_eq!(
            ApiError::from_body(&json!({ "message": "  " })).message_or_default(),
            FALLBACK_ERROR_MESSAGE
        );
        assert_eq!(
            ApiError::from_body(&json!({ "message": 42 })).message_or_default(),
            FALLBACK_ERROR_MESSAGE
        );
    }
}
