//! Submit transport response.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::feedback::Feedback;

/// Result of a submit call.
///
/// `success: false` with error messages is a domain validation failure, not a
/// transport fault. `data` is the server's echo of the saved object; when the
/// transport leaves it empty the controller fills in the submitted payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default)]
    pub messages: Vec<Feedback>,
}

impl SubmitResponse {
    /// A successful response echoing `data`.
    pub fn saved(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            messages: Vec::new(),
        }
    }

    /// A rejected response carrying validation messages.
    pub fn rejected(messages: Vec<Feedback>) -> Self {
        Self {
            success: false,
            data: None,
            messages,
        }
    }

    /// Attach messages.
    #[must_use]
    pub fn with_messages(mut self, messages: Vec<Feedback>) -> Self {
        self.messages = messages;
        self
    }

    /// Count of error-severity messages.
    pub fn error_count(&self) -> usize {
        self.messages.iter().filter(|m| m.is_error()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rejected_counts_errors() {
        let resp = SubmitResponse::rejected(vec![
            Feedback::error("name", "Required"),
            Feedback::warning("age", "Unusual"),
        ]);
        assert!(!resp.success);
        assert_eq!(resp.error_count(), 1);
    }

    #[test]
    fn test_messages_default_when_missing() {
        let resp: SubmitResponse =
            serde_json::from_value(json!({ "success": true, "data": { "id": 7 } })).unwrap();
        assert_eq!(resp, SubmitResponse::saved(json!({ "id": 7 })));
    }
}
