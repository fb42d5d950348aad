//! Feedback messages produced by validation and submission.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Feedback severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    /// Data is semantically wrong; blocks a valid form.
    Error,
    /// Should review.
    Warning,
    /// Positive confirmation.
    Success,
    /// Transport or infrastructure failure; counts as an error.
    System,
    /// Informational only.
    Info,
}

impl MessageType {
    /// All severities, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::Error,
        Self::Warning,
        Self::Success,
        Self::System,
        Self::Info,
    ];

    /// Parse severity from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "error" => Some(Self::Error),
            "warning" => Some(Self::Warning),
            "success" => Some(Self::Success),
            "system" => Some(Self::System),
            "info" => Some(Self::Info),
            _ => None,
        }
    }

    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Success => "success",
            Self::System => "system",
            Self::Info => "info",
        }
    }

    /// Whether this severity makes a form invalid.
    ///
    /// Only `error` and `system` count; everything else is informational.
    #[inline]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error | Self::System)
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single validation or submission message.
///
/// Wire shape: `{ type, path?, message, extra? }`. A message without a path,
/// or whose path is not a registered field, is shown globally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    #[serde(rename = "type")]
    pub kind: MessageType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<Value>,
}

impl Feedback {
    /// Create a path-less message.
    pub fn new(kind: MessageType, message: impl Into<String>) -> Self {
        Self {
            kind,
            path: None,
            message: message.into(),
            extra: None,
        }
    }

    /// Create an `error` message attached to a field path.
    pub fn error(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(MessageType::Error, message).with_path(path)
    }

    /// Create a `warning` message attached to a field path.
    pub fn warning(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(MessageType::Warning, message).with_path(path)
    }

    /// Create a path-less `system` message (transport failures).
    pub fn system(message: impl Into<String>) -> Self {
        Self::new(MessageType::System, message)
    }

    /// Attach a field path.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Attach arbitrary extra payload.
    #[must_use]
    pub fn with_extra(mut self, extra: Value) -> Self {
        self.extra = Some(extra);
        self
    }

    /// Whether this message has error severity.
    #[inline]
    pub fn is_error(&self) -> bool {
        self.kind.is_error()
    }

    /// Path as `&str`, if any.
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }
}
