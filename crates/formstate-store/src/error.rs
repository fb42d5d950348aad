//! Controller error types.
//!
//! Nothing here is fatal to the form: submit converts these into a failed
//! `SubmitResponse` carrying one `system` message, and the background
//! validation cycle logs and drops them.

use thiserror::Error;

/// Failure reported by a submit or validate transport.
///
/// Cloneable so that a single in-flight submission can hand the same outcome
/// to every caller waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TransportError {
    message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<anyhow::Error> for TransportError {
    fn from(err: anyhow::Error) -> Self {
        Self::new(format!("{err:#}"))
    }
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        Self::new(err.to_string())
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        Self::new(err.to_string())
    }
}

/// Controller operation error.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FormError {
    /// A field's initialize transform failed.
    #[error("Failed to initialize field '{path}'")]
    Initialize {
        path: String,
        #[source]
        source: anyhow::Error,
    },

    /// A field's finalize transform failed.
    #[error("Failed to finalize field '{path}'")]
    Finalize {
        path: String,
        #[source]
        source: anyhow::Error,
    },

    /// The submit or validate transport failed.
    #[error("Transport failed: {0}")]
    Transport(#[from] TransportError),

    /// Form data could not be converted to or from a typed value.
    #[error("Form data does not match the expected shape")]
    Shape {
        #[source]
        source: serde_json::Error,
    },
}

impl FormError {
    /// Message suitable for a `system` feedback entry.
    pub fn user_message(&self) -> String {
        match self {
            Self::Initialize { path, source } | Self::Finalize { path, source } => {
                format!("{path}: {source:#}")
            }
            Self::Transport(err) => err.message().to_string(),
            Self::Shape { source } => format!("Unexpected form data: {source}"),
        }
    }

    /// Field path the error is attached to, if any.
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::Initialize { path, .. } | Self::Finalize { path, .. } => Some(path),
            _ => None,
        }
    }
}

/// Result type alias for controller operations.
pub type Result<T> = std::result::Result<T, FormError>;
