//! Shared types for the formstate controller.
//!
//! This crate holds the wire and state types that the controller publishes
//! and that transports exchange with it:
//!
//! - [`feedback`]: `Feedback` messages and their [`MessageType`] severity
//! - [`response`]: the [`SubmitResponse`] returned by submit transports
//! - [`snapshot`]: the published [`FormSnapshot`] and its derived views
//! - [`path`]: dot/bracket path addressing over `serde_json::Value`
//!
//! # Example
//!
//! ```
//! use formstate_model::{Feedback, MessageType, path};
//! use serde_json::json;
//!
//! let data = path::set(&json!({}), "contacts[0].email", json!("a@b.c"));
//! assert_eq!(path::get(&data, "contacts.0.email"), Some(&json!("a@b.c")));
//!
//! let fb = Feedback::error("contacts.0.email", "Domain not allowed");
//! assert_eq!(fb.kind, MessageType::Error);
//! assert!(fb.is_error());
//! ```

pub mod feedback;
pub mod path;
pub mod response;
pub mod snapshot;

pub use feedback::{Feedback, MessageType};
pub use response::SubmitResponse;
pub use snapshot::{FormSnapshot, Messages, ValidState};
