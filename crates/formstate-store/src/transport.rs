//! Transport contracts for submit and validate calls.
//!
//! Overlapping `submit()` calls share one transport call. Superseded calls
//! are not aborted; their results are ignored.

use std::sync::Arc;

use async_trait::async_trait;
use formstate_model::{Feedback, SubmitResponse};
use serde_json::Value;

use crate::error::TransportError;

/// Persists the form.
#[async_trait]
pub trait Submitter: Send + Sync {
    async fn submit(&self, data: Value) -> Result<SubmitResponse, TransportError>;
}

/// Read-only validation of the form's data.
///
/// Forms without a validator only ever learn about problems on submit.
#[async_trait]
pub trait Validator: Send + Sync {
    async fn validate(&self, data: Value) -> Result<Vec<Feedback>, TransportError>;
}

#[async_trait]
impl<T: Submitter + ?Sized> Submitter for Arc<T> {
    async fn submit(&self, data: Value) -> Result<SubmitResponse, TransportError> {
        (**self).submit(data).await
    }
}

#[async_trait]
impl<T: Validator + ?Sized> Validator for Arc<T> {
    async fn validate(&self, data: Value) -> Result<Vec<Feedback>, TransportError> {
        (**self).validate(data).await
    }
}
