//! Client-side form state controller.
//!
//! A [`FormStore`] owns a form's data, validation feedback and
//! submission lifecycle:
//!
//! - data changes are debounced and validated in the background (or, for
//!   autosave forms, submitted);
//! - errors only show for fields the user has reached, in rendered layout
//!   order;
//! - concurrent submits share one transport call and stale responses are
//!   dropped.
//!
//! # Example
//!
//! ```no_run
//! use async_trait::async_trait;
//! use formstate_model::SubmitResponse;
//! use formstate_store::{FieldBinding, FormStore, SubmitOptions, Submitter, TransportError};
//! use serde_json::{Value, json};
//!
//! struct Api;
//!
//! #[async_trait]
//! impl Submitter for Api {
//!     async fn submit(&self, data: Value) -> Result<SubmitResponse, TransportError> {
//!         Ok(SubmitResponse::saved(data))
//!     }
//! }
//!
//! # async fn run() -> formstate_store::Result<()> {
//! let store = FormStore::builder(Api).build();
//! store.register_field("name", FieldBinding::new()).await?;
//! store.mount();
//! store.set_field("name", json!("Ada")).await?;
//! let response = store.submit(SubmitOptions::default()).await;
//! assert!(response.success);
//! # Ok(())
//! # }
//! ```

pub mod array;
pub mod config;
pub mod derive;
pub mod dirty;
pub mod error;
pub mod events;
mod fields;
pub mod registry;
mod store;
mod submit;
pub mod transform;
pub mod transport;
mod validation;

pub use array::{ArraySpec, ElementTemplate, EmptyPredicate};
pub use config::FormConfig;
pub use error::{FormError, Result, TransportError};
pub use events::{EventBus, FormEvent};
pub use fields::{FieldBinding, SetFieldOptions};
pub use registry::{FieldKind, FieldRegistry, LayoutMarker, LayoutSource};
pub use store::{FormStore, FormStoreBuilder, SetDataOptions};
pub use submit::SubmitOptions;
pub use transform::{
    FinalizeFn, InitializeFn, async_finalizer, async_initializer, finalizer, initializer,
};
pub use transport::{Submitter, Validator};
