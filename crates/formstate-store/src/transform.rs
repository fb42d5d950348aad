//! Per-field value transforms.
//!
//! `initialize` converts a value entering the form (wire → UI
//! representation) and runs once per value-set. `finalize` converts back
//! (UI → wire) before every validate and submit pass; its second argument is
//! `true` for submissions.

use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::sync::Arc;

use formstate_model::path;
use futures_util::future::{self, BoxFuture, FutureExt, try_join_all};
use serde_json::Value;

use crate::error::{FormError, Result};

/// Async, fallible initialize transform.
pub type InitializeFn =
    Arc<dyn Fn(Value) -> BoxFuture<'static, anyhow::Result<Value>> + Send + Sync>;

/// Async, fallible finalize transform. The flag is `true` when submitting.
pub type FinalizeFn =
    Arc<dyn Fn(Value, bool) -> BoxFuture<'static, anyhow::Result<Value>> + Send + Sync>;

/// Wrap a synchronous initialize transform.
pub fn initializer<F>(f: F) -> InitializeFn
where
    F: Fn(Value) -> anyhow::Result<Value> + Send + Sync + 'static,
{
    Arc::new(move |value| future::ready(f(value)).boxed())
}

/// Wrap an asynchronous initialize transform.
pub fn async_initializer<F, Fut>(f: F) -> InitializeFn
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
{
    Arc::new(move |value| f(value).boxed())
}

/// Wrap a synchronous finalize transform.
pub fn finalizer<F>(f: F) -> FinalizeFn
where
    F: Fn(Value, bool) -> anyhow::Result<Value> + Send + Sync + 'static,
{
    Arc::new(move |value, is_submit| future::ready(f(value, is_submit)).boxed())
}

/// Wrap an asynchronous finalize transform.
pub fn async_finalizer<F, Fut>(f: F) -> FinalizeFn
where
    F: Fn(Value, bool) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
{
    Arc::new(move |value, is_submit| f(value, is_submit).boxed())
}

/// Transforms registered for the form's fields.
#[derive(Clone, Default)]
pub struct FieldTransforms {
    initializes: BTreeMap<String, InitializeFn>,
    finalizes: BTreeMap<String, FinalizeFn>,
    /// Paths whose current value already went through `initialize`.
    initialized: BTreeSet<String>,
}

impl std::fmt::Debug for FieldTransforms {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldTransforms")
            .field("initializes", &self.initializes.keys().collect::<Vec<_>>())
            .field("finalizes", &self.finalizes.keys().collect::<Vec<_>>())
            .field("initialized", &self.initialized)
            .finish()
    }
}

impl FieldTransforms {
    pub fn bind(
        &mut self,
        path: &str,
        initialize: Option<InitializeFn>,
        finalize: Option<FinalizeFn>,
    ) {
        if let Some(initialize) = initialize {
            self.initializes.insert(path.to_string(), initialize);
        }
        if let Some(finalize) = finalize {
            self.finalizes.insert(path.to_string(), finalize);
        }
    }

    pub fn unbind(&mut self, path: &str) {
        self.initializes.remove(path);
        self.finalizes.remove(path);
        self.initialized.remove(path);
    }

    pub fn initializer(&self, path: &str) -> Option<InitializeFn> {
        self.initializes.get(path).cloned()
    }

    #[inline]
    pub fn is_initialized(&self, path: &str) -> bool {
        self.initialized.contains(path)
    }

    pub fn mark_initialized(&mut self, path: &str) {
        self.initialized.insert(path.to_string());
    }

    /// Mark every path with an initializer as initialized, returning the
    /// transforms to run. Used when a whole data set enters the form.
    pub fn begin_initialize_all(&mut self) -> Vec<(String, InitializeFn)> {
        self.initialized = self.initializes.keys().cloned().collect();
        self.initializes
            .iter()
            .map(|(path, f)| (path.clone(), Arc::clone(f)))
            .collect()
    }

    /// Finalize transforms to run on the next pass.
    pub fn finalizers(&self) -> Vec<(String, FinalizeFn)> {
        self.finalizes
            .iter()
            .map(|(path, f)| (path.clone(), Arc::clone(f)))
            .collect()
    }

    pub fn clear(&mut self) {
        self.initializes.clear();
        self.finalizes.clear();
        self.initialized.clear();
    }
}

/// Run initializers concurrently against `data`, each reading its own path.
pub async fn run_initializers(
    data: Value,
    transforms: Vec<(String, InitializeFn)>,
) -> Result<Value> {
    let results = try_join_all(transforms.into_iter().map(|(path, f)| {
        let raw = path::get(&data, &path).cloned().unwrap_or(Value::Null);
        f(raw).map(move |result| {
            result
                .map(|value| (path.clone(), value))
                .map_err(|source| FormError::Initialize { path, source })
        })
    }))
    .await?;
    Ok(results
        .into_iter()
        .fold(data, |acc, (path, value)| path::set(&acc, &path, value)))
}

/// Run finalizers concurrently against `data`, each reading its own path.
pub async fn run_finalizers(
    data: Value,
    transforms: Vec<(String, FinalizeFn)>,
    is_submit: bool,
) -> Result<Value> {
    let results = try_join_all(transforms.into_iter().map(|(path, f)| {
        let raw = path::get(&data, &path).cloned().unwrap_or(Value::Null);
        f(raw, is_submit).map(move |result| {
            result
                .map(|value| (path.clone(), value))
                .map_err(|source| FormError::Finalize { path, source })
        })
    }))
    .await?;
    Ok(results
        .into_iter()
        .fold(data, |acc, (path, value)| path::set(&acc, &path, value)))
}
