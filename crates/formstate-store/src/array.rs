//! Array-group helpers: minimum length padding and empty-entry pruning.

use std::fmt;
use std::sync::Arc;

use formstate_model::path;
use serde_json::Value;

/// Predicate deciding whether an array entry is empty.
pub type EmptyPredicate = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// Initial state for new array entries.
#[derive(Clone)]
pub enum ElementTemplate {
    /// Every new entry is a clone of this value.
    Value(Value),
    /// Entries are built from their index.
    Factory(Arc<dyn Fn(usize) -> Value + Send + Sync>),
}

impl ElementTemplate {
    pub fn factory<F>(f: F) -> Self
    where
        F: Fn(usize) -> Value + Send + Sync + 'static,
    {
        Self::Factory(Arc::new(f))
    }

    pub fn build(&self, index: usize) -> Value {
        match self {
            Self::Value(value) => value.clone(),
            Self::Factory(f) => f(index),
        }
    }
}

impl From<Value> for ElementTemplate {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl fmt::Debug for ElementTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Factory(_) => f.write_str("Factory(..)"),
        }
    }
}

/// Registration parameters for an array group.
#[derive(Clone)]
pub struct ArraySpec {
    pub element: ElementTemplate,
    /// Entries that always exist.
    pub min_length: usize,
    /// Entries created on a fresh (not preloaded) form.
    pub starting_length: usize,
    pub is_empty: EmptyPredicate,
}

impl ArraySpec {
    /// Spec with no minimum, no starting entries and JSON emptiness as the
    /// empty predicate.
    pub fn new(element: impl Into<ElementTemplate>) -> Self {
        Self {
            element: element.into(),
            min_length: 0,
            starting_length: 0,
            is_empty: Arc::new(path::is_empty_value),
        }
    }

    #[must_use]
    pub fn with_min_length(mut self, min_length: usize) -> Self {
        self.min_length = min_length;
        self
    }

    #[must_use]
    pub fn with_starting_length(mut self, starting_length: usize) -> Self {
        self.starting_length = starting_length;
        self
    }

    #[must_use]
    pub fn with_is_empty<F>(mut self, is_empty: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.is_empty = Arc::new(is_empty);
        self
    }

    /// Length to pad to at registration time.
    pub fn resolved_min_length(&self, preloaded: bool) -> usize {
        let starting = if preloaded { 0 } else { self.starting_length };
        self.min_length.max(starting)
    }
}

impl fmt::Debug for ArraySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArraySpec")
            .field("element", &self.element)
            .field("min_length", &self.min_length)
            .field("starting_length", &self.starting_length)
            .finish_non_exhaustive()
    }
}

/// Items of the array at `array_path`, or an empty list when absent.
pub fn items_at(data: &Value, array_path: &str) -> Vec<Value> {
    match path::get(data, array_path) {
        Some(Value::Array(items)) => items.clone(),
        _ => Vec::new(),
    }
}

/// Pad the array at `array_path` to `min_length` entries.
pub fn pad(data: &Value, array_path: &str, min_length: usize, element: &ElementTemplate) -> Value {
    let mut items = items_at(data, array_path);
    for idx in items.len()..min_length {
        items.push(element.build(idx));
    }
    path::set(data, array_path, Value::Array(items))
}

/// Drop entries the registered predicates consider empty.
pub fn prune_empty(data: Value, predicates: &[(String, EmptyPredicate)]) -> Value {
    predicates
        .iter()
        .fold(data, |acc, (array_path, is_empty)| match path::get(&acc, array_path) {
            Some(Value::Array(items)) => {
                let kept: Vec<Value> = items.iter().filter(|v| !is_empty(v)).cloned().collect();
                path::set(&acc, array_path, Value::Array(kept))
            }
            _ => acc,
        })
}
