//! Field registry.
//!
//! Scalar fields and array groups live in two maps that share one index
//! space, so the relative order across both kinds is preserved. Indices are
//! kept contiguous: removals shift every later entry down by one, and a
//! rebuild from a discovered layout assigns `0..n` afresh.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Kind of a registered path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Scalar,
    Array,
}

/// One entry of a structural layout, in mount order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutMarker {
    pub kind: FieldKind,
    pub path: String,
}

impl LayoutMarker {
    pub fn field(path: impl Into<String>) -> Self {
        Self {
            kind: FieldKind::Scalar,
            path: path.into(),
        }
    }

    pub fn array(path: impl Into<String>) -> Self {
        Self {
            kind: FieldKind::Array,
            path: path.into(),
        }
    }
}

/// Discovers the current structural order of the rendered form.
///
/// The controller makes no assumption about how the order is produced.
pub trait LayoutSource {
    fn discover(&self) -> Vec<LayoutMarker>;
}

impl<F> LayoutSource for F
where
    F: Fn() -> Vec<LayoutMarker>,
{
    fn discover(&self) -> Vec<LayoutMarker> {
        self()
    }
}

/// Ordered set of registered scalar fields and array groups.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldRegistry {
    fields: BTreeMap<String, usize>,
    arrays: BTreeMap<String, usize>,
}

impl FieldRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries across both kinds.
    #[inline]
    pub fn len(&self) -> usize {
        self.fields.len() + self.arrays.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.arrays.is_empty()
    }

    /// Register a scalar field at the next index. Re-registering keeps the
    /// existing index.
    pub fn register_field(&mut self, path: &str) -> usize {
        if let Some(&idx) = self.fields.get(path) {
            return idx;
        }
        let idx = self.len();
        self.fields.insert(path.to_string(), idx);
        idx
    }

    /// Register an array group at the next index.
    pub fn register_array(&mut self, path: &str) -> usize {
        if let Some(&idx) = self.arrays.get(path) {
            return idx;
        }
        let idx = self.len();
        self.arrays.insert(path.to_string(), idx);
        idx
    }

    /// Remove a scalar field, returning the index it held.
    pub fn unregister_field(&mut self, path: &str) -> Option<usize> {
        let idx = self.fields.remove(path)?;
        self.compact(idx);
        Some(idx)
    }

    /// Remove an array group, returning the index it held.
    pub fn unregister_array(&mut self, path: &str) -> Option<usize> {
        let idx = self.arrays.remove(path)?;
        self.compact(idx);
        Some(idx)
    }

    fn compact(&mut self, removed: usize) {
        for idx in self.fields.values_mut().chain(self.arrays.values_mut()) {
            if *idx > removed {
                *idx -= 1;
            }
        }
    }

    pub fn field_order(&self, path: &str) -> Option<usize> {
        self.fields.get(path).copied()
    }

    pub fn array_order(&self, path: &str) -> Option<usize> {
        self.arrays.get(path).copied()
    }

    /// Order index of a path of either kind.
    pub fn order(&self, path: &str) -> Option<usize> {
        self.field_order(path).or_else(|| self.array_order(path))
    }

    #[inline]
    pub fn is_field(&self, path: &str) -> bool {
        self.fields.contains_key(path)
    }

    #[inline]
    pub fn is_array(&self, path: &str) -> bool {
        self.arrays.contains_key(path)
    }

    /// Whether the path is a registered field or array group.
    #[inline]
    pub fn contains(&self, path: &str) -> bool {
        self.is_field(path) || self.is_array(path)
    }

    /// Registered scalar fields with their indices.
    pub fn fields(&self) -> impl Iterator<Item = (&str, usize)> {
        self.fields.iter().map(|(path, &idx)| (path.as_str(), idx))
    }

    /// Registered array groups with their indices.
    pub fn arrays(&self) -> impl Iterator<Item = (&str, usize)> {
        self.arrays.iter().map(|(path, &idx)| (path.as_str(), idx))
    }

    /// Every entry of both kinds.
    pub fn entries(&self) -> impl Iterator<Item = (&str, usize, FieldKind)> {
        self.fields()
            .map(|(path, idx)| (path, idx, FieldKind::Scalar))
            .chain(self.arrays().map(|(path, idx)| (path, idx, FieldKind::Array)))
    }

    /// Entries sorted by order index.
    pub fn ordered(&self) -> Vec<LayoutMarker> {
        let mut entries: Vec<_> = self.entries().collect();
        entries.sort_by_key(|&(_, idx, _)| idx);
        entries
            .into_iter()
            .map(|(path, _, kind)| LayoutMarker {
                kind,
                path: path.to_string(),
            })
            .collect()
    }

    /// Paths of both kinds whose index is at most `max`.
    pub fn paths_through(&self, max: usize) -> Vec<String> {
        self.entries()
            .filter(|&(_, idx, _)| idx <= max)
            .map(|(path, _, _)| path.to_string())
            .collect()
    }

    /// Replace every entry with the given layout, returning the previous
    /// registry. Duplicate markers keep their first position.
    pub fn rebuild(&mut self, layout: impl IntoIterator<Item = LayoutMarker>) -> FieldRegistry {
        let previous = std::mem::take(self);
        for marker in layout {
            if self.contains(&marker.path) {
                continue;
            }
            match marker.kind {
                FieldKind::Scalar => self.register_field(&marker.path),
                FieldKind::Array => self.register_array(&marker.path),
            };
        }
        previous
    }

    pub fn clear(&mut self) {
        self.fields.clear();
        self.arrays.clear();
    }
}
