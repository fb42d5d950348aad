//! Dirty-state tracking for error display.
//!
//! A field is dirty once the user has reached or passed it; only dirty
//! fields show their validation errors. Marking a field dirty stages it (and
//! every field before it) for the *next tick*: staged paths become dirty
//! after the next validation completes or the layout is re-derived. This
//! avoids flashing a "required" error on a field that just received its
//! first character, while the validation that will clear it is in flight.

use std::collections::BTreeSet;

use formstate_model::path;
use serde_json::Value;

use crate::registry::FieldRegistry;

/// Tracks which fields may show their errors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirtyTracker {
    /// Paths whose errors are shown.
    dirty: BTreeSet<String>,

    /// Paths promoted to `dirty` on the next tick.
    next_tick: BTreeSet<String>,

    /// Every field is dirty (after a full submit or a preload).
    dirty_form: bool,
}

impl DirtyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether errors for `path` are shown.
    #[inline]
    pub fn is_dirty(&self, path: &str) -> bool {
        self.dirty_form || self.dirty.contains(path)
    }

    #[inline]
    pub fn is_staged(&self, path: &str) -> bool {
        self.next_tick.contains(path)
    }

    #[inline]
    pub fn is_form_dirty(&self) -> bool {
        self.dirty_form
    }

    pub fn dirty_paths(&self) -> impl Iterator<Item = &str> {
        self.dirty.iter().map(String::as_str)
    }

    pub fn staged_paths(&self) -> impl Iterator<Item = &str> {
        self.next_tick.iter().map(String::as_str)
    }

    /// Mark every field dirty.
    pub fn mark_form(&mut self) {
        self.dirty_form = true;
    }

    /// Stage a single path for the next tick.
    pub fn stage(&mut self, path: impl Into<String>) {
        self.next_tick.insert(path.into());
    }

    /// Stage `path` and every field or array group ordered before it.
    ///
    /// Returns `false` when `path` is not a registered scalar field.
    pub fn mark_through(&mut self, registry: &FieldRegistry, path: &str) -> bool {
        let Some(max) = registry.field_order(path) else {
            return false;
        };
        self.next_tick.extend(registry.paths_through(max));
        true
    }

    /// Move staged paths into the dirty set, leaving `excluding` staged.
    pub fn promote(&mut self, excluding: Option<&str>) {
        let staged = std::mem::take(&mut self.next_tick);
        for path in staged {
            if excluding == Some(path.as_str()) {
                self.next_tick.insert(path);
            } else {
                self.dirty.insert(path);
            }
        }
    }

    /// Mark the form dirty after a preload or submit.
    ///
    /// A manual form is dirtied wholesale. An autosave form may have been
    /// abandoned half way, so only the fields up to the last one holding a
    /// non-empty value are dirtied.
    pub fn mark_form_for(&mut self, registry: &FieldRegistry, data: &Value, autosave: bool) {
        if !autosave {
            self.dirty_form = true;
            return;
        }
        let furthest = registry
            .fields()
            .filter(|(key, _)| path::get(data, key).is_some_and(|v| !path::is_empty_value(v)))
            .max_by_key(|&(_, order)| order)
            .map(|(key, _)| key.to_string());
        if let Some(key) = furthest {
            self.mark_through(registry, &key);
        }
    }

    /// Highest order among dirty or staged paths, if any is registered.
    pub fn max_order(&self, registry: &FieldRegistry) -> Option<usize> {
        self.dirty
            .iter()
            .chain(self.next_tick.iter())
            .filter_map(|path| registry.order(path))
            .max()
    }

    /// Forget a path that is no longer registered.
    pub fn forget(&mut self, path: &str) {
        self.dirty.remove(path);
        self.next_tick.remove(path);
    }

    pub fn clear(&mut self) {
        self.dirty.clear();
        self.next_tick.clear();
        self.dirty_form = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn registry(paths: &[&str]) -> FieldRegistry {
        let mut registry = FieldRegistry::new();
        for path in paths {
            registry.register_field(path);
        }
        registry
    }

    #[test]
    fn test_new_tracker_is_clean() {
        let tracker = DirtyTracker::new();
        assert!(!tracker.is_form_dirty());
        assert!(!tracker.is_dirty("a"));
    }

    #[test]
    fn test_mark_through_stages_preceding_fields() {
        let mut registry = registry(&["a", "b", "c"]);
        registry.register_array("list");
        let mut tracker = DirtyTracker::new();

        assert!(tracker.mark_through(&registry, "b"));
        assert!(tracker.is_staged("a"));
        assert!(tracker.is_staged("b"));
        assert!(!tracker.is_staged("c"));
        assert!(!tracker.is_staged("list"));
        // staging is not yet dirty
        assert!(!tracker.is_dirty("a"));
    }

    #[test]
    fn test_mark_through_includes_arrays_before() {
        let mut registry = FieldRegistry::new();
        registry.register_array("list");
        registry.register_field("after");
        let mut tracker = DirtyTracker::new();

        tracker.mark_through(&registry, "after");
        assert!(tracker.is_staged("list"));
    }

    #[test]
    fn test_mark_through_unknown_path() {
        let registry = registry(&["a"]);
        let mut tracker = DirtyTracker::new();
        assert!(!tracker.mark_through(&registry, "zzz"));
        assert_eq!(tracker.staged_paths().count(), 0);
    }

    #[test]
    fn test_promote_respects_exclusion() {
        let mut tracker = DirtyTracker::new();
        tracker.stage("a");
        tracker.stage("b");
        tracker.promote(Some("b"));
        assert!(tracker.is_dirty("a"));
        assert!(!tracker.is_dirty("b"));
        assert!(tracker.is_staged("b"));

        tracker.promote(None);
        assert!(tracker.is_dirty("b"));
        assert_eq!(tracker.staged_paths().count(), 0);
    }

    #[test]
    fn test_mark_form_manual() {
        let registry = registry(&["a", "b"]);
        let mut tracker = DirtyTracker::new();
        tracker.mark_form_for(&registry, &json!({}), false);
        assert!(tracker.is_form_dirty());
        assert!(tracker.is_dirty("anything"));
    }

    #[test]
    fn test_mark_form_autosave_stops_at_last_filled_field() {
        let registry = registry(&["a", "b", "c", "d"]);
        let data = json!({ "a": "x", "b": "", "c": 3, "d": null });
        let mut tracker = DirtyTracker::new();

        tracker.mark_form_for(&registry, &data, true);
        tracker.promote(None);

        assert!(!tracker.is_form_dirty());
        assert!(tracker.is_dirty("a"));
        assert!(tracker.is_dirty("b"));
        assert!(tracker.is_dirty("c"));
        assert!(!tracker.is_dirty("d"));
    }

    #[test]
    fn test_mark_form_autosave_with_empty_data() {
        let registry = registry(&["a", "b"]);
        let mut tracker = DirtyTracker::new();
        tracker.mark_form_for(&registry, &json!({ "a": "" }), true);
        assert_eq!(tracker.staged_paths().count(), 0);
        assert!(!tracker.is_form_dirty());
    }

    #[test]
    fn test_max_order_and_forget() {
        let registry = registry(&["a", "b", "c"]);
        let mut tracker = DirtyTracker::new();
        assert_eq!(tracker.max_order(&registry), None);
        tracker.stage("b");
        tracker.stage("gone");
        assert_eq!(tracker.max_order(&registry), Some(1));
        tracker.forget("b");
        assert_eq!(tracker.max_order(&registry), None);
    }

    proptest! {
        #[test]
        fn prop_reveal_is_monotonic(count in 1usize..12, pick in 0usize..12) {
            let paths: Vec<String> = (0..count).map(|i| format!("f{i}")).collect();
            let mut registry = FieldRegistry::new();
            for path in &paths {
                registry.register_field(path);
            }
            let target = pick % count;
            let mut tracker = DirtyTracker::new();
            tracker.mark_through(&registry, &paths[target]);
            tracker.promote(None);
            for (idx, path) in paths.iter().enumerate() {
                prop_assert_eq!(tracker.is_dirty(path), idx <= target);
            }
        }
    }
}
