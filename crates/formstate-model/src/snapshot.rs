//! The published form state.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::feedback::Feedback;

/// Default layout width hint.
pub const DEFAULT_WIDTH: u32 = 800;

/// Per-field validity. A field that has no entry is unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidState {
    Valid,
    Invalid,
}

/// Feedback grouped for display.
///
/// `all` is the raw list from the last validation or submission. `global` and
/// `fields` are derived from it every time the snapshot is published.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Messages {
    pub all: Vec<Feedback>,
    pub global: Vec<Feedback>,
    pub fields: BTreeMap<String, Vec<Feedback>>,
}

impl Messages {
    /// Messages with only `all` populated; the views are rebuilt on publish.
    pub fn from_all(all: Vec<Feedback>) -> Self {
        Self {
            all,
            ..Default::default()
        }
    }

    /// Visible messages for one field (empty unless the field is dirty).
    pub fn for_field(&self, path: &str) -> &[Feedback] {
        self.fields.get(path).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Snapshot of a form: its data plus everything derived from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSnapshot {
    /// The form value. Replaced through the controller, never edited in place.
    pub data: Value,
    /// UI-only scratch values; cleared whenever `data` is replaced wholesale.
    pub conditional_data: Map<String, Value>,
    pub messages: Messages,
    pub valid_field: BTreeMap<String, ValidState>,
    pub valid: bool,
    pub invalid: bool,
    pub showing_inline_errors: bool,
    pub validating: bool,
    pub submitting: bool,
    pub saved: bool,
    pub width: u32,
    pub has_unsaved_changes: bool,
}

impl Default for FormSnapshot {
    fn default() -> Self {
        Self {
            data: Value::Object(Map::new()),
            conditional_data: Map::new(),
            messages: Messages::default(),
            valid_field: BTreeMap::new(),
            valid: true,
            invalid: false,
            showing_inline_errors: false,
            validating: false,
            submitting: false,
            saved: false,
            width: DEFAULT_WIDTH,
            has_unsaved_changes: false,
        }
    }
}

impl FormSnapshot {
    /// Empty snapshot with a given width hint.
    pub fn with_width(width: u32) -> Self {
        Self {
            width,
            ..Default::default()
        }
    }

    /// Validity of a field path, `None` when unset.
    pub fn valid_state(&self, path: &str) -> Option<ValidState> {
        self.valid_field.get(path).copied()
    }

    /// Count of error-severity messages in `messages.all`.
    pub fn error_count(&self) -> usize {
        self.messages.all.iter().filter(|m| m.is_error()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_snapshot_is_valid_and_empty() {
        let snapshot = FormSnapshot::default();
        assert!(snapshot.valid);
        assert!(!snapshot.invalid);
        assert_eq!(snapshot.data, json!({}));
        assert_eq!(snapshot.width, DEFAULT_WIDTH);
        assert_eq!(snapshot.valid_state("name"), None);
    }

    #[test]
    fn test_serializes_camel_case() {
        let value = serde_json::to_value(FormSnapshot::with_width(640)).unwrap();
        assert_eq!(value["hasUnsavedChanges"], json!(false));
        assert_eq!(value["showingInlineErrors"], json!(false));
        assert_eq!(value["validField"], json!({}));
        assert_eq!(value["width"], json!(640));
    }

    #[test]
    fn test_for_field_defaults_to_empty() {
        let mut messages = Messages::default();
        assert!(messages.for_field("name").is_empty());
        messages
            .fields
            .insert("name".into(), vec![Feedback::error("name", "Required")]);
        assert_eq!(messages.for_field("name").len(), 1);
    }
}
