//! Scenario files: a scripted form session with expected outcomes.
//!
//! A scenario describes the form layout, the transports' behavior and a
//! list of user steps. Files are JSON:
//!
//! ```json
//! {
//!   "name": "signup",
//!   "layout": [
//!     { "kind": "field", "path": "name" },
//!     { "kind": "field", "path": "born", "convert": "date" }
//!   ],
//!   "validator": { "rules": [{ "path": "name", "check": "required", "message": "Required" }] },
//!   "steps": [{ "set": { "path": "born", "value": "1990-05-01" } }, { "wait": { "ms": 400 } }],
//!   "expect": { "valid": false, "error_fields": ["name"] }
//! }
//! ```

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use formstate_convert::{
    date_field, datetime_field, nullable_number_field, nullable_text_field, number_field,
};
use formstate_model::{Feedback, path};
use formstate_store::{ArraySpec, FieldBinding, FormConfig, LayoutMarker};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A scripted form session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub config: FormConfig,
    /// Fields and array groups in rendered order.
    #[serde(default)]
    pub layout: Vec<LayoutEntry>,
    /// Data loaded right after mounting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preload: Option<Value>,
    /// Background validator; absent means the form only validates on submit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validator: Option<ValidatorScript>,
    #[serde(default)]
    pub submitter: SubmitterScript,
    #[serde(default)]
    pub steps: Vec<Step>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expect: Option<Expectations>,
}

impl Scenario {
    /// Read a scenario file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("read scenario {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parse scenario {}", path.display()))
    }

    /// Scalar field paths in layout order.
    pub fn field_paths(&self) -> impl Iterator<Item = &str> {
        self.layout.iter().filter_map(|entry| match entry {
            LayoutEntry::Field(field) => Some(field.path.as_str()),
            LayoutEntry::Array(_) => None,
        })
    }

    /// Rules the validator applies, if there is a validator.
    pub fn rules(&self) -> &[Rule] {
        match &self.validator {
            Some(validator) => &validator.rules,
            None => &[],
        }
    }
}

/// One entry of the form layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LayoutEntry {
    Field(FieldDef),
    Array(ArrayDef),
}

impl LayoutEntry {
    pub fn marker(&self) -> LayoutMarker {
        match self {
            Self::Field(field) => LayoutMarker::field(&field.path),
            Self::Array(array) => LayoutMarker::array(&array.path),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldDef {
    pub path: String,
    /// Value seeded into a fresh form.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub convert: Option<ConvertKind>,
}

impl FieldDef {
    pub fn binding(&self) -> FieldBinding {
        let binding = self
            .convert
            .map_or_else(FieldBinding::new, ConvertKind::binding);
        match &self.initial {
            Some(initial) => binding.initial(initial.clone()),
            None => binding,
        }
    }
}

/// Input conversion applied to a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConvertKind {
    Date,
    Datetime,
    Number,
    NullableNumber,
    NullableText,
}

impl ConvertKind {
    pub fn binding(self) -> FieldBinding {
        match self {
            Self::Date => date_field(),
            Self::Datetime => datetime_field(),
            Self::Number => number_field(),
            Self::NullableNumber => nullable_number_field(),
            Self::NullableText => nullable_text_field(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArrayDef {
    pub path: String,
    /// Template for new entries.
    #[serde(default = "empty_object")]
    pub element: Value,
    #[serde(default)]
    pub min_length: usize,
    #[serde(default)]
    pub starting_length: usize,
    /// Entries where this key is unset count as empty and are not
    /// submitted. Without it, entries are empty when their JSON is.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub empty_when_missing: Option<String>,
}

impl ArrayDef {
    pub fn spec(&self) -> ArraySpec {
        let spec = ArraySpec::new(self.element.clone())
            .with_min_length(self.min_length)
            .with_starting_length(self.starting_length);
        match &self.empty_when_missing {
            Some(key) => {
                let key = key.clone();
                spec.with_is_empty(move |entry| path::is_unset(entry, &key))
            }
            None => spec,
        }
    }
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

/// A validation rule shared by the scripted validator and submitter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Rule {
    /// Field path. `[]` expands over every entry of an array, as in
    /// `contacts[].email`.
    pub path: String,
    pub check: Check,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Check {
    /// Value is present and not an empty string.
    Required,
    /// String value is at most this many characters.
    MaxLength(usize),
    /// Value is one of the listed values (unset passes).
    OneOf(Vec<Value>),
}

impl Check {
    fn passes(&self, value: Option<&Value>) -> bool {
        match self {
            Self::Required => value.is_some_and(|v| !path::is_empty_value(v)),
            Self::MaxLength(max) => value
                .and_then(Value::as_str)
                .is_none_or(|s| s.chars().count() <= *max),
            Self::OneOf(allowed) => match value {
                None | Some(Value::Null) => true,
                Some(v) => allowed.contains(v),
            },
        }
    }
}

impl Rule {
    /// Concrete paths this rule covers in `data`.
    fn paths(&self, data: &Value) -> Vec<String> {
        let Some((array_path, rest)) = self.path.split_once("[]") else {
            return vec![self.path.clone()];
        };
        let len = match path::get(data, array_path) {
            Some(Value::Array(items)) => items.len(),
            _ => 0,
        };
        (0..len).map(|idx| format!("{array_path}.{idx}{rest}")).collect()
    }
}

/// Error feedback for every rule that fails against `data`.
pub fn evaluate(rules: &[Rule], data: &Value) -> Vec<Feedback> {
    rules
        .iter()
        .flat_map(|rule| {
            rule.paths(data)
                .into_iter()
                .filter(|p| !rule.check.passes(path::get(data, p)))
                .map(|p| Feedback::error(p, rule.message.clone()))
                .collect::<Vec<_>>()
        })
        .collect()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ValidatorScript {
    #[serde(default)]
    pub rules: Vec<Rule>,
    #[serde(default)]
    pub latency_ms: u64,
    /// Fail every call with this transport error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fail: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubmitterScript {
    /// Reject submissions that break the validator's rules.
    #[serde(default)]
    pub reject_invalid: bool,
    /// Key the server fills with a generated id when it is unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assign_id: Option<String>,
    #[serde(default)]
    pub latency_ms: u64,
    /// Fail every call with this transport error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fail: Option<String>,
}

/// One user action.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Set { path: String, value: Value },
    Push { path: String, value: Value },
    PushNew { path: String },
    Delete { path: String, index: usize },
    MoveUp { path: String, index: usize },
    Blur,
    Wait { ms: u64 },
    Submit {
        #[serde(default)]
        autosave: bool,
    },
    Reorder { layout: Vec<LayoutMarker> },
    Mount,
    Unmount,
    Preload { data: Option<Value> },
    Reset { data: Option<Value> },
    Snapshot { label: String },
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Set { .. } => "set",
            Self::Push { .. } => "push",
            Self::PushNew { .. } => "push_new",
            Self::Delete { .. } => "delete",
            Self::MoveUp { .. } => "move_up",
            Self::Blur => "blur",
            Self::Wait { .. } => "wait",
            Self::Submit { .. } => "submit",
            Self::Reorder { .. } => "reorder",
            Self::Mount => "mount",
            Self::Unmount => "unmount",
            Self::Preload { .. } => "preload",
            Self::Reset { .. } => "reset",
            Self::Snapshot { .. } => "snapshot",
        }
    }
}

/// Expected final state. Unset entries are not checked.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Expectations {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_unsaved_changes: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Fields showing at least one error, sorted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_fields: Option<Vec<String>>,
    /// Event names in dispatch order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub events: Option<Vec<String>>,
    /// Number of calls the submitter received.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submits: Option<usize>,
}
