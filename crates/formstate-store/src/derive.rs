//! Derived-state computation for published snapshots.
//!
//! [`apply`] takes a candidate snapshot (usually the previous one with one
//! part replaced) and recomputes everything that depends on `messages.all`,
//! the registry, the dirty sets and the saved baseline. It is pure and
//! idempotent.

use std::collections::BTreeMap;

use formstate_model::{Feedback, FormSnapshot, Messages, ValidState};
use serde_json::Value;

use crate::dirty::DirtyTracker;
use crate::registry::FieldRegistry;

/// Everything outside the snapshot that derived state depends on.
#[derive(Debug, Clone, Copy)]
pub struct DeriveContext<'a> {
    pub registry: &'a FieldRegistry,
    pub dirty: &'a DirtyTracker,
    pub mounted: bool,
    /// Data as last loaded or saved; `None` before anything was.
    pub baseline: Option<&'a Value>,
}

/// Recompute derived fields of `raw`.
pub fn apply(raw: FormSnapshot, ctx: &DeriveContext<'_>) -> FormSnapshot {
    let all = raw.messages.all;
    let invalid = all.iter().any(Feedback::is_error);

    let mut valid_field: BTreeMap<String, ValidState> = ctx
        .registry
        .fields()
        .map(|(path, _)| (path.to_string(), ValidState::Valid))
        .collect();
    for message in all.iter().filter(|m| m.is_error()) {
        if let Some(state) = message.path().and_then(|p| valid_field.get_mut(p)) {
            *state = ValidState::Invalid;
        }
    }

    let mut fields: BTreeMap<String, Vec<Feedback>> = BTreeMap::new();
    for message in &all {
        if let Some(path) = message.path()
            && ctx.dirty.is_dirty(path)
        {
            fields
                .entry(path.to_string())
                .or_default()
                .push(message.clone());
        }
    }

    let global: Vec<Feedback> = all
        .iter()
        .filter(|m| m.path().is_none_or(|p| !ctx.registry.contains(p)))
        .cloned()
        .collect();

    let showing_inline_errors = global.iter().any(Feedback::is_error)
        || fields.values().flatten().any(Feedback::is_error);

    let has_unsaved_changes = ctx.mounted && ctx.baseline != Some(&raw.data);

    FormSnapshot {
        messages: Messages {
            all,
            global,
            fields,
        },
        valid_field,
        invalid,
        valid: !invalid,
        showing_inline_errors,
        has_unsaved_changes,
        ..raw
    }
}
