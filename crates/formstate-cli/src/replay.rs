//! Replay a scenario against a live controller.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use formstate_model::{Feedback, FormSnapshot, SubmitResponse, ValidState};
use formstate_store::{FormEvent, FormStore, SubmitOptions};
use serde::Serialize;
use serde_json::{Value, json};
use tokio::sync::broadcast;
use tracing::{debug, info, trace};

use crate::harness::{ScriptedSubmitter, ScriptedValidator};
use crate::scenario::{Expectations, LayoutEntry, Scenario, Step};

/// State captured by a `snapshot` step.
#[derive(Debug, Clone, Serialize)]
pub struct Checkpoint {
    pub label: String,
    pub snapshot: FormSnapshot,
}

/// Final state of one scalar field as the UI would render it.
#[derive(Debug, Clone, Serialize)]
pub struct FieldReport {
    pub path: String,
    pub value: Option<Value>,
    pub valid: Option<ValidState>,
    pub messages: Vec<Feedback>,
}

/// Everything observed while replaying a scenario.
#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    pub scenario: String,
    pub checkpoints: Vec<Checkpoint>,
    pub events: Vec<FormEvent>,
    /// Responses returned by `submit` steps.
    pub responses: Vec<SubmitResponse>,
    /// Payloads the submitter received.
    pub payloads: Vec<Value>,
    pub validations: u64,
    pub fields: Vec<FieldReport>,
    pub final_snapshot: FormSnapshot,
}

impl ReplayReport {
    /// Fields showing at least one error, sorted.
    pub fn error_fields(&self) -> Vec<String> {
        self.final_snapshot
            .messages
            .fields
            .iter()
            .filter(|(_, messages)| messages.iter().any(Feedback::is_error))
            .map(|(path, _)| path.clone())
            .collect()
    }

    pub fn event_names(&self) -> Vec<&'static str> {
        self.events.iter().map(FormEvent::name).collect()
    }
}

/// An expectation the replay did not meet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mismatch {
    pub check: &'static str,
    pub expected: Value,
    pub actual: Value,
}

/// Run every step of `scenario` and collect what happened.
///
/// Must run inside a tokio runtime with the time driver enabled.
pub async fn replay(scenario: &Scenario) -> Result<ReplayReport> {
    let submitter = Arc::new(ScriptedSubmitter::new(
        scenario.submitter.clone(),
        scenario.rules().to_vec(),
    ));
    let validator = scenario
        .validator
        .clone()
        .map(|script| Arc::new(ScriptedValidator::new(script)));

    let mut builder = FormStore::builder(Arc::clone(&submitter)).config(scenario.config.clone());
    if let Some(validator) = &validator {
        builder = builder.validator(Arc::clone(validator));
    }
    let store = builder.build();
    let mut events_rx = store.subscribe_events();

    for entry in &scenario.layout {
        match entry {
            LayoutEntry::Field(field) => store
                .register_field(&field.path, field.binding())
                .await
                .with_context(|| format!("register field {}", field.path))?,
            LayoutEntry::Array(array) => store.register_array(&array.path, array.spec()),
        }
    }
    store.mount();
    if let Some(data) = &scenario.preload {
        store.preload(Some(data.clone())).await.context("preload")?;
    }

    let mut checkpoints = Vec::new();
    let mut responses = Vec::new();
    let mut events = Vec::new();
    for (idx, step) in scenario.steps.iter().enumerate() {
        trace!(step = idx + 1, kind = step.name(), "replaying step");
        match step {
            Step::Snapshot { label } => checkpoints.push(Checkpoint {
                label: label.clone(),
                snapshot: store.snapshot(),
            }),
            Step::Submit { autosave } => {
                let response = store.submit(SubmitOptions { autosave: *autosave }).await;
                debug!(success = response.success, "submit step finished");
                responses.push(response);
            }
            other => apply(&store, other)
                .await
                .with_context(|| format!("step {} ({})", idx + 1, step.name()))?,
        }
        drain(&mut events_rx, &mut events);
    }
    drain(&mut events_rx, &mut events);

    let fields = scenario
        .field_paths()
        .map(|path| FieldReport {
            path: path.to_string(),
            value: store.field(path),
            valid: store.field_valid(path),
            messages: store.feedback(path),
        })
        .collect();

    let report = ReplayReport {
        scenario: scenario.name.clone(),
        checkpoints,
        events,
        responses,
        payloads: submitter.payloads(),
        validations: validator.as_ref().map_or(0, |v| v.calls()),
        fields,
        final_snapshot: store.snapshot(),
    };
    info!(
        scenario = %scenario.name,
        steps = scenario.steps.len(),
        submits = report.payloads.len(),
        "replay finished"
    );
    Ok(report)
}

async fn apply(store: &FormStore, step: &Step) -> Result<()> {
    match step {
        Step::Set { path, value } => {
            let changed = store.set_field(path, value.clone()).await?;
            if !changed {
                debug!(path = %path, "value unchanged");
            }
        }
        Step::Push { path, value } => store.push(path, value.clone()),
        Step::PushNew { path } => refused(store.push_new(path), "push_new", path),
        Step::Delete { path, index } => {
            refused(store.delete_from_array(path, *index), "delete", path);
        }
        Step::MoveUp { path, index } => refused(store.move_up(path, *index), "move_up", path),
        Step::Blur => store.update_dirty_on_blur(),
        Step::Wait { ms } => tokio::time::sleep(Duration::from_millis(*ms)).await,
        Step::Reorder { layout } => store.reorder(layout.clone()),
        Step::Mount => store.mount(),
        Step::Unmount => store.unmount(),
        Step::Preload { data } => store.preload(data.clone()).await?,
        Step::Reset { data } => store.reset(data.clone()).await?,
        Step::Submit { .. } | Step::Snapshot { .. } => {}
    }
    Ok(())
}

fn refused(applied: bool, op: &str, path: &str) {
    if !applied {
        debug!(op, path, "array operation refused");
    }
}

fn drain(rx: &mut broadcast::Receiver<FormEvent>, into: &mut Vec<FormEvent>) {
    while let Ok(event) = rx.try_recv() {
        into.push(event);
    }
}

/// Compare a report against the scenario's expectations.
pub fn check(report: &ReplayReport, expect: &Expectations) -> Vec<Mismatch> {
    let snapshot = &report.final_snapshot;
    let mut mismatches = Vec::new();
    let mut compare = |check: &'static str, expected: Value, actual: Value| {
        if expected != actual {
            mismatches.push(Mismatch {
                check,
                expected,
                actual,
            });
        }
    };

    if let Some(valid) = expect.valid {
        compare("valid", json!(valid), json!(snapshot.valid));
    }
    if let Some(saved) = expect.saved {
        compare("saved", json!(saved), json!(snapshot.saved));
    }
    if let Some(unsaved) = expect.has_unsaved_changes {
        compare(
            "has_unsaved_changes",
            json!(unsaved),
            json!(snapshot.has_unsaved_changes),
        );
    }
    if let Some(data) = &expect.data {
        compare("data", data.clone(), snapshot.data.clone());
    }
    if let Some(fields) = &expect.error_fields {
        let mut expected = fields.clone();
        expected.sort();
        compare("error_fields", json!(expected), json!(report.error_fields()));
    }
    if let Some(names) = &expect.events {
        compare("events", json!(names), json!(report.event_names()));
    }
    if let Some(count) = expect.submits {
        compare("submits", json!(count), json!(report.payloads.len()));
    }
    mismatches
}
