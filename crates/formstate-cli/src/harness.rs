//! Scripted transports driven by a scenario.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use formstate_model::{Feedback, SubmitResponse, path};
use formstate_store::{Submitter, TransportError, Validator};
use serde_json::Value;

use crate::scenario::{Rule, SubmitterScript, ValidatorScript, evaluate};

async fn latency(ms: u64) {
    if ms > 0 {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}

/// Validator applying the scenario's rules.
#[derive(Debug)]
pub struct ScriptedValidator {
    script: ValidatorScript,
    calls: AtomicU64,
}

impl ScriptedValidator {
    pub fn new(script: ValidatorScript) -> Self {
        Self {
            script,
            calls: AtomicU64::new(0),
        }
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Validator for ScriptedValidator {
    async fn validate(&self, data: Value) -> Result<Vec<Feedback>, TransportError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        latency(self.script.latency_ms).await;
        if let Some(message) = &self.script.fail {
            return Err(TransportError::new(message.clone()));
        }
        Ok(evaluate(&self.script.rules, &data))
    }
}

/// Submitter that records payloads and answers per the scenario.
#[derive(Debug)]
pub struct ScriptedSubmitter {
    script: SubmitterScript,
    rules: Vec<Rule>,
    payloads: Mutex<Vec<Value>>,
    next_id: AtomicU64,
}

impl ScriptedSubmitter {
    /// `rules` are applied only when the script rejects invalid data.
    pub fn new(script: SubmitterScript, rules: Vec<Rule>) -> Self {
        Self {
            script,
            rules,
            payloads: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Payloads received so far, in call order.
    pub fn payloads(&self) -> Vec<Value> {
        self.payloads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Submitter for ScriptedSubmitter {
    async fn submit(&self, data: Value) -> Result<SubmitResponse, TransportError> {
        self.payloads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(data.clone());
        latency(self.script.latency_ms).await;
        if let Some(message) = &self.script.fail {
            return Err(TransportError::new(message.clone()));
        }
        if self.script.reject_invalid {
            let errors = evaluate(&self.rules, &data);
            if !errors.is_empty() {
                return Ok(SubmitResponse::rejected(errors));
            }
        }
        let saved = match &self.script.assign_id {
            Some(key) if path::is_unset(&data, key) => {
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                path::set(&data, key, Value::from(id))
            }
            _ => data,
        };
        Ok(SubmitResponse::saved(saved))
    }
}
