#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use formstate_model::{Feedback, SubmitResponse};
use formstate_store::{FormConfig, FormStore, Submitter, TransportError, Validator};
use serde_json::Value;
use tokio::sync::oneshot;

type Reply<T> = Result<T, TransportError>;

/// Calls recorded by a mock transport, with optional held replies.
///
/// A call takes the oldest held reply channel and waits on it; with none
/// held it answers immediately with the default reply.
struct Script<T> {
    calls: Mutex<Vec<Value>>,
    held: Mutex<VecDeque<oneshot::Receiver<Reply<T>>>>,
}

impl<T> Default for Script<T> {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            held: Mutex::new(VecDeque::new()),
        }
    }
}

impl<T> Script<T> {
    fn hold(&self) -> oneshot::Sender<Reply<T>> {
        let (tx, rx) = oneshot::channel();
        self.held.lock().unwrap().push_back(rx);
        tx
    }

    async fn answer(&self, data: Value, default: impl FnOnce(Value) -> Reply<T>) -> Reply<T> {
        self.calls.lock().unwrap().push(data.clone());
        let held = self.held.lock().unwrap().pop_front();
        match held {
            Some(rx) => rx
                .await
                .unwrap_or_else(|_| Err(TransportError::new("reply dropped"))),
            None => default(data),
        }
    }

    fn calls(&self) -> Vec<Value> {
        self.calls.lock().unwrap().clone()
    }
}

/// Validator answering with no feedback unless a reply is held.
#[derive(Default)]
pub struct MockValidator {
    script: Script<Vec<Feedback>>,
}

impl MockValidator {
    pub fn hold(&self) -> oneshot::Sender<Reply<Vec<Feedback>>> {
        self.script.hold()
    }

    pub fn calls(&self) -> Vec<Value> {
        self.script.calls()
    }
}

#[async_trait]
impl Validator for MockValidator {
    async fn validate(&self, data: Value) -> Reply<Vec<Feedback>> {
        self.script.answer(data, |_| Ok(Vec::new())).await
    }
}

/// Submitter echoing the payload as saved unless a reply is held.
#[derive(Default)]
pub struct MockSubmitter {
    script: Script<SubmitResponse>,
}

impl MockSubmitter {
    pub fn hold(&self) -> oneshot::Sender<Reply<SubmitResponse>> {
        self.script.hold()
    }

    pub fn calls(&self) -> Vec<Value> {
        self.script.calls()
    }
}

#[async_trait]
impl Submitter for MockSubmitter {
    async fn submit(&self, data: Value) -> Reply<SubmitResponse> {
        self.script
            .answer(data, |data| Ok(SubmitResponse::saved(data)))
            .await
    }
}

pub struct Harness {
    pub store: FormStore,
    pub submitter: Arc<MockSubmitter>,
    pub validator: Arc<MockValidator>,
}

pub fn harness(config: FormConfig) -> Harness {
    let submitter = Arc::new(MockSubmitter::default());
    let validator = Arc::new(MockValidator::default());
    let store = FormStore::builder(Arc::clone(&submitter))
        .validator(Arc::clone(&validator))
        .config(config)
        .build();
    Harness {
        store,
        submitter,
        validator,
    }
}

/// Let spawned tasks run without advancing the paused clock.
pub async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

/// Advance the paused clock past the debounce window.
pub async fn past_debounce() {
    tokio::time::sleep(Duration::from_millis(350)).await;
    settle().await;
}
