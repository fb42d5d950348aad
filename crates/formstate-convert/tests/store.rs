use async_trait::async_trait;
use formstate_convert::{date_field, number_field};
use formstate_model::{MessageType, SubmitResponse};
use formstate_store::{FormStore, SubmitOptions, Submitter, TransportError};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct Recorder {
    payloads: Mutex<Vec<Value>>,
}

#[async_trait]
impl Submitter for Recorder {
    async fn submit(&self, data: Value) -> Result<SubmitResponse, TransportError> {
        self.payloads.lock().unwrap().push(data.clone());
        Ok(SubmitResponse::saved(data))
    }
}

#[tokio::test]
async fn test_bindings_convert_at_both_boundaries() {
    let recorder = Arc::new(Recorder::default());
    let store = FormStore::builder(Arc::clone(&recorder)).build();
    store.register_field("born", date_field()).await.unwrap();
    store.register_field("height", number_field()).await.unwrap();

    store
        .preload(Some(json!({ "born": "1990-05-01T00:00:00Z", "height": 180 })))
        .await
        .unwrap();
    assert_eq!(store.field("born"), Some(json!("1990-05-01")));
    assert_eq!(store.field("height"), Some(json!("180")));

    store.set_field("height", json!("181.5")).await.unwrap();
    let response = store.submit(SubmitOptions::default()).await;
    assert!(response.success);
    assert_eq!(
        recorder.payloads.lock().unwrap().clone(),
        vec![json!({ "born": "1990-05-01", "height": 181.5 })]
    );
}

#[tokio::test]
async fn test_bad_date_blocks_submit() {
    let recorder = Arc::new(Recorder::default());
    let store = FormStore::builder(Arc::clone(&recorder)).build();
    store.register_field("born", date_field()).await.unwrap();
    store.set_field("born", json!("someday")).await.unwrap();

    let response = store.submit(SubmitOptions::default()).await;
    assert!(!response.success);
    assert_eq!(response.messages[0].kind, MessageType::System);
    assert!(recorder.payloads.lock().unwrap().is_empty());
}
