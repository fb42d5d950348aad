//! Debounced background validation.
//!
//! Every data change restarts a debounce timer. When it fires, manual forms
//! validate and autosave forms submit. A response is applied only if no
//! newer validation (or submit) started after it.

use crate::array;
use crate::error::{FormError, Result};
use crate::store::{ControllerState, FormStore, Timer};
use crate::submit::SubmitOptions;
use crate::transform::run_finalizers;

impl FormStore {
    /// Request validation after a data change.
    ///
    /// Unmounted forms only remember the request; [`FormStore::mount`] runs
    /// it.
    pub(crate) fn trigger_validation(&self, st: &mut ControllerState) {
        if !st.mounted {
            st.needs_validation = true;
            return;
        }
        let autosave = self.config().autosave;
        st.snapshot.saved = false;
        if !autosave && self.validator().is_none() {
            self.publish(st);
            return;
        }
        st.snapshot.validating = !autosave;
        st.snapshot.submitting = autosave || st.snapshot.submitting;
        self.publish(st);
        self.schedule_debounce(st);
    }

    fn schedule_debounce(&self, st: &mut ControllerState) {
        self.cancel_debounce(st);
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("no tokio runtime, background validation skipped");
            return;
        };
        let id = st.next_timer_id();
        let store = self.clone();
        let delay = self.config().debounce();
        let handle = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if store.with_state(|st| Timer::claim(&mut st.debounce, id)) {
                store.run_debounced().await;
            }
        });
        st.debounce = Some(Timer { id, handle });
    }

    /// Drop a pending debounce timer. Work it already started keeps running.
    pub(crate) fn cancel_debounce(&self, st: &mut ControllerState) {
        if let Some(timer) = st.debounce.take() {
            timer.cancel();
        }
    }

    async fn run_debounced(&self) {
        if self.config().autosave {
            let response = self.submit(SubmitOptions::autosave()).await;
            tracing::debug!(success = response.success, "autosave finished");
        } else if let Err(err) = self.validate().await {
            tracing::warn!(error = %err, "background validation failed");
        }
    }

    /// Validate the current data, applying the result only if still current.
    pub(crate) async fn validate(&self) -> Result<()> {
        let Some(validator) = self.validator() else {
            return Ok(());
        };
        let (version, data, finalizers, predicates) = self.with_state(|st| {
            st.validate_version += 1;
            (
                st.validate_version,
                st.snapshot.data.clone(),
                st.transforms.finalizers(),
                st.empty_predicates(),
            )
        });

        let outcome = async {
            let data = run_finalizers(data, finalizers, false).await?;
            let data = array::prune_empty(data, &predicates);
            Ok::<_, FormError>(validator.validate(data).await?)
        }
        .await;

        self.with_state(|st| {
            if st.validate_version != version {
                tracing::debug!(
                    version,
                    current = st.validate_version,
                    "discarding stale validation"
                );
                return Ok(());
            }
            st.snapshot.validating = false;
            let result = outcome.map(|messages| {
                st.dirty.promote(None);
                st.snapshot.messages.all = messages;
            });
            self.publish(st);
            result
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use formstate_model::{Feedback, SubmitResponse};
    use serde_json::{Value, json};

    use crate::config::FormConfig;
    use crate::error::TransportError;
    use crate::store::FormStore;
    use crate::transport::{Submitter, Validator};

    struct Echo;

    #[async_trait]
    impl Submitter for Echo {
        async fn submit(&self, data: Value) -> Result<SubmitResponse, TransportError> {
            Ok(SubmitResponse::saved(data))
        }
    }

    #[derive(Default)]
    struct Counting {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Validator for Counting {
        async fn validate(&self, _data: Value) -> Result<Vec<Feedback>, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![Feedback::error("name", "Required")])
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_changes_validate_once() {
        let validator = Arc::new(Counting::default());
        let store = FormStore::builder(Echo)
            .validator(Arc::clone(&validator))
            .build();
        store.mount();

        for n in 0..5 {
            store.set_data(json!({ "n": n })).await.unwrap();
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert!(store.snapshot().validating);
        tokio::time::sleep(Duration::from_millis(400)).await;

        assert_eq!(validator.calls.load(Ordering::SeqCst), 1);
        let snapshot = store.snapshot();
        assert!(!snapshot.validating);
        assert_eq!(snapshot.messages.all.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unmounted_form_defers_validation() {
        let validator = Arc::new(Counting::default());
        let store = FormStore::builder(Echo)
            .validator(Arc::clone(&validator))
            .build();

        store.set_data(json!({ "a": 1 })).await.unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(validator.calls.load(Ordering::SeqCst), 0);
        assert!(!store.snapshot().validating);

        store.mount();
        assert!(store.snapshot().validating);
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(validator.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_validator_only_clears_saved() {
        let store = FormStore::builder(Echo).build();
        store.mount();
        store.set_data(json!({ "a": 1 })).await.unwrap();
        let snapshot = store.snapshot();
        assert!(!snapshot.validating);
        assert!(!snapshot.saved);
    }

    #[tokio::test(start_paused = true)]
    async fn test_autosave_marks_submitting_while_debouncing() {
        let store = FormStore::builder(Echo)
            .config(FormConfig::autosave())
            .build();
        store.mount();
        store.set_data(json!({ "a": 1 })).await.unwrap();
        assert!(store.snapshot().submitting);
        assert!(!store.snapshot().validating);

        tokio::time::sleep(Duration::from_secs(1)).await;
        let snapshot = store.snapshot();
        assert!(!snapshot.submitting);
        assert!(snapshot.saved);
    }
}
