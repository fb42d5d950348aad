//! Submission.
//!
//! A submit finalizes the data, prunes empty array entries and hands the
//! payload to the [`Submitter`](crate::transport::Submitter). Calls that
//! overlap an outstanding transport call await that same call instead of
//! issuing another one.

use formstate_model::{Feedback, Messages, SubmitResponse};
use futures_util::FutureExt;
use serde_json::Value;

use crate::array;
use crate::error::Result;
use crate::events::FormEvent;
use crate::store::FormStore;
use crate::transform::run_finalizers;

/// Options for [`FormStore::submit`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubmitOptions {
    /// Background save triggered by a data change.
    pub autosave: bool,
}

impl SubmitOptions {
    pub fn autosave() -> Self {
        Self { autosave: true }
    }
}

impl FormStore {
    /// Submit the form.
    ///
    /// Never fails: transform and transport errors come back as an
    /// unsuccessful response carrying a single `system` message, which is
    /// also shown on the form.
    pub async fn submit(&self, opts: SubmitOptions) -> SubmitResponse {
        let response = match self.submit_inner(opts).await {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(error = %err, autosave = opts.autosave, "submit failed");
                let messages = vec![Feedback::system(err.user_message())];
                self.with_state(|st| {
                    st.snapshot.messages.all = messages.clone();
                    self.publish(st);
                    SubmitResponse {
                        success: false,
                        data: Some(st.snapshot.data.clone()),
                        messages,
                    }
                })
            }
        };

        self.with_state(|st| {
            st.snapshot.submitting = false;
            self.publish(st);
        });
        response
    }

    async fn submit_inner(&self, opts: SubmitOptions) -> Result<SubmitResponse> {
        let (version, saved_data, finalizers, predicates) = self.with_state(|st| {
            self.cancel_debounce(st);
            st.submit_version += 1;
            // a submit supersedes any validation in progress
            st.validate_version += 1;
            st.snapshot.validating = false;
            st.snapshot.submitting = true;
            self.publish(st);
            (
                st.submit_version,
                st.snapshot.data.clone(),
                st.transforms.finalizers(),
                st.empty_predicates(),
            )
        });

        let data = run_finalizers(saved_data.clone(), finalizers, true).await?;
        let payload = array::prune_empty(data, &predicates);

        let (id, call) = self.with_state(|st| {
            if let Some((id, call)) = &st.in_flight {
                tracing::debug!(flight = id, "joining in-flight submit");
                return (*id, call.clone());
            }
            st.flight_seq += 1;
            let submitter = self.submitter();
            let body = payload.clone();
            let call = async move { submitter.submit(body).await }.boxed().shared();
            st.in_flight = Some((st.flight_seq, call.clone()));
            (st.flight_seq, call)
        });

        let result = call.await;
        // a resolved call is never joined, even while its response is applied
        self.with_state(|st| {
            if st.in_flight.as_ref().is_some_and(|(current, _)| *current == id) {
                st.in_flight = None;
            }
        });
        let mut response = result?;
        if response.data.is_none() {
            response.data = Some(payload);
        }

        let current = self.with_state(|st| {
            if st.submit_version != version {
                return false;
            }
            if opts.autosave {
                st.dirty.promote(None);
            } else {
                st.dirty.mark_form();
            }
            if response.success {
                st.baseline = Some(saved_data);
            }
            st.snapshot.saved = response.success;
            st.snapshot.messages = Messages::from_all(response.messages.clone());
            self.publish(st);
            true
        });
        if !current {
            tracing::debug!(version, "discarding superseded submit response");
            return Ok(response);
        }

        if response.success {
            if !opts.autosave {
                self.preload(response.data.clone()).await?;
                // reloading saved data is not an edit
                self.with_state(|st| {
                    self.cancel_debounce(st);
                    st.snapshot.validating = false;
                    st.snapshot.saved = true;
                    self.publish(st);
                });
            }
            let data = response.data.clone().unwrap_or(Value::Null);
            tracing::info!(autosave = opts.autosave, "form saved");
            self.dispatch(if opts.autosave {
                FormEvent::Autosaved(data)
            } else {
                FormEvent::Saved(data)
            });
        } else {
            tracing::info!(
                errors = response.error_count(),
                autosave = opts.autosave,
                "submit rejected"
            );
            if !opts.autosave {
                self.dispatch(FormEvent::ValidationFail(response.messages.clone()));
            }
        }
        Ok(response)
    }
}
