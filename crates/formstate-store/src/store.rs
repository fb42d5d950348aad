//! The form controller.
//!
//! [`FormStore`] is a cheap, cloneable handle. All mutable state sits behind
//! one lock that is only ever taken inside synchronous sections, so no
//! operation holds it across an `.await`. Every mutation ends with a publish:
//! derived fields are recomputed and the new snapshot is sent on a `watch`
//! channel, so observers only ever see consistent states.
//!
//! Suspension points are the validator, the submitter and field transforms.
//! Responses are applied in "freshest wins" order through version counters;
//! debounce timers are aborted outright when superseded.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use formstate_model::{Feedback, FormSnapshot, SubmitResponse, ValidState, path};
use futures_util::future::{BoxFuture, Shared};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use crate::array::{ArraySpec, EmptyPredicate};
use crate::config::FormConfig;
use crate::derive::{self, DeriveContext};
use crate::dirty::DirtyTracker;
use crate::error::{FormError, Result, TransportError};
use crate::events::{EventBus, FormEvent};
use crate::registry::FieldRegistry;
use crate::transform::{FieldTransforms, run_initializers};
use crate::transport::{Submitter, Validator};

/// A submission shared by every caller that arrives while it is in flight.
pub(crate) type InFlightSubmit =
    Shared<BoxFuture<'static, std::result::Result<SubmitResponse, TransportError>>>;

/// A scheduled task owned by the controller.
#[derive(Debug)]
pub(crate) struct Timer {
    pub(crate) id: u64,
    pub(crate) handle: JoinHandle<()>,
}

impl Timer {
    pub(crate) fn cancel(self) {
        self.handle.abort();
    }

    /// Take the timer out of `slot` if it is still the one with `id`.
    ///
    /// A claimed timer is no longer cancellable, so work it starts runs to
    /// completion even if a newer timer is scheduled meanwhile.
    pub(crate) fn claim(slot: &mut Option<Timer>, id: u64) -> bool {
        if slot.as_ref().is_some_and(|timer| timer.id == id) {
            *slot = None;
            true
        } else {
            false
        }
    }
}

/// Everything the controller owns.
#[derive(Default)]
pub(crate) struct ControllerState {
    pub(crate) snapshot: FormSnapshot,
    pub(crate) registry: FieldRegistry,
    pub(crate) dirty: DirtyTracker,
    pub(crate) transforms: FieldTransforms,
    pub(crate) arrays: BTreeMap<String, ArraySpec>,
    pub(crate) validate_version: u64,
    pub(crate) submit_version: u64,
    pub(crate) preloaded: bool,
    pub(crate) mounted: bool,
    pub(crate) needs_validation: bool,
    /// Data as last preloaded or saved, for unsaved-changes detection.
    pub(crate) baseline: Option<Value>,
    pub(crate) debounce: Option<Timer>,
    pub(crate) preload_timer: Option<Timer>,
    pub(crate) timer_seq: u64,
    pub(crate) in_flight: Option<(u64, InFlightSubmit)>,
    pub(crate) flight_seq: u64,
}

impl ControllerState {
    pub(crate) fn empty_predicates(&self) -> Vec<(String, EmptyPredicate)> {
        self.arrays
            .iter()
            .map(|(path, spec)| (path.clone(), Arc::clone(&spec.is_empty)))
            .collect()
    }

    pub(crate) fn next_timer_id(&mut self) -> u64 {
        self.timer_seq += 1;
        self.timer_seq
    }
}

struct StoreInner {
    config: FormConfig,
    submitter: Arc<dyn Submitter>,
    validator: Option<Arc<dyn Validator>>,
    state: Mutex<ControllerState>,
    snapshot_tx: watch::Sender<FormSnapshot>,
    events: EventBus,
}

/// Builder for [`FormStore`].
pub struct FormStoreBuilder {
    submitter: Arc<dyn Submitter>,
    validator: Option<Arc<dyn Validator>>,
    config: FormConfig,
}

impl FormStoreBuilder {
    /// Validate data changes with `validator`. Without one, only submit
    /// reports problems.
    #[must_use]
    pub fn validator(mut self, validator: impl Validator + 'static) -> Self {
        self.validator = Some(Arc::new(validator));
        self
    }

    #[must_use]
    pub fn config(mut self, config: FormConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> FormStore {
        let snapshot = FormSnapshot::with_width(self.config.width);
        let (snapshot_tx, _) = watch::channel(snapshot.clone());
        let state = ControllerState {
            snapshot,
            ..Default::default()
        };
        FormStore {
            inner: Arc::new(StoreInner {
                events: EventBus::new(self.config.event_capacity),
                config: self.config,
                submitter: self.submitter,
                validator: self.validator,
                state: Mutex::new(state),
                snapshot_tx,
            }),
        }
    }
}

/// Options for [`FormStore::set_data_with`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetDataOptions {
    /// The data was taken from this form's own state and is already in UI
    /// representation.
    pub skip_initialize: bool,
    /// Leave the dirty sets alone.
    pub skip_dirty_form: bool,
}

/// Handle to a form controller.
///
/// Timers are spawned on the ambient tokio runtime, so data mutations of a
/// mounted form must happen inside one.
#[derive(Clone)]
pub struct FormStore {
    inner: Arc<StoreInner>,
}

impl std::fmt::Debug for FormStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormStore")
            .field("config", &self.inner.config)
            .field("has_validator", &self.inner.validator.is_some())
            .finish_non_exhaustive()
    }
}

impl FormStore {
    pub fn builder(submitter: impl Submitter + 'static) -> FormStoreBuilder {
        FormStoreBuilder {
            submitter: Arc::new(submitter),
            validator: None,
            config: FormConfig::default(),
        }
    }

    pub fn config(&self) -> &FormConfig {
        &self.inner.config
    }

    pub(crate) fn submitter(&self) -> Arc<dyn Submitter> {
        Arc::clone(&self.inner.submitter)
    }

    pub(crate) fn validator(&self) -> Option<Arc<dyn Validator>> {
        self.inner.validator.clone()
    }

    pub(crate) fn dispatch(&self, event: FormEvent) {
        self.inner.events.publish(event);
    }

    fn lock(&self) -> MutexGuard<'_, ControllerState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` with exclusive access to the controller state.
    pub(crate) fn with_state<R>(&self, f: impl FnOnce(&mut ControllerState) -> R) -> R {
        let mut guard = self.lock();
        f(&mut guard)
    }

    /// Recompute derived fields and publish the snapshot.
    pub(crate) fn publish(&self, st: &mut ControllerState) {
        let raw = std::mem::take(&mut st.snapshot);
        st.snapshot = derive::apply(
            raw,
            &DeriveContext {
                registry: &st.registry,
                dirty: &st.dirty,
                mounted: st.mounted,
                baseline: st.baseline.as_ref(),
            },
        );
        self.inner.snapshot_tx.send_replace(st.snapshot.clone());
    }

    // ------------------------------------------------------------------
    // Reading
    // ------------------------------------------------------------------

    /// The current published snapshot.
    pub fn snapshot(&self) -> FormSnapshot {
        self.inner.snapshot_tx.borrow().clone()
    }

    /// Receive every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<FormSnapshot> {
        self.inner.snapshot_tx.subscribe()
    }

    /// Receive `saved`, `autosaved` and `validationfail` notifications.
    pub fn subscribe_events(&self) -> broadcast::Receiver<FormEvent> {
        self.inner.events.subscribe()
    }

    /// Current value at `path`.
    pub fn field(&self, path: &str) -> Option<Value> {
        self.with_state(|st| path::get(&st.snapshot.data, path).cloned())
    }

    /// Visible feedback for `path`.
    pub fn feedback(&self, path: &str) -> Vec<Feedback> {
        self.with_state(|st| st.snapshot.messages.for_field(path).to_vec())
    }

    /// Validity of `path`, hidden until the field is dirty.
    pub fn field_valid(&self, path: &str) -> Option<ValidState> {
        self.with_state(|st| {
            if st.dirty.is_dirty(path) {
                st.snapshot.valid_state(path)
            } else {
                None
            }
        })
    }

    pub fn is_dirty(&self, path: &str) -> bool {
        self.with_state(|st| st.dirty.is_dirty(path))
    }

    pub fn is_staged(&self, path: &str) -> bool {
        self.with_state(|st| st.dirty.is_staged(path))
    }

    pub fn is_form_dirty(&self) -> bool {
        self.with_state(|st| st.dirty.is_form_dirty())
    }

    /// Order index of a registered field or array group.
    pub fn field_order(&self, path: &str) -> Option<usize> {
        self.with_state(|st| st.registry.order(path))
    }

    /// Whether `initialize` has already run for the value at `path`.
    pub fn is_initialized(&self, path: &str) -> bool {
        self.with_state(|st| st.transforms.is_initialized(path))
    }

    /// Deserialize the form data into a typed value.
    pub fn data_as<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.snapshot().data).map_err(|source| FormError::Shape { source })
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Start reacting to data changes. A validation requested while
    /// unmounted runs now.
    pub fn mount(&self) {
        self.with_state(|st| {
            st.mounted = true;
            self.publish(st);
            if std::mem::take(&mut st.needs_validation) {
                self.trigger_validation(st);
            }
        });
    }

    /// Reset and forget every registration.
    pub fn unmount(&self) {
        self.with_state(|st| {
            self.reset_state(st);
            st.registry.clear();
            st.transforms.clear();
            st.arrays.clear();
            st.mounted = false;
            st.needs_validation = false;
            self.publish(st);
        });
        tracing::debug!("form unmounted");
    }

    fn reset_state(&self, st: &mut ControllerState) {
        st.dirty.clear();
        st.preloaded = false;
        // bump rather than zero so responses issued before the reset stay stale
        st.submit_version += 1;
        st.validate_version += 1;
        st.baseline = None;
        st.in_flight = None;
        if let Some(timer) = st.debounce.take() {
            timer.cancel();
        }
        if let Some(timer) = st.preload_timer.take() {
            timer.cancel();
        }
        st.snapshot = FormSnapshot::with_width(self.inner.config.width);
    }

    /// Clear the form, then preload `data` if given.
    pub async fn reset(&self, data: Option<Value>) -> Result<()> {
        self.with_state(|st| {
            self.reset_state(st);
            self.publish(st);
        });
        if let Some(data) = data {
            self.preload(Some(data)).await?;
        }
        Ok(())
    }

    /// Reset with a typed value.
    pub async fn reset_with<T: Serialize>(&self, data: &T) -> Result<()> {
        let value = serde_json::to_value(data).map_err(|source| FormError::Shape { source })?;
        self.reset(Some(value)).await
    }

    /// Load data from the database/API as the "before user changes" state.
    ///
    /// Field initializers run over the data, the result becomes the
    /// baseline for unsaved-changes detection, and (when data was given) the
    /// form is marked dirty once late-registering fields had time to mount.
    pub async fn preload(&self, data: Option<Value>) -> Result<()> {
        let pending = self.with_state(|st| {
            if data.as_ref() == Some(&st.snapshot.data) {
                return None;
            }
            st.preloaded = true;
            Some(st.transforms.begin_initialize_all())
        });
        let Some(pending) = pending else {
            tracing::debug!("preload skipped, data unchanged");
            return Ok(());
        };
        let has_data = data.is_some();
        let initialized =
            run_initializers(data.unwrap_or_else(|| Value::Object(Map::new())), pending).await?;
        self.with_state(|st| st.baseline = Some(initialized.clone()));
        self.set_data_with(
            initialized,
            SetDataOptions {
                skip_initialize: true,
                skip_dirty_form: !has_data,
            },
        )
        .await?;
        if has_data {
            self.schedule_preload_settle();
        }
        tracing::debug!(has_data, "form preloaded");
        Ok(())
    }

    fn schedule_preload_settle(&self) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("no tokio runtime, skipping post-preload dirty pass");
            return;
        };
        self.with_state(|st| {
            if let Some(timer) = st.preload_timer.take() {
                timer.cancel();
            }
            let id = st.next_timer_id();
            let store = self.clone();
            let delay = self.inner.config.preload_settle();
            let handle = runtime.spawn(async move {
                tokio::time::sleep(delay).await;
                store.with_state(|st| {
                    if !Timer::claim(&mut st.preload_timer, id) {
                        return;
                    }
                    let autosave = store.inner.config.autosave;
                    st.dirty
                        .mark_form_for(&st.registry, &st.snapshot.data, autosave);
                    store.publish(st);
                });
            });
            st.preload_timer = Some(Timer { id, handle });
        });
    }

    /// Replace the whole data set.
    pub async fn set_data(&self, data: Value) -> Result<()> {
        self.set_data_with(data, SetDataOptions::default()).await
    }

    /// Replace the whole data set with explicit options.
    pub async fn set_data_with(&self, data: Value, opts: SetDataOptions) -> Result<()> {
        let pending = self.with_state(|st| {
            st.preloaded = true;
            (!opts.skip_initialize).then(|| st.transforms.begin_initialize_all())
        });
        let data = match pending {
            Some(pending) => run_initializers(data, pending).await?,
            None => data,
        };
        self.with_state(|st| {
            if !opts.skip_dirty_form {
                st.dirty
                    .mark_form_for(&st.registry, &data, self.inner.config.autosave);
            }
            st.snapshot.data = data;
            st.snapshot.conditional_data = Map::new();
            self.publish(st);
            self.trigger_validation(st);
        });
        Ok(())
    }

    // ------------------------------------------------------------------
    // Messages and dirtiness
    // ------------------------------------------------------------------

    /// Replace the feedback list, e.g. with results validated elsewhere.
    pub fn set_messages(&self, messages: Vec<Feedback>) {
        self.with_state(|st| {
            st.snapshot.messages.all = messages;
            self.publish(st);
        });
    }

    /// Stage `path` and every field before it for error display.
    pub fn dirty_field(&self, path: &str) {
        self.with_state(|st| {
            st.dirty.mark_through(&st.registry, path);
        });
    }

    /// Move staged paths (except `excluding`) into the dirty set.
    pub fn promote_staged(&self, excluding: Option<&str>) {
        self.with_state(|st| {
            st.dirty.promote(excluding);
            self.publish(st);
        });
    }

    /// Mark the form dirty as after a preload or submit.
    pub fn set_dirty_form(&self, data: Option<&Value>) {
        self.with_state(|st| {
            let autosave = self.inner.config.autosave;
            match data {
                Some(data) => st.dirty.mark_form_for(&st.registry, data, autosave),
                None => st.dirty.mark_form_for(&st.registry, &st.snapshot.data, autosave),
            }
            self.publish(st);
        });
    }

    /// Show errors on fields as they lose focus.
    ///
    /// While a validation is pending its completion promotes staged paths
    /// anyway, so nothing happens here.
    pub fn update_dirty_on_blur(&self) {
        self.with_state(|st| {
            if !st.snapshot.validating {
                st.dirty.promote(None);
                self.publish(st);
            }
        });
    }

    /// Set a UI-only derived value.
    pub fn set_conditional(&self, key: impl Into<String>, value: Value) {
        self.with_state(|st| {
            st.snapshot.conditional_data.insert(key.into(), value);
            self.publish(st);
        });
    }

    pub fn set_width(&self, width: u32) {
        self.with_state(|st| {
            st.snapshot.width = width;
            self.publish(st);
        });
    }
}
