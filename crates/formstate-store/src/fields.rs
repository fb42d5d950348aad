//! Field and array-group operations.

use formstate_model::path;
use serde_json::Value;

use crate::array::{self, ArraySpec};
use crate::error::{FormError, Result};
use crate::registry::{LayoutMarker, LayoutSource};
use crate::store::FormStore;
use crate::transform::{FinalizeFn, InitializeFn};

/// Registration parameters for a scalar field.
#[derive(Clone, Default)]
pub struct FieldBinding {
    /// Seeded into an unset path on a form that was never preloaded.
    pub initial: Option<Value>,
    pub initialize: Option<InitializeFn>,
    pub finalize: Option<FinalizeFn>,
}

impl FieldBinding {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn initial(mut self, value: Value) -> Self {
        self.initial = Some(value);
        self
    }

    #[must_use]
    pub fn initialize(mut self, f: InitializeFn) -> Self {
        self.initialize = Some(f);
        self
    }

    #[must_use]
    pub fn finalize(mut self, f: FinalizeFn) -> Self {
        self.finalize = Some(f);
        self
    }
}

impl std::fmt::Debug for FieldBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldBinding")
            .field("initial", &self.initial)
            .field("initialize", &self.initialize.is_some())
            .field("finalize", &self.finalize.is_some())
            .finish()
    }
}

/// Options for [`FormStore::set_field_with`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetFieldOptions {
    /// Run the field's initializer first, unless it already ran.
    pub initialize: bool,
    /// Change the value without staging the field for error display.
    pub not_dirty: bool,
}

impl FormStore {
    /// Set one value. Returns whether the data changed.
    pub async fn set_field(&self, path: &str, value: Value) -> Result<bool> {
        self.set_field_with(path, value, SetFieldOptions::default()).await
    }

    pub async fn set_field_with(
        &self,
        path: &str,
        value: Value,
        opts: SetFieldOptions,
    ) -> Result<bool> {
        let initialize = if opts.initialize {
            self.with_state(|st| {
                if st.transforms.is_initialized(path) {
                    return None;
                }
                let f = st.transforms.initializer(path)?;
                st.transforms.mark_initialized(path);
                Some(f)
            })
        } else {
            None
        };
        let value = match initialize {
            Some(f) => f(value).await.map_err(|source| FormError::Initialize {
                path: path.to_string(),
                source,
            })?,
            None => value,
        };

        Ok(self.with_state(|st| {
            if path::get(&st.snapshot.data, path) == Some(&value) {
                return false;
            }
            let Some(data) = path::try_set(&st.snapshot.data, path, value) else {
                tracing::warn!(path, "index out of range, value not set");
                return false;
            };
            st.snapshot.data = data;
            if !opts.not_dirty {
                st.dirty.mark_through(&st.registry, path);
            }
            self.trigger_validation(st);
            // unmounted forms skip the publish inside trigger_validation
            if !st.mounted {
                self.publish(st);
            }
            true
        }))
    }

    /// Append `element` to the array at `array_path`.
    pub fn push(&self, array_path: &str, element: Value) {
        self.with_state(|st| {
            let mut items = array::items_at(&st.snapshot.data, array_path);
            items.push(element);
            st.snapshot.data = path::set(&st.snapshot.data, array_path, Value::Array(items));
            self.publish(st);
            self.trigger_validation(st);
        });
    }

    /// Append a new entry built from the group's registered template.
    pub fn push_new(&self, array_path: &str) -> bool {
        let element = self.with_state(|st| {
            let spec = st.arrays.get(array_path)?;
            let idx = array::items_at(&st.snapshot.data, array_path).len();
            Some(spec.element.build(idx))
        });
        match element {
            Some(element) => {
                self.push(array_path, element);
                true
            }
            None => {
                tracing::debug!(path = array_path, "push_new on unregistered array");
                false
            }
        }
    }

    /// Remove entry `idx`. Removing below the group's minimum length is
    /// refused. Returns whether an entry was removed.
    pub fn delete_from_array(&self, array_path: &str, idx: usize) -> bool {
        self.with_state(|st| {
            let mut items = array::items_at(&st.snapshot.data, array_path);
            let min_length = st.arrays.get(array_path).map_or(0, |spec| spec.min_length);
            if idx >= items.len() || items.len() <= min_length {
                tracing::debug!(path = array_path, idx, len = items.len(), "delete refused");
                return false;
            }
            items.remove(idx);
            st.snapshot.data = path::set(&st.snapshot.data, array_path, Value::Array(items));
            self.publish(st);
            self.trigger_validation(st);
            true
        })
    }

    /// Swap entry `idx` with the one before it.
    pub fn move_up(&self, array_path: &str, idx: usize) -> bool {
        self.with_state(|st| {
            let mut items = array::items_at(&st.snapshot.data, array_path);
            if idx == 0 || idx >= items.len() {
                return false;
            }
            items.swap(idx - 1, idx);
            st.snapshot.data = path::set(&st.snapshot.data, array_path, Value::Array(items));
            self.publish(st);
            self.trigger_validation(st);
            true
        })
    }

    /// Register a scalar field at the next order index.
    ///
    /// A fresh form seeds `initial` into an unset path. A field joining an
    /// already-loaded form has its current value initialized.
    pub async fn register_field(&self, path: &str, binding: FieldBinding) -> Result<()> {
        let FieldBinding {
            initial,
            initialize,
            finalize,
        } = binding;
        let (seed, late_initialize) = self.with_state(|st| {
            let order = st.registry.register_field(path);
            tracing::debug!(path, order, "registered field");
            st.transforms.bind(path, initialize.clone(), finalize);
            self.publish(st);
            match initial {
                Some(initial)
                    if !initial.is_null()
                        && !st.preloaded
                        && path::is_unset(&st.snapshot.data, path) =>
                {
                    (Some(initial), false)
                }
                _ => (
                    None,
                    st.preloaded && initialize.is_some() && !st.transforms.is_initialized(path),
                ),
            }
        });

        if let Some(initial) = seed {
            let value = match &initialize {
                Some(f) => f(initial).await.map_err(|source| FormError::Initialize {
                    path: path.to_string(),
                    source,
                })?,
                None => initial,
            };
            self.with_state(|st| {
                // a preload may have landed while the initializer ran
                if value.is_null() || st.preloaded || !path::is_unset(&st.snapshot.data, path) {
                    return;
                }
                st.transforms.mark_initialized(path);
                st.snapshot.data = path::set(&st.snapshot.data, path, value);
                self.publish(st);
            });
        } else if late_initialize {
            let current = self.field(path).unwrap_or(Value::Null);
            self.set_field_with(
                path,
                current,
                SetFieldOptions {
                    initialize: true,
                    not_dirty: true,
                },
            )
            .await?;
        }
        Ok(())
    }

    /// Forget a field. Later fields shift down one index.
    pub fn unregister_field(&self, path: &str) {
        self.with_state(|st| {
            if st.registry.unregister_field(path).is_none() {
                return;
            }
            st.dirty.forget(path);
            st.transforms.unbind(path);
            self.publish(st);
        });
    }

    /// Register an array group and pad it to its minimum length.
    pub fn register_array(&self, array_path: &str, spec: ArraySpec) {
        self.with_state(|st| {
            let order = st.registry.register_array(array_path);
            let min_length = spec.resolved_min_length(st.preloaded);
            tracing::debug!(path = array_path, order, min_length, "registered array");
            st.snapshot.data = array::pad(&st.snapshot.data, array_path, min_length, &spec.element);
            st.arrays.insert(array_path.to_string(), spec);
            self.publish(st);
        });
    }

    /// Forget an array group. Later fields shift down one index.
    pub fn unregister_array(&self, array_path: &str) {
        self.with_state(|st| {
            if st.registry.unregister_array(array_path).is_none() {
                return;
            }
            st.arrays.remove(array_path);
            st.dirty.forget(array_path);
            self.publish(st);
        });
    }

    /// Re-derive order indices from the rendered layout.
    ///
    /// Every path at or before the furthest dirty or staged position, in the
    /// old layout or the new one, is staged; the staged set is promoted
    /// unless a validation is pending.
    pub fn reorder(&self, layout: impl IntoIterator<Item = LayoutMarker>) {
        self.with_state(|st| {
            let previous = st.registry.rebuild(layout);
            let old_max = st.dirty.max_order(&previous);
            let new_max = st.dirty.max_order(&st.registry);
            let reached: Vec<String> = st
                .registry
                .entries()
                .filter(|(path, idx, _)| {
                    new_max.is_some_and(|max| *idx <= max)
                        || old_max
                            .zip(previous.order(path))
                            .is_some_and(|(max, old)| old <= max)
                })
                .map(|(path, _, _)| path.to_string())
                .collect();
            tracing::debug!(
                fields = st.registry.len(),
                staged = reached.len(),
                "layout reordered"
            );
            for path in reached {
                st.dirty.stage(path);
            }
            if !st.snapshot.validating {
                st.dirty.promote(None);
            }
            self.publish(st);
        });
    }

    /// [`FormStore::reorder`] from a layout source.
    pub fn reorder_from(&self, source: &dyn LayoutSource) {
        self.reorder(source.discover());
    }
}
