//! Controller configuration.

use std::time::Duration;

use formstate_model::snapshot::DEFAULT_WIDTH;
use serde::{Deserialize, Serialize};

/// Configuration for a form controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormConfig {
    /// Whether data changes submit instead of validating.
    pub autosave: bool,

    /// Debounce delay in milliseconds.
    ///
    /// After a change, the controller waits this long before validating (or
    /// autosaving). Additional changes reset the timer.
    pub debounce_ms: u64,

    /// Delay after a preload before the dirty-form pass is repeated.
    ///
    /// Fields that mount after the data arrives are only known to the
    /// registry once this has elapsed.
    pub preload_settle_ms: u64,

    /// Buffer size of the notification channel.
    pub event_capacity: usize,

    /// Initial layout width hint.
    pub width: u32,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            autosave: false,
            debounce_ms: 300,
            preload_settle_ms: 10,
            event_capacity: 64,
            width: DEFAULT_WIDTH,
        }
    }
}

impl FormConfig {
    /// Config for an autosaving form.
    pub fn autosave() -> Self {
        Self {
            autosave: true,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_autosave(mut self, enable: bool) -> Self {
        self.autosave = enable;
        self
    }

    #[must_use]
    pub fn with_debounce_ms(mut self, ms: u64) -> Self {
        self.debounce_ms = ms;
        self
    }

    #[must_use]
    pub fn with_preload_settle_ms(mut self, ms: u64) -> Self {
        self.preload_settle_ms = ms;
        self
    }

    #[must_use]
    pub fn with_width(mut self, width: u32) -> Self {
        self.width = width;
        self
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn preload_settle(&self) -> Duration {
        Duration::from_millis(self.preload_settle_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = FormConfig::default();
        assert!(!config.autosave);
        assert_eq!(config.debounce(), Duration::from_millis(300));
        assert_eq!(config.preload_settle(), Duration::from_millis(10));
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: FormConfig = serde_json::from_str(r#"{ "autosave": true }"#).unwrap();
        assert_eq!(config, FormConfig::autosave());
    }
}
