//! Configuration for the storage engine.

use std::env;
use std::time::Duration;

/// Environment variable overriding [`StoreConfig::save_debounce`] (milliseconds).
pub const SAVE_DEBOUNCE_ENV: &str = "KUTILITY_SAVE_DEBOUNCE_MS";
/// Environment variable overriding [`StoreConfig::pretty_print`] (`true`/`false`).
pub const PRETTY_JSON_ENV: &str = "KUTILITY_PRETTY_JSON";

/// Tunables of a [`LocalStore`](crate::LocalStore).
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Delay before a background save starts. A write arriving during the
    /// delay cancels the scheduled save and starts a new delay.
    pub save_debounce: Duration,

    /// Write the store file as indented JSON.
    pub pretty_print: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            save_debounce: Duration::from_millis(100),
            pretty_print: true,
        }
    }
}

impl StoreConfig {
    /// Builds a configuration from the defaults, overridden by environment variables.
    ///
    /// Unparsable values are ignored with a warning.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(raw) = env::var(SAVE_DEBOUNCE_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(ms) => config.save_debounce = Duration::from_millis(ms),
                Err(e) => log::warn!("Ignoring {}={:?}: {}", SAVE_DEBOUNCE_ENV, raw, e),
            }
        }

        if let Ok(raw) = env::var(PRETTY_JSON_ENV) {
            match raw.trim().parse::<bool>() {
                Ok(pretty) => config.pretty_print = pretty,
                Err(e) => log::warn!("Ignoring {}={:?}: {}", PRETTY_JSON_ENV, raw, e),
            }
        }

        config
    }

    /// Returns a copy with a different debounce delay.
    pub fn with_debounce(mut self, delay: Duration) -> Self {
        self.save_debounce = delay;
        self
    }
}
