//! Hot-reloadable receiver registry.
//!
//! The registry owns the active [`Configuration`] behind an [`ArcSwap`].
//! Readers load the current snapshot without blocking; a reload parses a
//! complete new configuration first and then replaces the pointer in one
//! atomic store. A reader holding an older snapshot keeps it alive until it
//! drops the `Arc`, so a lookup never observes fields from two different
//! loads.

use std::{path::Path, sync::Arc};

use arc_swap::ArcSwap;
use tracing::{debug, info};

use crate::{
    config::{Configuration, ReceiverConfig},
    error::{ConfigError, RegistryError},
};

/// Concurrency-safe store of named receivers.
#[derive(Debug)]
pub struct ReceiverRegistry {
    current: ArcSwap<Configuration>,
}

impl ReceiverRegistry {
    /// Creates a registry serving `config`.
    pub fn new(config: Configuration) -> Self {
        Self { current: ArcSwap::from_pointee(config) }
    }

    /// Creates a registry from a configuration file.
    ///
    /// # Errors
    ///
    /// Returns the [`ConfigError`] produced while reading or parsing `path`.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config = Configuration::from_file(path)?;
        Ok(Self::new(config))
    }

    /// Re-reads `path` and swaps the parsed configuration in.
    ///
    /// On failure the previously active configuration stays in effect.
    ///
    /// # Errors
    ///
    /// Returns the [`ConfigError`] produced while reading or parsing `path`.
    pub fn reload(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let config = Configuration::from_file(path)?;
        info!(
            path = %path.display(),
            receivers = config.receivers.len(),
            "Receiver configuration reloaded"
        );
        self.replace(config);
        Ok(())
    }

    /// Replaces the active configuration wholesale.
    pub fn replace(&self, config: Configuration) {
        self.current.store(Arc::new(config));
    }

    /// Returns the active configuration snapshot.
    pub fn snapshot(&self) -> Arc<Configuration> {
        self.current.load_full()
    }

    /// Returns a copy of the named receiver's configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::ReceiverNotFound`] when `name` is not
    /// configured.
    pub fn lookup_receiver(&self, name: &str) -> Result<ReceiverConfig, RegistryError> {
        let result = self.current.load().receiver(name);
        if result.is_err() {
            debug!(receiver = name, "Receiver lookup missed");
        }
        result
    }

    /// Number of receivers in the active configuration.
    pub fn receiver_count(&self) -> usize {
        self.current.load().receivers.len()
    }
}

impl Default for ReceiverRegistry {
    fn default() -> Self {
        Self::new(Configuration::default())
    }
}
