//! Error types for configuration loading and receiver lookup.
//!
//! Configuration errors are fatal at startup and logged-and-ignored on
//! reload. Lookup errors are recoverable and surface to the caller as an
//! application-level rejection.

use std::{io, path::PathBuf};

use thiserror::Error;

/// Failure to produce a complete [`Configuration`](crate::Configuration).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration source could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// Path that was being read
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: io::Error,
    },

    /// The document is not valid YAML or does not match the expected shape.
    #[error("malformed config: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// The document parsed but describes an unusable receiver.
    #[error("invalid config: {message}")]
    Invalid {
        /// What was wrong with the document
        message: String,
    },
}

impl ConfigError {
    /// Creates a read error for `path`.
    pub fn read(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Read { path: path.into(), source }
    }

    /// Creates a validation error.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid { message: message.into() }
    }
}

/// Failure to find a receiver in the active configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// No receiver with the requested name is configured.
    #[error("no credentials found for receiver {name}")]
    ReceiverNotFound {
        /// Requested receiver name
        name: String,
    },
}

impl RegistryError {
    /// Creates a not-found error for `name`.
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::ReceiverNotFound { name: name.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_names_the_receiver() {
        let error = RegistryError::not_found("ops");
        assert_eq!(error.to_string(), "no credentials found for receiver ops");
    }

    #[test]
    fn read_error_includes_path() {
        let error =
            ConfigError::read("/etc/relay.yml", io::Error::new(io::ErrorKind::NotFound, "gone"));
        let message = error.to_string();
        assert!(message.contains("/etc/relay.yml"));
        assert!(message.contains("gone"));
    }
}
