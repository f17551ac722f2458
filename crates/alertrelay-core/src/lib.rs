//! Core types for alertrelay.
//!
//! Holds the receiver configuration document, the hot-reloadable
//! [`ReceiverRegistry`] and the Alertmanager payload models shared by the
//! Lark clients and the HTTP dispatcher.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod alert;
pub mod config;
pub mod error;
pub mod registry;

pub use alert::{Alert, AlertMessage, WebhookMessage};
pub use config::{Configuration, Mentions, ReceiverConfig};
pub use error::{ConfigError, RegistryError};
pub use registry::ReceiverRegistry;
