//! HTTP request handlers.

pub mod health;
pub mod reload;
pub mod webhook;

pub use health::health_check;
pub use reload::{reload_config, reload_registry};
pub use webhook::{dispatch, receive_alert, WebhookParams};
