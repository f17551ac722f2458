//! HTTP surface of alertrelay.
//!
//! Alertmanager posts to `/webhook`; the dispatcher authenticates the call
//! against the [`ReceiverRegistry`], resolves mentions through the Lark
//! identity API and forwards a rendered card to the receiver's bot.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::{path::PathBuf, sync::Arc};

use alertrelay_core::ReceiverRegistry;
use alertrelay_lark::{BotClient, IdentityResolver, LarkError};

pub mod error;
pub mod handlers;
pub mod server;
pub mod settings;

pub use error::{DispatchError, RelayResponse};
pub use server::{create_router, serve, shutdown_signal, start_server};
pub use settings::Settings;

/// Shared state handed to every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Receiver configuration, swapped atomically on reload.
    pub registry: Arc<ReceiverRegistry>,
    /// Tenant token and user lookup client.
    pub identity: IdentityResolver,
    /// Bot webhook client.
    pub bot: BotClient,
    /// File reloaded by `POST /-/reload`; `None` disables the endpoint.
    pub config_file: Option<Arc<PathBuf>>,
}

impl AppState {
    /// Creates state without a reloadable config file.
    pub fn new(registry: Arc<ReceiverRegistry>, identity: IdentityResolver, bot: BotClient) -> Self {
        Self { registry, identity, bot, config_file: None }
    }

    /// Builds clients from `settings` around an already loaded registry.
    ///
    /// # Errors
    ///
    /// Returns [`LarkError::Configuration`] if an HTTP client cannot be built.
    pub fn from_settings(
        settings: &Settings,
        registry: Arc<ReceiverRegistry>,
    ) -> Result<Self, LarkError> {
        let identity = IdentityResolver::new(
            settings.open_api_base_url.clone(),
            settings.identity_client_config(),
        )?;
        let bot = BotClient::new(settings.delivery_client_config())?;

        Ok(Self::new(registry, identity, bot).with_config_file(settings.config_file.clone()))
    }

    /// Sets the file used by the reload endpoint.
    #[must_use]
    pub fn with_config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = Some(Arc::new(path.into()));
        self
    }
}
