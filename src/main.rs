//! alertrelay: Alertmanager to Lark webhook relay.
//!
//! Main entry point. Loads settings and the receiver file, then serves
//! until CTRL+C or SIGTERM. SIGHUP reloads the receiver file in place.

use std::{path::PathBuf, sync::Arc};

use alertrelay_api::{start_server, AppState, Settings};
use alertrelay_core::ReceiverRegistry;
use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

/// Relays Alertmanager notifications to Lark bot webhooks.
#[derive(Debug, Parser)]
#[command(name = "alertrelay", version, about)]
struct Cli {
    /// Receiver configuration file [default: config.yml]
    #[arg(short = 'c', long = "config.file")]
    config_file: Option<PathBuf>,

    /// Address to listen on; `:port` binds every interface [default: :8086]
    #[arg(short = 'p', long = "web.listen-address")]
    listen_address: Option<String>,
}

impl Cli {
    /// Flags take precedence over the settings file and environment.
    fn apply(self, settings: &mut Settings) {
        if let Some(config_file) = self.config_file {
            settings.config_file = config_file;
        }
        if let Some(listen_address) = self.listen_address {
            settings.listen_address = listen_address;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load()?;
    cli.apply(&mut settings);
    settings.validate()?;

    init_tracing(&settings.log)?;

    info!("Starting alertrelay");

    let addr = settings.listen_addr()?;
    info!(
        config_file = %settings.config_file.display(),
        listen_address = %addr,
        open_api = %settings.open_api_base_url,
        identity_timeout_seconds = settings.identity_timeout_seconds,
        delivery_timeout_seconds = settings.delivery_timeout_seconds,
        "Settings loaded"
    );

    let registry = ReceiverRegistry::from_file(&settings.config_file).with_context(|| {
        format!("Failed to load receiver config from {}", settings.config_file.display())
    })?;
    let registry = Arc::new(registry);
    info!(receivers = registry.receiver_count(), "Receiver configuration loaded");

    let state = AppState::from_settings(&settings, registry.clone())
        .context("Failed to build Lark clients")?;

    reload_on_hangup(registry, settings.config_file.clone());

    start_server(state, addr, settings.request_timeout()).await.context("Server failed")?;

    info!("alertrelay shutdown complete");
    Ok(())
}

/// Initializes tracing; `RUST_LOG` wins over the configured filter.
fn init_tracing(fallback_filter: &str) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(fallback_filter))
        .context("Invalid log filter")?;

    let fmt_layer = fmt::layer().with_target(true).with_file(true).with_line_number(true);

    tracing_subscriber::registry().with(filter).with(fmt_layer).init();
    Ok(())
}

/// Reloads the receiver file every time the process receives SIGHUP.
#[cfg(unix)]
fn reload_on_hangup(registry: Arc<ReceiverRegistry>, path: PathBuf) {
    use tokio::signal::unix::{signal, SignalKind};

    tokio::spawn(async move {
        let mut hangup = match signal(SignalKind::hangup()) {
            Ok(hangup) => hangup,
            Err(e) => {
                error!(error = %e, "Failed to install SIGHUP handler");
                return;
            },
        };

        while hangup.recv().await.is_some() {
            info!(path = %path.display(), "Received SIGHUP, reloading receiver configuration");
            if let Err(e) =
                alertrelay_api::handlers::reload_registry(registry.clone(), path.clone()).await
            {
                error!(error = %e, "Failed to reload config, keeping previous configuration");
            }
        }
    });
}

#[cfg(not(unix))]
fn reload_on_hangup(_registry: Arc<ReceiverRegistry>, _path: PathBuf) {}
