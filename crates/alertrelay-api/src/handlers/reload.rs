//! Configuration reload endpoint.

use std::{path::PathBuf, sync::Arc};

use alertrelay_core::ReceiverRegistry;
use anyhow::Context;
use axum::extract::State;
use tracing::{error, instrument};

use crate::{error::RelayResponse, AppState};

/// Re-reads `path` into `registry` on the blocking thread pool.
///
/// A failed reload leaves the active configuration untouched.
///
/// # Errors
///
/// Returns the read or parse failure, or a join failure of the blocking task.
pub async fn reload_registry(
    registry: Arc<ReceiverRegistry>,
    path: impl Into<PathBuf>,
) -> anyhow::Result<()> {
    let path = path.into();
    tokio::task::spawn_blocking(move || registry.reload(&path))
        .await
        .context("reload task failed")??;
    Ok(())
}

/// `POST /-/reload`
#[instrument(name = "reload_config", skip(state))]
pub async fn reload_config(State(state): State<AppState>) -> RelayResponse {
    let Some(path) = state.config_file.clone() else {
        return RelayResponse::failure("failed to reload config: no config file configured");
    };

    match reload_registry(state.registry.clone(), path.as_path()).await {
        Ok(()) => RelayResponse::ok(),
        Err(e) => {
            error!(error = %e, "Failed to reload config");
            RelayResponse::failure(format!("failed to reload config: {e}"))
        },
    }
}
