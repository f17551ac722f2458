//! HTTP server configuration and request routing.
//!
//! Requests flow through middleware in order:
//! 1. Request ID generation
//! 2. Request/response logging
//! 3. Timeout enforcement, answered with a `{ret, msg}` failure body
//! 4. Handler execution
//!
//! `/webhook` accepts bodies of any size; Alertmanager groups can carry
//! thousands of alerts.
//!
//! # Graceful Shutdown
//!
//! The server stops on CTRL+C or SIGTERM:
//! - Stops accepting new connections
//! - Waits for in-flight requests to finish

use std::{net::SocketAddr, time::Duration};

use axum::{
    error_handling::HandleErrorLayer,
    extract::{DefaultBodyLimit, Request},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    BoxError, Router,
};
use tokio::net::TcpListener;
use tower::{
    timeout::{error::Elapsed, TimeoutLayer},
    ServiceBuilder,
};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{error::RelayResponse, handlers, AppState};

/// Creates the Axum router with all routes and middleware.
///
/// ```no_run
/// use std::{sync::Arc, time::Duration};
///
/// use alertrelay_api::{create_router, AppState};
/// use alertrelay_core::ReceiverRegistry;
/// use alertrelay_lark::{BotClient, IdentityResolver};
///
/// fn build() -> Result<axum::Router, Box<dyn std::error::Error>> {
///     let state = AppState::new(
///         Arc::new(ReceiverRegistry::default()),
///         IdentityResolver::with_defaults()?,
///         BotClient::with_defaults()?,
///     );
///     Ok(create_router(state, Duration::from_secs(60)))
/// }
/// ```
pub fn create_router(state: AppState, request_timeout: Duration) -> Router {
    let admin_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/-/reload", post(handlers::reload_config));

    let relay_routes = Router::new()
        .route("/webhook", post(handlers::receive_alert))
        .layer(DefaultBodyLimit::disable());

    Router::new()
        .merge(admin_routes)
        .merge(relay_routes)
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_middleware_error))
                .layer(TimeoutLayer::new(request_timeout)),
        )
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(inject_request_id))
        .with_state(state)
}

/// Turns middleware failures into the uniform HTTP 200 failure body.
async fn handle_middleware_error(error: BoxError) -> RelayResponse {
    if error.is::<Elapsed>() {
        warn!("Request timed out");
        RelayResponse::failure("unknown error request timed out")
    } else {
        warn!(error = %error, "Request failed in middleware");
        RelayResponse::failure(format!("unknown error {error}"))
    }
}

/// Middleware to inject request ID into all responses.
///
/// Adds X-Request-Id header for tracing requests across services.
async fn inject_request_id(mut req: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    req.extensions_mut().insert(request_id.clone());

    let mut response = next.run(req).await;

    if let Ok(header_value) = request_id.parse() {
        response.headers_mut().insert("X-Request-Id", header_value);
    }

    response
}

/// Serves `router` on an already bound listener until shutdown.
///
/// # Errors
///
/// Returns `std::io::Error` if the listener fails.
pub async fn serve(listener: TcpListener, router: Router) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    info!(%addr, "HTTP server listening");

    axum::serve(listener, router).with_graceful_shutdown(shutdown_signal()).await?;

    info!("HTTP server stopped gracefully");
    Ok(())
}

/// Binds `addr` and serves the relay until shutdown.
///
/// # Errors
///
/// Returns `std::io::Error` if the port is in use or the listener fails.
pub async fn start_server(
    state: AppState,
    addr: SocketAddr,
    request_timeout: Duration,
) -> Result<(), std::io::Error> {
    let router = create_router(state, request_timeout);

    info!(%addr, "Starting HTTP server");
    let listener = TcpListener::bind(addr).await?;

    serve(listener, router).await
}

/// Waits for shutdown signal (CTRL+C or SIGTERM).
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received CTRL+C, starting graceful shutdown");
        },
        () = terminate => {
            info!("Received SIGTERM, starting graceful shutdown");
        },
    }

    warn!("Waiting for in-flight requests to complete");
}
