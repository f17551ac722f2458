//! Alertmanager webhook dispatcher.
//!
//! Every request ends in exactly one `{ret, msg}` body with HTTP 200, so
//! Alertmanager never retries on a relay-side rejection. Steps run in order
//! and stop at the first failure:
//!
//! 1. Parse the body as an [`AlertMessage`]
//! 2. Look up the receiver named in the query and compare its token
//! 3. Resolve the receiver's mentions to open IDs
//! 4. Send the enriched message to the receiver's bot

use std::collections::BTreeMap;

use alertrelay_core::{AlertMessage, WebhookMessage};
use axum::extract::{
    rejection::{BytesRejection, QueryRejection},
    Query, State,
};
use bytes::Bytes;
use tracing::{debug, info, instrument, warn};

use crate::{
    error::{DispatchError, RelayResponse},
    AppState,
};

/// Query parameters of `POST /webhook`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WebhookParams {
    /// Token the caller claims for the receiver
    pub access_token: String,
    /// Receiver name
    pub receiver: String,
}

impl WebhookParams {
    /// Picks the parameters out of decoded query pairs.
    ///
    /// A repeated key keeps its first value; unknown keys are ignored.
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut access_token = None;
        let mut receiver = None;

        for (key, value) in pairs {
            match key.as_str() {
                "access_token" => {
                    access_token.get_or_insert(value);
                },
                "receiver" => {
                    receiver.get_or_insert(value);
                },
                _ => {},
            }
        }

        Self {
            access_token: access_token.unwrap_or_default(),
            receiver: receiver.unwrap_or_default(),
        }
    }
}

/// `POST /webhook?access_token=..&receiver=..`
///
/// Extraction failures are folded into the dispatcher outcome: an
/// unreadable query behaves like missing parameters and an unreadable body
/// like an invalid payload.
#[instrument(name = "receive_alert", skip_all)]
pub async fn receive_alert(
    State(state): State<AppState>,
    params: Result<Query<Vec<(String, String)>>, QueryRejection>,
    body: Result<Bytes, BytesRejection>,
) -> RelayResponse {
    let params = match params {
        Ok(Query(pairs)) => WebhookParams::from_pairs(pairs),
        Err(rejection) => {
            warn!(error = %rejection, "Unreadable webhook query string");
            WebhookParams::default()
        },
    };

    let body = match body {
        Ok(body) => body,
        Err(rejection) => {
            warn!(error = %rejection, "Unreadable webhook body");
            Bytes::new()
        },
    };

    match dispatch(&state, &params, &body).await {
        Ok(()) => RelayResponse::ok(),
        Err(error) => {
            warn!(
                receiver = %params.receiver,
                kind = error.kind(),
                error = %error,
                "Webhook not relayed"
            );
            RelayResponse::from(&error)
        },
    }
}

/// Authenticates, enriches and forwards one Alertmanager payload.
///
/// App credentials and the receiver entry come from a single registry
/// snapshot, so a concurrent reload never mixes two configurations.
///
/// # Errors
///
/// Returns the [`DispatchError`] for the first failed step.
#[instrument(
    name = "dispatch",
    skip(state, params, body),
    fields(receiver = %params.receiver, body_len = body.len())
)]
pub async fn dispatch(
    state: &AppState,
    params: &WebhookParams,
    body: &[u8],
) -> Result<(), DispatchError> {
    let alert_message = AlertMessage::from_slice(body).map_err(DispatchError::InvalidData)?;

    let snapshot = state.registry.snapshot();
    let receiver = snapshot.receiver(&params.receiver)?;

    if params.access_token != receiver.access_token {
        return Err(DispatchError::InvalidAccessToken {
            receiver: params.receiver.clone(),
            token: params.access_token.clone(),
        });
    }

    let mentions = receiver.mentions();
    let tenant_token =
        state.identity.acquire_tenant_token(&snapshot.app_id, &snapshot.app_secret).await;

    let open_ids = if tenant_token.is_empty() {
        debug!("No tenant token, sending without mentions");
        Vec::new()
    } else {
        state.identity.resolve_user_ids(&tenant_token, &mentions.mobiles, &mentions.emails).await
    };

    let message = WebhookMessage::new(alert_message)
        .with_open_ids(open_ids)
        .with_alert_hosts(BTreeMap::new());

    state.bot.send(&receiver.fsurl, &message).await.map_err(DispatchError::Send)?;

    info!(
        alerts = message.alert_message.alerts.len(),
        mentions = message.open_ids.len(),
        "Alert relayed"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect()
    }

    #[test]
    fn first_value_wins_for_repeated_keys() {
        let params = WebhookParams::from_pairs(pairs(&[
            ("receiver", "ops"),
            ("access_token", "s3cret"),
            ("receiver", "other"),
            ("access_token", "later"),
        ]));

        assert_eq!(params.receiver, "ops");
        assert_eq!(params.access_token, "s3cret");
    }

    #[test]
    fn missing_and_unknown_keys() {
        let params = WebhookParams::from_pairs(pairs(&[("foo", "bar")]));
        assert_eq!(params, WebhookParams::default());
    }
}
