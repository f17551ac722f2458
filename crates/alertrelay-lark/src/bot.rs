//! Delivery to Lark custom bot webhooks.
//!
//! A bot answers HTTP 200 even for rejected messages and reports the outcome
//! in the body, either as `{"code":0,"msg":"success"}` or in the older
//! `{"StatusCode":0,"StatusMessage":"success"}` form. Both are checked.

use alertrelay_core::WebhookMessage;
use serde::Deserialize;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::{
    card,
    client::ClientConfig,
    error::{LarkError, Result},
};

#[derive(Debug, Default, Deserialize)]
struct BotResponse {
    code: Option<i64>,
    msg: Option<String>,
    #[serde(rename = "StatusCode")]
    status_code: Option<i64>,
    #[serde(rename = "StatusMessage")]
    status_message: Option<String>,
}

impl BotResponse {
    fn failure(&self) -> Option<LarkError> {
        match (self.code, self.status_code) {
            (Some(code), _) if code != 0 => {
                Some(LarkError::api(code, self.msg.clone().unwrap_or_default()))
            },
            (None, Some(code)) if code != 0 => {
                Some(LarkError::api(code, self.status_message.clone().unwrap_or_default()))
            },
            _ => None,
        }
    }
}

/// Sends rendered cards to bot webhook URLs.
#[derive(Debug, Clone)]
pub struct BotClient {
    client: reqwest::Client,
    config: ClientConfig,
}

impl BotClient {
    /// Creates a bot client.
    ///
    /// # Errors
    ///
    /// Returns [`LarkError::Configuration`] if the HTTP client cannot be
    /// built.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let client = config.build()?;
        Ok(Self { client, config })
    }

    /// Creates a bot client with default settings.
    pub fn with_defaults() -> Result<Self> {
        Self::new(ClientConfig::default())
    }

    /// Renders `message` and posts it to `url`.
    ///
    /// # Errors
    ///
    /// - `Network` / `Timeout` when the bot cannot be reached
    /// - `HttpStatus` for non-2xx responses
    /// - `Api` when the bot rejects the message
    pub async fn send(&self, url: &str, message: &WebhookMessage) -> Result<()> {
        let span = info_span!(
            "bot_delivery",
            alerts = message.alert_message.alerts.len(),
            mentions = message.open_ids.len()
        );

        async move {
            let body = card::render(message);
            let response = self
                .client
                .post(url)
                .json(&body)
                .send()
                .await
                .map_err(|e| LarkError::from_transport(&e, self.config.timeout.as_secs()))?;

            let status = response.status();
            let text = response
                .text()
                .await
                .map_err(|e| LarkError::from_transport(&e, self.config.timeout.as_secs()))?;

            if !status.is_success() {
                warn!(status = status.as_u16(), "Bot webhook returned error status");
                return Err(LarkError::http_status(status.as_u16(), text));
            }

            match serde_json::from_str::<BotResponse>(&text) {
                Ok(parsed) => {
                    if let Some(error) = parsed.failure() {
                        warn!(error = %error, "Bot webhook rejected message");
                        return Err(error);
                    }
                },
                Err(e) => debug!(error = %e, "Bot webhook response is not JSON"),
            }

            info!("Notification delivered");
            Ok(())
        }
        .instrument(span)
        .await
    }
}
