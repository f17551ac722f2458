//! Mention resolution against the Lark contact API.
//!
//! Resolving a mention takes two calls: the app credentials are exchanged
//! for a tenant access token, and the token authorises a batch lookup that
//! maps mobile numbers and emails to user IDs. Both steps are best-effort.
//! [`IdentityResolver::acquire_tenant_token`] returns an empty token and
//! [`IdentityResolver::resolve_user_ids`] an empty list on any failure, after
//! logging the cause, so a lookup problem never blocks alert delivery.
//!
//! Tokens are fetched per request and not cached.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::{
    client::{join_url, ClientConfig, DEFAULT_OPEN_API_BASE_URL},
    error::{LarkError, Result},
};

/// Path of the internal-app tenant token endpoint.
pub const TENANT_TOKEN_PATH: &str = "/auth/v3/tenant_access_token/internal";

/// Path of the batch user ID lookup endpoint.
pub const BATCH_GET_ID_PATH: &str = "/contact/v3/users/batch_get_id";

/// Short-lived bearer credential for the Lark open platform.
///
/// An empty token means acquisition failed.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct TenantToken(String);

impl TenantToken {
    /// Wraps a raw token string.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The failure sentinel.
    pub fn empty() -> Self {
        Self::default()
    }

    /// `true` for the failure sentinel.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Raw token value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for TenantToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            f.write_str("TenantToken(<empty>)")
        } else {
            f.write_str("TenantToken(***)")
        }
    }
}

#[derive(Debug, Serialize)]
struct TenantTokenRequest<'a> {
    app_id: &'a str,
    app_secret: &'a str,
}

#[derive(Debug, Deserialize)]
struct TenantTokenResponse {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    msg: String,
    tenant_access_token: Option<String>,
    #[serde(default)]
    expire: u64,
}

#[derive(Debug, Serialize)]
struct BatchGetIdRequest<'a> {
    mobiles: &'a [String],
    emails: &'a [String],
}

#[derive(Debug, Deserialize)]
struct BatchGetIdResponse {
    code: i64,
    #[serde(default)]
    msg: String,
    #[serde(default)]
    data: BatchGetIdData,
}

#[derive(Debug, Default, Deserialize)]
struct BatchGetIdData {
    #[serde(default)]
    user_list: Vec<UserIdEntry>,
}

#[derive(Debug, Deserialize)]
struct UserIdEntry {
    #[serde(default)]
    mobile: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    user_id: Option<String>,
}

/// Client for the tenant token and batch user ID endpoints.
#[derive(Debug, Clone)]
pub struct IdentityResolver {
    client: reqwest::Client,
    config: ClientConfig,
    base_url: String,
}

impl IdentityResolver {
    /// Creates a resolver talking to `base_url` (e.g.
    /// [`DEFAULT_OPEN_API_BASE_URL`]).
    ///
    /// # Errors
    ///
    /// Returns [`LarkError::Configuration`] if the HTTP client cannot be
    /// built.
    pub fn new(base_url: impl Into<String>, config: ClientConfig) -> Result<Self> {
        let client = config.build()?;
        Ok(Self { client, config, base_url: base_url.into() })
    }

    /// Creates a resolver for the public Lark API with default settings.
    pub fn with_defaults() -> Result<Self> {
        Self::new(DEFAULT_OPEN_API_BASE_URL, ClientConfig::default())
    }

    /// Exchanges app credentials for a tenant access token.
    ///
    /// Never fails: any error is logged and the empty token returned.
    #[instrument(name = "acquire_tenant_token", skip(self, app_secret))]
    pub async fn acquire_tenant_token(&self, app_id: &str, app_secret: &str) -> TenantToken {
        match self.try_acquire_tenant_token(app_id, app_secret).await {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Failed to get tenant_access_token");
                TenantToken::empty()
            },
        }
    }

    /// Exchanges app credentials for a tenant access token, reporting
    /// failures.
    ///
    /// # Errors
    ///
    /// Returns a transport, status or decode error; a response without a
    /// non-empty `tenant_access_token` is a decode error.
    pub async fn try_acquire_tenant_token(
        &self,
        app_id: &str,
        app_secret: &str,
    ) -> Result<TenantToken> {
        let url = join_url(&self.base_url, TENANT_TOKEN_PATH);
        let response = self
            .client
            .post(&url)
            .json(&TenantTokenRequest { app_id, app_secret })
            .send()
            .await
            .map_err(|e| LarkError::from_transport(&e, self.config.timeout.as_secs()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| LarkError::from_transport(&e, self.config.timeout.as_secs()))?;

        if !status.is_success() {
            return Err(LarkError::http_status(
                status.as_u16(),
                String::from_utf8_lossy(&body).into_owned(),
            ));
        }

        let decoded: TenantTokenResponse = serde_json::from_slice(&body)
            .map_err(|e| LarkError::decode(format!("tenant token body: {e}")))?;

        match decoded.tenant_access_token {
            Some(token) if !token.is_empty() => {
                debug!(expire = decoded.expire, "Tenant access token acquired");
                Ok(TenantToken::new(token))
            },
            _ => Err(LarkError::decode(format!(
                "response has no tenant_access_token (code {}: {})",
                decoded.code, decoded.msg
            ))),
        }
    }

    /// Resolves mobiles and emails to user IDs.
    ///
    /// Returns the IDs in the order the service lists them, skipping entries
    /// it could not resolve. Both lists empty means no call is made. Never
    /// fails: any error is logged and an empty list returned.
    #[instrument(
        name = "resolve_user_ids",
        skip(self, token, mobiles, emails),
        fields(mobiles = mobiles.len(), emails = emails.len())
    )]
    pub async fn resolve_user_ids(
        &self,
        token: &TenantToken,
        mobiles: &[String],
        emails: &[String],
    ) -> Vec<String> {
        match self.try_resolve_user_ids(token, mobiles, emails).await {
            Ok(ids) => ids,
            Err(e) => {
                warn!(error = %e, "Failed to request batch_get_id");
                Vec::new()
            },
        }
    }

    /// Resolves mobiles and emails to user IDs, reporting failures.
    ///
    /// # Errors
    ///
    /// Returns a transport or decode error, or [`LarkError::Api`] when the
    /// service does not answer with code `0` and message `success`.
    pub async fn try_resolve_user_ids(
        &self,
        token: &TenantToken,
        mobiles: &[String],
        emails: &[String],
    ) -> Result<Vec<String>> {
        if mobiles.is_empty() && emails.is_empty() {
            return Ok(Vec::new());
        }

        let url = join_url(&self.base_url, BATCH_GET_ID_PATH);
        let response = self
            .client
            .post(&url)
            .bearer_auth(token.as_str())
            .json(&BatchGetIdRequest { mobiles, emails })
            .send()
            .await
            .map_err(|e| LarkError::from_transport(&e, self.config.timeout.as_secs()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| LarkError::from_transport(&e, self.config.timeout.as_secs()))?;

        let decoded: BatchGetIdResponse = match serde_json::from_slice(&body) {
            Ok(decoded) => decoded,
            Err(_) if !status.is_success() => {
                return Err(LarkError::http_status(
                    status.as_u16(),
                    String::from_utf8_lossy(&body).into_owned(),
                ));
            },
            Err(e) => return Err(LarkError::decode(format!("batch_get_id body: {e}"))),
        };

        if decoded.code != 0 || decoded.msg != "success" {
            return Err(LarkError::api(decoded.code, decoded.msg));
        }

        let ids = decoded
            .data
            .user_list
            .into_iter()
            .filter_map(|entry| match entry.user_id {
                Some(id) if !id.is_empty() => Some(id),
                _ => {
                    debug!(
                        mobile = entry.mobile.as_deref().unwrap_or_default(),
                        email = entry.email.as_deref().unwrap_or_default(),
                        "Mention target not resolved"
                    );
                    None
                },
            })
            .collect();

        Ok(ids)
    }
}
