//! Shared HTTP client settings for Lark calls.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{LarkError, Result};

/// Base URL of the Lark (Feishu) open platform API.
pub const DEFAULT_OPEN_API_BASE_URL: &str = "https://open.feishu.cn/open-apis";

/// Default timeout applied to every outbound call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for an outbound HTTP client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Total request timeout.
    pub timeout: Duration,
    /// User agent sent with every request.
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            user_agent: concat!("alertrelay/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ClientConfig {
    /// Default configuration with a different timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout, ..Self::default() }
    }

    /// Builds a `reqwest` client honouring this configuration.
    ///
    /// # Errors
    ///
    /// Returns [`LarkError::Configuration`] if the client cannot be built.
    pub fn build(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(&self.user_agent)
            .build()
            .map_err(|e| LarkError::configuration(format!("failed to build HTTP client: {e}")))
    }
}

/// Joins a base URL and an API path without doubling slashes.
pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_client_builds() {
        let config = ClientConfig::default();
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
        assert!(config.user_agent.starts_with("alertrelay/"));
        assert!(config.build().is_ok());
    }

    #[test]
    fn join_url_normalises_slashes() {
        assert_eq!(join_url("http://h/open-apis/", "/auth/x"), "http://h/open-apis/auth/x");
        assert_eq!(join_url("http://h/open-apis", "auth/x"), "http://h/open-apis/auth/x");
    }
}
