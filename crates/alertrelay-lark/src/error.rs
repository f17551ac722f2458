//! Error types for calls to the Lark open platform.
//!
//! Identity lookups swallow these after logging; bot delivery surfaces them
//! to the dispatcher, which embeds the display text in its response.

use thiserror::Error;

/// Result type alias for Lark operations.
pub type Result<T> = std::result::Result<T, LarkError>;

/// Failure talking to a Lark endpoint.
#[derive(Debug, Clone, Error)]
pub enum LarkError {
    /// Connection could not be established or was dropped.
    #[error("network error: {message}")]
    Network {
        /// Transport error text
        message: String,
    },

    /// The request did not complete within the configured timeout.
    #[error("request timeout after {timeout_seconds}s")]
    Timeout {
        /// Configured timeout
        timeout_seconds: u64,
    },

    /// The endpoint answered with a non-success HTTP status.
    #[error("HTTP {status_code}: {body}")]
    HttpStatus {
        /// Response status
        status_code: u16,
        /// Response body (truncated)
        body: String,
    },

    /// The response body did not have the expected shape.
    #[error("failed to decode response: {message}")]
    Decode {
        /// What could not be decoded
        message: String,
    },

    /// The endpoint reported an application-level failure.
    #[error("lark api error {code}: {msg}")]
    Api {
        /// Lark error code
        code: i64,
        /// Lark error message
        msg: String,
    },

    /// The HTTP client could not be built.
    #[error("invalid client configuration: {message}")]
    Configuration {
        /// Builder error text
        message: String,
    },
}

impl LarkError {
    /// Creates a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network { message: message.into() }
    }

    /// Creates a timeout error.
    pub fn timeout(timeout_seconds: u64) -> Self {
        Self::Timeout { timeout_seconds }
    }

    /// Creates an HTTP status error, truncating long bodies.
    pub fn http_status(status_code: u16, body: impl Into<String>) -> Self {
        const MAX_BODY: usize = 512;
        let mut body = body.into();
        if body.len() > MAX_BODY {
            let mut cut = MAX_BODY;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            body.truncate(cut);
            body.push_str("... (truncated)");
        }
        Self::HttpStatus { status_code, body }
    }

    /// Creates a decode error.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode { message: message.into() }
    }

    /// Creates an application-level error.
    pub fn api(code: i64, msg: impl Into<String>) -> Self {
        Self::Api { code, msg: msg.into() }
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration { message: message.into() }
    }

    /// Classifies a transport error from `reqwest`.
    pub fn from_transport(error: &reqwest::Error, timeout_seconds: u64) -> Self {
        if error.is_timeout() {
            Self::timeout(timeout_seconds)
        } else if error.is_connect() {
            Self::network(format!("connection failed: {error}"))
        } else if error.is_decode() {
            Self::decode(error.to_string())
        } else {
            Self::network(error.to_string())
        }
    }
}
