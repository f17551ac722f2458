//! Dispatcher outcomes and the uniform `{ret, msg}` response body.

use alertrelay_core::RegistryError;
use alertrelay_lark::LarkError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reasons a webhook request is not relayed.
///
/// `Display` is the exact `msg` returned to the caller.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Body is not an Alertmanager webhook payload.
    #[error("invalid data")]
    InvalidData(#[source] serde_json::Error),

    /// No receiver with the requested name.
    #[error("receiver not exists")]
    ReceiverNotFound(#[from] RegistryError),

    /// Supplied token does not match the receiver's token.
    #[error("invalid access_token({token})")]
    InvalidAccessToken {
        /// Receiver the request addressed
        receiver: String,
        /// Token supplied by the caller
        token: String,
    },

    /// Bot delivery failed.
    #[error("unknown error {0}")]
    Send(#[source] LarkError),
}

impl DispatchError {
    /// Short machine-readable kind for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidData(_) => "invalid_data",
            Self::ReceiverNotFound(_) => "receiver_not_found",
            Self::InvalidAccessToken { .. } => "invalid_access_token",
            Self::Send(_) => "send_failed",
        }
    }
}

/// Body of every relay and reload response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayResponse {
    /// `"0"` on success, `"-1"` otherwise
    pub ret: String,
    /// `"ok"` or the failure message
    pub msg: String,
}

impl RelayResponse {
    /// Return code for success.
    pub const RET_OK: &'static str = "0";
    /// Return code for any failure.
    pub const RET_FAILED: &'static str = "-1";

    /// Success body.
    pub fn ok() -> Self {
        Self { ret: Self::RET_OK.to_string(), msg: "ok".to_string() }
    }

    /// Failure body carrying `msg`.
    pub fn failure(msg: impl Into<String>) -> Self {
        Self { ret: Self::RET_FAILED.to_string(), msg: msg.into() }
    }

    /// True for a success body.
    pub fn is_ok(&self) -> bool {
        self.ret == Self::RET_OK
    }
}

impl From<&DispatchError> for RelayResponse {
    fn from(error: &DispatchError) -> Self {
        Self::failure(error.to_string())
    }
}

impl IntoResponse for RelayResponse {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_match_wire_contract() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert_eq!(DispatchError::InvalidData(parse_err).to_string(), "invalid data");

        let missing = DispatchError::from(RegistryError::not_found("ops"));
        assert_eq!(missing.to_string(), "receiver not exists");

        let token = DispatchError::InvalidAccessToken {
            receiver: "ops".to_string(),
            token: "guess".to_string(),
        };
        assert_eq!(token.to_string(), "invalid access_token(guess)");

        let send = DispatchError::Send(LarkError::http_status(502, "bad gateway"));
        assert_eq!(send.to_string(), "unknown error HTTP 502: bad gateway");
        assert_eq!(send.kind(), "send_failed");
    }

    #[test]
    fn response_bodies_serialize_as_strings() {
        let ok = serde_json::to_value(RelayResponse::ok()).unwrap();
        assert_eq!(ok, serde_json::json!({"ret": "0", "msg": "ok"}));

        let failed = RelayResponse::failure("invalid data");
        assert!(!failed.is_ok());
        assert_eq!(
            serde_json::to_string(&failed).unwrap(),
            r#"{"ret":"-1","msg":"invalid data"}"#
        );
    }
}
