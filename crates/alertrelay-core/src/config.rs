//! Receiver configuration document.
//!
//! The document names the Lark application used for identity lookups and a
//! set of receivers, each with its own inbound access token, bot webhook URL
//! and optional mention targets:
//!
//! ```yaml
//! app_id: cli_a1b2c3
//! app_secret: s3cr3t
//! receivers:
//!   ops:
//!     access_token: abc
//!     fsurl: https://open.feishu.cn/open-apis/bot/v2/hook/xxxx
//!     mentions:
//!       mobiles: ["13800000000"]
//!       emails: ["oncall@example.com"]
//! ```

use std::{collections::HashMap, fmt, fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, RegistryError};

/// A complete, immutable configuration snapshot.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    /// Lark application ID used to obtain tenant access tokens.
    #[serde(default)]
    pub app_id: String,
    /// Lark application secret.
    #[serde(default)]
    pub app_secret: String,
    /// Receivers keyed by the name callers pass in the `receiver` query
    /// parameter.
    #[serde(default)]
    pub receivers: HashMap<String, ReceiverConfig>,
}

/// Credentials and destination for a single receiver.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiverConfig {
    /// Shared secret callers must present as `access_token`.
    #[serde(default)]
    pub access_token: String,
    /// Lark custom bot webhook URL.
    #[serde(default)]
    pub fsurl: String,
    /// People to mention on every notification.
    #[serde(default)]
    pub mentions: Option<Mentions>,
}

/// Mention targets identified by phone number or email.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mentions {
    /// Mobile numbers to resolve.
    #[serde(default)]
    pub mobiles: Vec<String>,
    /// Email addresses to resolve.
    #[serde(default)]
    pub emails: Vec<String>,
}

impl ReceiverConfig {
    /// Returns the configured mention targets, empty if none were declared.
    pub fn mentions(&self) -> Mentions {
        self.mentions.clone().unwrap_or_default()
    }
}

impl Configuration {
    /// Reads and parses a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] if the file cannot be read and
    /// [`ConfigError::Parse`] or [`ConfigError::Invalid`] if its contents are
    /// not a usable configuration.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| ConfigError::read(path, e))?;
        Self::from_yaml_str(&raw)
    }

    /// Parses a configuration document.
    ///
    /// An empty document yields an empty configuration.
    pub fn from_yaml_str(raw: &str) -> Result<Self, ConfigError> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Returns a copy of the named receiver's configuration.
    pub fn receiver(&self, name: &str) -> Result<ReceiverConfig, RegistryError> {
        self.receivers.get(name).cloned().ok_or_else(|| RegistryError::not_found(name))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (name, receiver) in &self.receivers {
            if name.is_empty() {
                return Err(ConfigError::invalid("receiver name must not be empty"));
            }
            if receiver.fsurl.trim().is_empty() {
                return Err(ConfigError::invalid(format!("receiver {name} has no fsurl")));
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.receivers.keys().collect();
        names.sort();
        f.debug_struct("Configuration")
            .field("app_id", &self.app_id)
            .field("app_secret", &"***")
            .field("receivers", &names)
            .finish()
    }
}
