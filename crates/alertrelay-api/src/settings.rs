//! Service settings for the relay process.
//!
//! Receivers live in their own YAML document (see
//! [`alertrelay_core::Configuration`]); these settings cover the process
//! itself. They are loaded in priority order:
//! 1. Environment variables prefixed with `ALERTRELAY_` (highest priority)
//! 2. Settings file (`alertrelay.toml`)
//! 3. Built-in defaults (lowest priority)
//!
//! Command-line flags override all three and are applied by the binary.

use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use alertrelay_lark::{ClientConfig, DEFAULT_OPEN_API_BASE_URL};
use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

const SETTINGS_FILE: &str = "alertrelay.toml";
const ENV_PREFIX: &str = "ALERTRELAY_";

/// Process-level settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Path of the receiver configuration file.
    ///
    /// Environment variable: `ALERTRELAY_CONFIG_FILE`
    #[serde(default = "default_config_file")]
    pub config_file: PathBuf,
    /// Address to listen on; `:port` binds every interface.
    ///
    /// Environment variable: `ALERTRELAY_LISTEN_ADDRESS`
    #[serde(default = "default_listen_address")]
    pub listen_address: String,
    /// Base URL of the Lark open API.
    ///
    /// Environment variable: `ALERTRELAY_OPEN_API_BASE_URL`
    #[serde(default = "default_open_api_base_url")]
    pub open_api_base_url: String,
    /// Timeout for tenant token and user lookup calls, in seconds.
    ///
    /// Environment variable: `ALERTRELAY_IDENTITY_TIMEOUT_SECONDS`
    #[serde(default = "default_identity_timeout")]
    pub identity_timeout_seconds: u64,
    /// Timeout for bot webhook delivery, in seconds.
    ///
    /// Environment variable: `ALERTRELAY_DELIVERY_TIMEOUT_SECONDS`
    #[serde(default = "default_delivery_timeout")]
    pub delivery_timeout_seconds: u64,
    /// Upper bound on handling one inbound request, in seconds.
    ///
    /// Environment variable: `ALERTRELAY_REQUEST_TIMEOUT_SECONDS`
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    /// Fallback log filter when `RUST_LOG` is unset.
    ///
    /// Environment variable: `ALERTRELAY_LOG`
    #[serde(default = "default_log_filter")]
    pub log: String,
}

impl Settings {
    /// Settings sources without extraction, for callers that add providers.
    pub fn figment() -> Figment {
        Self::figment_with_file(SETTINGS_FILE)
    }

    /// Settings sources reading the TOML file at `path`.
    pub fn figment_with_file(path: impl AsRef<Path>) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX))
    }

    /// Loads settings from defaults, `alertrelay.toml` and the environment.
    ///
    /// # Errors
    ///
    /// Fails if a source cannot be parsed or the result is invalid.
    pub fn load() -> Result<Self> {
        Self::from_figment(Self::figment())
    }

    /// Extracts and validates settings from `figment`.
    pub fn from_figment(figment: Figment) -> Result<Self> {
        let settings: Self = figment.extract().context("Failed to load settings")?;
        settings.validate()?;
        Ok(settings)
    }

    /// Socket address from [`Self::listen_address`].
    pub fn listen_addr(&self) -> Result<SocketAddr> {
        parse_listen_address(&self.listen_address)
    }

    /// Client settings for identity calls.
    pub fn identity_client_config(&self) -> ClientConfig {
        ClientConfig::with_timeout(Duration::from_secs(self.identity_timeout_seconds))
    }

    /// Client settings for bot delivery.
    pub fn delivery_client_config(&self) -> ClientConfig {
        ClientConfig::with_timeout(Duration::from_secs(self.delivery_timeout_seconds))
    }

    /// Inbound request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    /// Validates setting values.
    ///
    /// The request timeout must cover the worst case of one token call, one
    /// lookup call and one delivery, otherwise the server would cut requests
    /// off before the relay can answer.
    pub fn validate(&self) -> Result<()> {
        if self.identity_timeout_seconds == 0 {
            anyhow::bail!("identity_timeout_seconds must be greater than 0");
        }

        if self.delivery_timeout_seconds == 0 {
            anyhow::bail!("delivery_timeout_seconds must be greater than 0");
        }

        let outbound_budget = self
            .identity_timeout_seconds
            .saturating_mul(2)
            .saturating_add(self.delivery_timeout_seconds);
        if self.request_timeout_seconds <= outbound_budget {
            anyhow::bail!(
                "request_timeout_seconds ({}) must exceed the outbound budget of {}s",
                self.request_timeout_seconds,
                outbound_budget
            );
        }

        if !(self.open_api_base_url.starts_with("http://")
            || self.open_api_base_url.starts_with("https://"))
        {
            anyhow::bail!("open_api_base_url must be an http(s) URL");
        }

        self.listen_addr()?;
        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            config_file: default_config_file(),
            listen_address: default_listen_address(),
            open_api_base_url: default_open_api_base_url(),
            identity_timeout_seconds: default_identity_timeout(),
            delivery_timeout_seconds: default_delivery_timeout(),
            request_timeout_seconds: default_request_timeout(),
            log: default_log_filter(),
        }
    }
}

/// Parses a listen address, accepting the `:port` shorthand.
pub fn parse_listen_address(raw: &str) -> Result<SocketAddr> {
    let raw = raw.trim();
    let full = if raw.starts_with(':') { format!("0.0.0.0{raw}") } else { raw.to_string() };
    SocketAddr::from_str(&full).with_context(|| format!("Invalid listen address: {raw}"))
}

fn default_config_file() -> PathBuf {
    PathBuf::from("config.yml")
}

fn default_listen_address() -> String {
    ":8086".to_string()
}

fn default_open_api_base_url() -> String {
    DEFAULT_OPEN_API_BASE_URL.to_string()
}

fn default_identity_timeout() -> u64 {
    10
}

fn default_delivery_timeout() -> u64 {
    10
}

fn default_request_timeout() -> u64 {
    60
}

fn default_log_filter() -> String {
    "info,alertrelay=debug,tower_http=debug".to_string()
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, env, sync::Mutex};

    use super::*;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    struct TestEnvGuard {
        _lock: std::sync::MutexGuard<'static, ()>,
        originals: HashMap<String, Option<String>>,
    }

    impl TestEnvGuard {
        fn new() -> Self {
            let lock = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            Self { _lock: lock, originals: HashMap::new() }
        }

        fn set_var(&mut self, key: &str, value: &str) {
            self.originals.entry(key.to_string()).or_insert_with(|| env::var(key).ok());
            env::set_var(key, value);
        }
    }

    impl Drop for TestEnvGuard {
        fn drop(&mut self) {
            for (key, original) in &self.originals {
                match original {
                    Some(value) => env::set_var(key, value),
                    None => env::remove_var(key),
                }
            }
        }
    }

    fn missing_file() -> PathBuf {
        PathBuf::from("/nonexistent/alertrelay-settings.toml")
    }

    #[test]
    fn defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.listen_addr().unwrap().port(), 8086);
        assert_eq!(settings.config_file, PathBuf::from("config.yml"));
        assert_eq!(settings.identity_client_config().timeout, Duration::from_secs(10));
    }

    #[test]
    fn env_overrides_defaults() {
        let mut guard = TestEnvGuard::new();
        guard.set_var("ALERTRELAY_LISTEN_ADDRESS", "127.0.0.1:9100");
        guard.set_var("ALERTRELAY_IDENTITY_TIMEOUT_SECONDS", "3");
        guard.set_var("ALERTRELAY_DELIVERY_TIMEOUT_SECONDS", "7");
        guard.set_var("ALERTRELAY_OPEN_API_BASE_URL", "http://lark.internal/open-apis");

        let settings = Settings::from_figment(Settings::figment_with_file(missing_file()))
            .expect("settings load with env overrides");

        assert_eq!(settings.listen_addr().unwrap().to_string(), "127.0.0.1:9100");
        assert_eq!(settings.identity_timeout_seconds, 3);
        assert_eq!(settings.delivery_client_config().timeout, Duration::from_secs(7));
        assert_eq!(settings.open_api_base_url, "http://lark.internal/open-apis");
    }

    #[test]
    fn toml_file_is_read() {
        let _guard = TestEnvGuard::new();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alertrelay.toml");
        std::fs::write(&path, "config_file = \"/etc/relay/receivers.yml\"\nrequest_timeout_seconds = 90\n")
            .unwrap();

        let settings = Settings::from_figment(Settings::figment_with_file(&path)).unwrap();

        assert_eq!(settings.config_file, PathBuf::from("/etc/relay/receivers.yml"));
        assert_eq!(settings.request_timeout(), Duration::from_secs(90));
    }

    #[test]
    fn invalid_values_fail_validation() {
        let mut settings = Settings { identity_timeout_seconds: 0, ..Settings::default() };
        assert!(settings.validate().is_err());

        settings = Settings { delivery_timeout_seconds: 0, ..Settings::default() };
        assert!(settings.validate().is_err());

        settings = Settings { request_timeout_seconds: 30, ..Settings::default() };
        assert!(settings.validate().is_err());

        settings = Settings { open_api_base_url: "ftp://x".to_string(), ..Settings::default() };
        assert!(settings.validate().is_err());

        settings = Settings { listen_address: "not-an-address".to_string(), ..Settings::default() };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn huge_timeouts_do_not_overflow_budget() {
        let settings = Settings {
            identity_timeout_seconds: u64::MAX,
            delivery_timeout_seconds: u64::MAX,
            request_timeout_seconds: u64::MAX,
            ..Settings::default()
        };

        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("outbound budget"));
    }

    #[test]
    fn listen_address_shorthand() {
        assert_eq!(parse_listen_address(":8086").unwrap().to_string(), "0.0.0.0:8086");
        assert_eq!(parse_listen_address("127.0.0.1:80").unwrap().to_string(), "127.0.0.1:80");
        assert!(parse_listen_address("8086").is_err());
    }
}
