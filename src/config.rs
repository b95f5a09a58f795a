//! Endpoint and credential configuration.
//!
//! Defaults point at the production storefront API. Every field can be
//! overridden with a builder setter or an environment variable, which is how
//! tests point the client at a local mock server.

use std::env;
use std::time::Duration;

/// Default base for the main storefront API.
pub const DEFAULT_API_BASE: &str = "https://v2.jkt48connect.com";

/// Default base for the verification API (OTP, membership checks, replays).
pub const DEFAULT_VERIFY_BASE: &str = "https://v2.jkt48connect.my.id";

/// Default best-effort client IP lookup endpoint.
pub const DEFAULT_IP_LOOKUP_URL: &str = "https://api.ipify.org?format=json";

/// Default API key sent with every storefront request.
pub const DEFAULT_API_KEY: &str = "JKTCONNECT";

/// Default request timeout applied to all remote calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct Config {
    pub api_base: String,
    pub verify_base: String,
    pub ip_lookup_url: String,
    pub api_key: String,
    pub timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            verify_base: DEFAULT_VERIFY_BASE.to_string(),
            ip_lookup_url: DEFAULT_IP_LOOKUP_URL.to_string(),
            api_key: DEFAULT_API_KEY.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl Config {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a config from the environment, falling back to the defaults.
    ///
    /// Recognized variables: `STREAMGATE_API_BASE`, `STREAMGATE_VERIFY_BASE`,
    /// `STREAMGATE_IP_LOOKUP_URL`, `STREAMGATE_API_KEY` and
    /// `STREAMGATE_TIMEOUT_SECONDS`.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(base) = env::var("STREAMGATE_API_BASE") {
            config.api_base = base;
        }
        if let Ok(base) = env::var("STREAMGATE_VERIFY_BASE") {
            config.verify_base = base;
        }
        if let Ok(url) = env::var("STREAMGATE_IP_LOOKUP_URL") {
            config.ip_lookup_url = url;
        }
        if let Ok(key) = env::var("STREAMGATE_API_KEY") {
            config.api_key = key;
        }
        if let Ok(seconds) = env::var("STREAMGATE_TIMEOUT_SECONDS") {
            if let Ok(seconds) = seconds.parse::<u64>() {
                config.timeout = Duration::from_secs(seconds);
            }
        }

        config
    }

    #[must_use]
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    #[must_use]
    pub fn with_verify_base(mut self, base: impl Into<String>) -> Self {
        self.verify_base = base.into();
        self
    }

    #[must_use]
    pub fn with_ip_lookup_url(mut self, url: impl Into<String>) -> Self {
        self.ip_lookup_url = url.into();
        self
    }

    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = key.into();
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
