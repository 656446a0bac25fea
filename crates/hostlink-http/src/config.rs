//! Shared client configuration

use std::time::Duration;

use config::{Config, Environment};
use serde::{Deserialize, Serialize};

use crate::{error::Result, proxy::ChangeDetection};

/// Prefix of the environment variables read by [`HttpConfig::from_env`]
pub const ENV_PREFIX: &str = "HOSTLINK";

/// Settings baked into every client the manager builds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Request timeout
    #[serde(default = "default_timeout")]
    pub timeout: Duration,

    /// Connection timeout
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: Duration,

    /// Custom user agent
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum redirects to follow (0 = no redirects)
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// Enable connection pooling
    #[serde(default = "default_pool_enabled")]
    pub pool_enabled: bool,

    /// Pool idle timeout
    #[serde(default = "default_pool_idle_timeout")]
    pub pool_idle_timeout: Duration,

    /// Disable certificate validation for every outbound TLS connection
    #[serde(default)]
    pub accept_any_certificate: bool,

    /// Which proxy fields trigger a client recycle
    #[serde(default)]
    pub change_detection: ChangeDetection,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            connect_timeout: default_connect_timeout(),
            user_agent: default_user_agent(),
            max_redirects: default_max_redirects(),
            pool_enabled: default_pool_enabled(),
            pool_idle_timeout: default_pool_idle_timeout(),
            accept_any_certificate: false,
            change_detection: ChangeDetection::default(),
        }
    }
}

/// Values accepted from the process environment; everything is optional
#[derive(Debug, Default, Deserialize)]
struct EnvOverrides {
    accept_any_certificate: Option<bool>,
    change_detection: Option<ChangeDetection>,
    timeout_secs: Option<u64>,
    connect_timeout_secs: Option<u64>,
    user_agent: Option<String>,
    max_redirects: Option<usize>,
    pool_enabled: Option<bool>,
    pool_idle_timeout_secs: Option<u64>,
}

impl HttpConfig {
    /// Create a new HTTP config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load defaults overridden by `HOSTLINK_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_environment(Environment::with_prefix(ENV_PREFIX))
    }

    /// Load defaults overridden by the given environment source
    pub fn from_environment(env: Environment) -> Result<Self> {
        let overrides: EnvOverrides = Config::builder()
            .add_source(env.try_parsing(true))
            .build()?
            .try_deserialize()?;

        Ok(Self::default().apply(overrides))
    }

    fn apply(mut self, env: EnvOverrides) -> Self {
        if let Some(accept) = env.accept_any_certificate {
            self.accept_any_certificate = accept;
        }
        if let Some(detection) = env.change_detection {
            self.change_detection = detection;
        }
        if let Some(secs) = env.timeout_secs {
            self.timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = env.connect_timeout_secs {
            self.connect_timeout = Duration::from_secs(secs);
        }
        if let Some(user_agent) = env.user_agent {
            self.user_agent = user_agent;
        }
        if let Some(max) = env.max_redirects {
            self.max_redirects = max;
        }
        if let Some(enabled) = env.pool_enabled {
            self.pool_enabled = enabled;
        }
        if let Some(secs) = env.pool_idle_timeout_secs {
            self.pool_idle_timeout = Duration::from_secs(secs);
        }
        self
    }

    /// Set timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set user agent
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Enable or disable trust-all mode
    pub fn with_accept_any_certificate(mut self, accept: bool) -> Self {
        self.accept_any_certificate = accept;
        self
    }

    /// Set the recycle policy
    pub fn with_change_detection(mut self, detection: ChangeDetection) -> Self {
        self.change_detection = detection;
        self
    }
}

// Default value functions for serde
fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_user_agent() -> String {
    format!("hostlink/{}", env!("CARGO_PKG_VERSION"))
}

fn default_max_redirects() -> usize {
    10
}

fn default_pool_enabled() -> bool {
    true
}

fn default_pool_idle_timeout() -> Duration {
    Duration::from_secs(90)
}
