//! Proxy settings as seen by the host, and the snapshot used to detect changes
//!
//! The host owns [`ProxySettings`] and may change them at any time. The manager
//! captures a [`ProxySettingsSnapshot`] each time it hands out a client and
//! compares it with the snapshot the live client was built from. Only the
//! transport ever sees a [`ProxyServer`], which carries the decrypted password.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{HttpError, Result};

/// Proxy configuration as held by the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxySettings {
    /// Proxy host name
    pub host: String,
    /// Proxy port
    pub port: u16,
    /// Optional user name for proxy authentication
    #[serde(default)]
    pub username: Option<String>,
    /// Password in the host's encrypted form
    #[serde(default)]
    pub encrypted_password: Option<String>,
    /// Hosts that bypass the proxy
    #[serde(default)]
    pub no_proxy_hosts: Vec<String>,
}

impl ProxySettings {
    /// Create unauthenticated settings for `host:port`
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            username: None,
            encrypted_password: None,
            no_proxy_hosts: Vec::new(),
        }
    }

    /// Set credentials; the password must already be in encrypted form
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        encrypted_password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.encrypted_password = Some(encrypted_password.into());
        self
    }

    /// Set the no-proxy list
    pub fn with_no_proxy_hosts<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.no_proxy_hosts = hosts.into_iter().map(Into::into).collect();
        self
    }

    /// Set the no-proxy list from a raw host string such as
    /// `"localhost, *.internal|10.0.0.1"`
    pub fn with_no_proxy_spec(self, spec: &str) -> Self {
        self.with_no_proxy_hosts(parse_no_proxy_spec(spec))
    }
}

/// Split a raw no-proxy string on runs of whitespace, `,` or `|`
pub fn parse_no_proxy_spec(spec: &str) -> Vec<String> {
    spec.split(|c: char| matches!(c, ' ' | '\t' | '\n' | ',' | '|'))
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Immutable copy of the proxy fields that decide whether a client is stale
///
/// Equality compares host, port, username and the *encrypted* password. The
/// no-proxy list is carried along but only compared under
/// [`ChangeDetection::IncludeNoProxyHosts`].
#[derive(Debug, Clone)]
pub struct ProxySettingsSnapshot {
    host: String,
    port: u16,
    username: Option<String>,
    encrypted_password: Option<String>,
    no_proxy_hosts: Vec<String>,
}

impl ProxySettingsSnapshot {
    /// Capture a snapshot; absent settings give an absent snapshot
    pub fn capture(settings: Option<&ProxySettings>) -> Option<Self> {
        settings.map(|s| Self {
            host: s.host.clone(),
            port: s.port,
            username: s.username.clone(),
            encrypted_password: s.encrypted_password.clone(),
            no_proxy_hosts: s.no_proxy_hosts.clone(),
        })
    }
}

impl PartialEq for ProxySettingsSnapshot {
    fn eq(&self, other: &Self) -> bool {
        self.port == other.port
            && self.host == other.host
            && self.username == other.username
            && self.encrypted_password == other.encrypted_password
    }
}

impl Eq for ProxySettingsSnapshot {}

/// Which differences between two snapshots force a client recycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeDetection {
    /// Host, port, username and encrypted password. A change limited to the
    /// no-proxy list keeps the current client.
    #[default]
    Credentials,
    /// Everything in [`ChangeDetection::Credentials`] plus the no-proxy list
    IncludeNoProxyHosts,
}

impl ChangeDetection {
    /// Whether `current` differs from `previous` under this policy
    pub fn changed(
        self,
        previous: Option<&ProxySettingsSnapshot>,
        current: Option<&ProxySettingsSnapshot>,
    ) -> bool {
        match (previous, current) {
            (None, None) => false,
            (Some(a), Some(b)) => match self {
                ChangeDetection::Credentials => a != b,
                ChangeDetection::IncludeNoProxyHosts => {
                    a != b || a.no_proxy_hosts != b.no_proxy_hosts
                }
            },
            _ => true,
        }
    }
}

/// Proxy credentials with the password in clear text
#[derive(Clone)]
pub struct ProxyCredentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for ProxyCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Proxy description handed to the transport when a client is built
#[derive(Debug, Clone)]
pub struct ProxyServer {
    pub host: String,
    pub port: u16,
    pub credentials: Option<ProxyCredentials>,
    pub no_proxy_hosts: Vec<String>,
}

impl ProxyServer {
    /// Build from host settings and the already-decrypted password
    pub fn new(settings: &ProxySettings, password: Option<String>) -> Self {
        let credentials = settings.username.as_ref().map(|username| ProxyCredentials {
            username: username.clone(),
            password: password.unwrap_or_default(),
        });

        Self {
            host: settings.host.clone(),
            port: settings.port,
            credentials,
            no_proxy_hosts: settings
                .no_proxy_hosts
                .iter()
                .map(|h| normalize_no_proxy_host(h))
                .collect(),
        }
    }

    /// Proxy URL, e.g. `http://proxy.example.com:3128`
    pub fn url(&self) -> Result<url::Url> {
        if self.host.trim().is_empty() {
            return Err(HttpError::InvalidProxy("proxy host is empty".to_string()));
        }
        url::Url::parse(&format!("http://{}:{}", self.host, self.port))
            .map_err(|e| HttpError::InvalidProxy(format!("{}:{}: {e}", self.host, self.port)))
    }

    /// Convert into a reqwest proxy covering every scheme
    pub fn to_reqwest(&self) -> Result<reqwest::Proxy> {
        let mut proxy =
            reqwest::Proxy::all(self.url()?).map_err(|e| HttpError::InvalidProxy(e.to_string()))?;

        if let Some(credentials) = &self.credentials {
            proxy = proxy.basic_auth(&credentials.username, &credentials.password);
        }

        if !self.no_proxy_hosts.is_empty() {
            proxy = proxy.no_proxy(reqwest::NoProxy::from_string(&self.no_proxy_hosts.join(",")));
        }

        Ok(proxy)
    }
}

// `*.example.com` becomes `.example.com`, the suffix form reqwest matches on.
fn normalize_no_proxy_host(host: &str) -> String {
    match host.strip_prefix("*.") {
        Some(rest) => format!(".{rest}"),
        None => host.to_string(),
    }
}
