//! The host application's side of the contract

use parking_lot::RwLock;

use crate::proxy::ProxySettings;

/// Read-only view of the host configuration, polled on every client request
pub trait HostConfiguration: Send + Sync {
    /// Whether the host configuration is reachable from this process.
    ///
    /// Worker nodes that only mirror the controller return `false`.
    fn is_available(&self) -> bool {
        true
    }

    /// Current proxy settings, or `None` for direct connections
    fn proxy_settings(&self) -> Option<ProxySettings>;

    /// Turn the host's encrypted proxy password into clear text
    fn decrypt_password(&self, encrypted: &str) -> Option<String>;
}

/// In-memory host whose settings can be swapped at runtime
///
/// Passwords are stored as given, so `decrypt_password` is the identity.
#[derive(Debug)]
pub struct StaticHost {
    settings: RwLock<Option<ProxySettings>>,
    available: RwLock<bool>,
}

impl StaticHost {
    /// Host with no proxy configured
    pub fn new() -> Self {
        Self {
            settings: RwLock::new(None),
            available: RwLock::new(true),
        }
    }

    /// Host with the given proxy configured
    pub fn with_proxy(settings: ProxySettings) -> Self {
        Self {
            settings: RwLock::new(Some(settings)),
            available: RwLock::new(true),
        }
    }

    /// Replace the proxy settings
    pub fn set_proxy(&self, settings: Option<ProxySettings>) {
        *self.settings.write() = settings;
    }

    /// Mark the host configuration reachable or not
    pub fn set_available(&self, available: bool) {
        *self.available.write() = available;
    }
}

impl Default for StaticHost {
    fn default() -> Self {
        Self::new()
    }
}

impl HostConfiguration for StaticHost {
    fn is_available(&self) -> bool {
        *self.available.read()
    }

    fn proxy_settings(&self) -> Option<ProxySettings> {
        self.settings.read().clone()
    }

    fn decrypt_password(&self, encrypted: &str) -> Option<String> {
        Some(encrypted.to_string())
    }
}
