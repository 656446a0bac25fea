//! Lifecycle of the shared HTTP client
//!
//! [`SharedClientManager`] owns at most one open client. Every lifecycle
//! transition (compare snapshot, close stale client, build replacement) runs
//! under a single mutex, held for the whole of [`SharedClientManager::instance`]
//! and [`SharedClientManager::shutdown`]. Requests issued through a returned
//! handle are not serialized; only replacing the handle is.
//!
//! The transport bakes proxy settings in at construction time, so a change to
//! the host's proxy configuration is handled by closing the current client and
//! building a new one on the next request. A client closed by a caller is
//! detected and replaced the same way.
//!
//! Callers should not keep a handle beyond one logical operation: it may be
//! recycled by the next call to `instance()`.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::{
    client::ReqwestTransport,
    config::HttpConfig,
    error::{HttpError, Result},
    host::HostConfiguration,
    proxy::{ChangeDetection, ProxyServer, ProxySettings, ProxySettingsSnapshot},
    tls::TrustContext,
    transport::{ClientHandle, Transport},
};

/// A handle together with the proxy snapshot it was built from
struct LiveClient<H> {
    handle: Arc<H>,
    /// `None` when the client was built without a proxy
    snapshot: Option<ProxySettingsSnapshot>,
}

/// Owner of the single shared client
///
/// Construct one at host startup, share it by `Arc`, and call
/// [`shutdown`](Self::shutdown) once when the host terminates.
pub struct SharedClientManager<T: Transport = ReqwestTransport> {
    host: Arc<dyn HostConfiguration>,
    transport: T,
    accept_any_certificate: bool,
    change_detection: ChangeDetection,
    state: Mutex<Option<LiveClient<T::Handle>>>,
}

impl SharedClientManager<ReqwestTransport> {
    /// Manager over reqwest configured from `HOSTLINK_*` environment variables
    pub fn from_env(host: Arc<dyn HostConfiguration>) -> Result<Self> {
        Ok(Self::with_config(host, HttpConfig::from_env()?))
    }

    /// Manager over reqwest with an explicit configuration
    pub fn with_config(host: Arc<dyn HostConfiguration>, config: HttpConfig) -> Self {
        let accept_any_certificate = config.accept_any_certificate;
        let change_detection = config.change_detection;

        Self::new(host, ReqwestTransport::new(config))
            .with_accept_any_certificate(accept_any_certificate)
            .with_change_detection(change_detection)
    }
}

impl<T: Transport> SharedClientManager<T> {
    /// Create an empty manager; nothing is built until the first request
    pub fn new(host: Arc<dyn HostConfiguration>, transport: T) -> Self {
        Self {
            host,
            transport,
            accept_any_certificate: false,
            change_detection: ChangeDetection::default(),
            state: Mutex::new(None),
        }
    }

    /// Build clients in trust-all mode
    pub fn with_accept_any_certificate(mut self, accept: bool) -> Self {
        self.accept_any_certificate = accept;
        self
    }

    /// Choose which proxy changes recycle the client
    pub fn with_change_detection(mut self, detection: ChangeDetection) -> Self {
        self.change_detection = detection;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Whether an open client is currently held
    pub fn is_live(&self) -> bool {
        match &*self.state.lock() {
            Some(live) => !live.handle.is_closed(),
            None => false,
        }
    }

    /// Return the shared client, recycling or building it as needed.
    ///
    /// # Errors
    ///
    /// - [`HttpError::HostUnavailable`] when called where the host
    ///   configuration cannot be read.
    /// - [`HttpError::Teardown`] when closing a stale client fails. The stale
    ///   client is dropped regardless, so the next call builds a new one.
    /// - Any construction error from the proxy, trust context or transport;
    ///   the manager stays empty and the next call retries.
    pub fn instance(&self) -> Result<Arc<T::Handle>> {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        if !self.host.is_available() {
            return Err(HttpError::HostUnavailable);
        }

        // Read under the lock so concurrent callers agree on one configuration.
        let settings = self.host.proxy_settings();
        let snapshot = ProxySettingsSnapshot::capture(settings.as_ref());

        let stale = state.as_ref().is_some_and(|live| {
            self.change_detection
                .changed(live.snapshot.as_ref(), snapshot.as_ref())
        });
        if stale {
            debug!("Proxy configuration changed, recycling shared HTTP client");
            if let Some(live) = state.take() {
                if !live.handle.is_closed() {
                    close_handle(live.handle.as_ref())?;
                }
            }
        }

        if let Some(live) = state.as_ref().filter(|live| !live.handle.is_closed()) {
            return Ok(Arc::clone(&live.handle));
        }

        if state.take().is_some() {
            debug!("Shared HTTP client was closed elsewhere, replacing it");
        }

        debug!(
            proxy = settings.as_ref().map(|s| s.host.as_str()),
            "Starting shared HTTP client"
        );
        let proxy = settings.as_ref().map(|s| self.proxy_server(s));
        let trust = TrustContext::resolve(self.accept_any_certificate)?;
        let handle = Arc::new(self.transport.build(proxy.as_ref(), &trust)?);

        *state = Some(LiveClient {
            handle: Arc::clone(&handle),
            snapshot,
        });
        Ok(handle)
    }

    /// Close the shared client if one is open and forget it.
    ///
    /// Safe to call more than once; later calls do nothing. The manager is
    /// empty afterwards even if closing fails. The lock is held until the
    /// close completes, so no replacement is built while it is in progress.
    pub fn shutdown(&self) -> Result<()> {
        let mut state = self.state.lock();

        if let Some(live) = state.take() {
            if !live.handle.is_closed() {
                info!("Shutting down shared HTTP client");
                close_handle(live.handle.as_ref())?;
            }
        }
        Ok(())
    }

    fn proxy_server(&self, settings: &ProxySettings) -> ProxyServer {
        let password = settings
            .encrypted_password
            .as_deref()
            .and_then(|encrypted| self.host.decrypt_password(encrypted));
        ProxyServer::new(settings, password)
    }
}

fn close_handle<H: ClientHandle>(handle: &H) -> Result<()> {
    handle.close().map_err(|e| {
        warn!(error = %e, "Could not close shared HTTP client");
        HttpError::Teardown(e)
    })
}
