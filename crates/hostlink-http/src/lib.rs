//! Shared, proxy-aware HTTP client for host applications
//!
//! The host owns one [`SharedClientManager`] and every caller asks it for the
//! client through [`SharedClientManager::instance`]. The manager builds the
//! client on first use, rebuilds it when the host's proxy settings change or
//! when somebody closes it, and closes it when the host shuts down.
//!
//! ## Features
//!
//! - **Change detection**: proxy host, port, user and encrypted password
//!   (optionally the no-proxy list) are compared on every access
//! - **Trust-all mode**: `HOSTLINK_ACCEPT_ANY_CERTIFICATE=true` disables
//!   certificate validation for every client built
//! - **Trait-based transport**: the manager works over any [`Transport`];
//!   [`ReqwestTransport`] is the production one
//! - **Testing support**: [`StaticHost`] for an in-memory host, wiremock for
//!   request-level tests
//!
//! Do not cache a client beyond one logical operation; it may be recycled by
//! the next call.

pub mod client;
pub mod config;
pub mod error;
pub mod host;
pub mod lifecycle;
pub mod manager;
pub mod proxy;
pub mod tls;
pub mod transport;

pub use client::{HttpClient, HttpClientTrait, ReqwestTransport};
pub use config::HttpConfig;
pub use error::{HttpError, Result};
pub use host::{HostConfiguration, StaticHost};
pub use lifecycle::{HostComponent, HostLifecycle};
pub use manager::SharedClientManager;
pub use proxy::{ChangeDetection, ProxyCredentials, ProxyServer, ProxySettings, ProxySettingsSnapshot};
pub use tls::TrustContext;
pub use transport::{ClientHandle, Transport};

/// Re-export commonly used types
pub use reqwest::{header, Method, Response, StatusCode};
