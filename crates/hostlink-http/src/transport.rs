//! Seams between the manager and the HTTP library it wraps

use std::io;

use crate::{error::Result, proxy::ProxyServer, tls::TrustContext};

/// A live or closed client owned by the manager
///
/// Implementations must be safe to use from many threads at once; only
/// replacing the handle is serialized by the manager.
pub trait ClientHandle: Send + Sync + 'static {
    /// Whether the handle has been closed, by the manager or anyone else
    fn is_closed(&self) -> bool;

    /// Release the handle's resources. Closing twice must be harmless.
    fn close(&self) -> io::Result<()>;
}

/// Builds clients with proxy and trust settings fixed at construction time
pub trait Transport: Send + Sync {
    type Handle: ClientHandle;

    /// Build a new open handle
    fn build(&self, proxy: Option<&ProxyServer>, trust: &TrustContext) -> Result<Self::Handle>;
}
