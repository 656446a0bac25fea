//! Shared fixtures for the integration tests
#![allow(dead_code)]

use std::{
    io,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
};

use hostlink_http::{
    ClientHandle, ProxyServer, ProxySettings, Result, SharedClientManager, StaticHost, Transport,
    TrustContext,
};

/// Handle that only records its lifecycle
#[derive(Debug)]
pub struct CountingHandle {
    pub generation: usize,
    pub proxy: Option<ProxyServer>,
    closed: AtomicBool,
    pub close_calls: AtomicUsize,
}

impl ClientHandle for CountingHandle {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn close(&self) -> io::Result<()> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Transport numbering each handle it builds
#[derive(Debug, Default)]
pub struct CountingTransport {
    builds: AtomicUsize,
}

impl CountingTransport {
    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }
}

impl Transport for CountingTransport {
    type Handle = CountingHandle;

    fn build(&self, proxy: Option<&ProxyServer>, _trust: &TrustContext) -> Result<CountingHandle> {
        Ok(CountingHandle {
            generation: self.builds.fetch_add(1, Ordering::SeqCst),
            proxy: proxy.cloned(),
            closed: AtomicBool::new(false),
            close_calls: AtomicUsize::new(0),
        })
    }
}

pub fn counting_manager(host: &Arc<StaticHost>) -> SharedClientManager<CountingTransport> {
    SharedClientManager::new(host.clone(), CountingTransport::default())
}

pub fn proxy(host: &str, port: u16, user: &str, password: &str) -> ProxySettings {
    ProxySettings::new(host, port).with_credentials(user, password)
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
