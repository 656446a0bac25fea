//! Host termination hook
//!
//! The host registers its long-lived components with a [`HostLifecycle`] and
//! calls [`HostLifecycle::stop_all`] once while terminating. The shared client
//! manager is such a component; stopping it performs its shutdown.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::{error::Result, manager::SharedClientManager, transport::Transport};

/// A component with work to do when the host terminates
pub trait HostComponent: Send + Sync {
    /// Get the component name
    fn name(&self) -> &'static str;

    /// Stop the component
    fn stop(&self) -> Result<()>;
}

impl<T: Transport> HostComponent for SharedClientManager<T> {
    fn name(&self) -> &'static str {
        "shared-http-client"
    }

    fn stop(&self) -> Result<()> {
        self.shutdown()
    }
}

/// Components stopped in reverse registration order, at most once
#[derive(Default)]
pub struct HostLifecycle {
    components: Mutex<Vec<Arc<dyn HostComponent>>>,
    stopped: AtomicBool,
}

impl HostLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component
    pub fn register(&self, component: Arc<dyn HostComponent>) {
        debug!("Registered component: {}", component.name());
        self.components.lock().push(component);
    }

    /// Stop every component, newest first.
    ///
    /// A failing component does not prevent the others from stopping; the
    /// first failure is returned. Calls after the first do nothing.
    pub fn stop_all(&self) -> Result<()> {
        if self.stopped.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        info!("Stopping all components...");
        let components = std::mem::take(&mut *self.components.lock());

        let mut first_error = None;
        for component in components.into_iter().rev() {
            if let Err(e) = component.stop() {
                warn!("Component stop failed: {} - {}", component.name(), e);
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
