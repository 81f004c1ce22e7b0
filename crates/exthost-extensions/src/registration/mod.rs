//! Registrars: turn loaded module exports into host side effects.

pub mod bundles;
pub mod endpoints;
pub mod hooks;
pub mod operations;

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use exthost_core::traits::ExtensionSource;

use crate::api::context::HostResources;
use crate::embeds::HookEmbeds;
use crate::emitter::EventBus;
use crate::flows::OperationRegistry;
use crate::loader::ModuleLoader;
use crate::router::EndpointRouter;
use crate::sandbox::Sandbox;
use crate::scheduler::Scheduler;

pub use bundles::register_bundle;
pub use endpoints::register_endpoint;
pub use hooks::{HookRegistrar, register_hook};
pub use operations::register_operation;

/// Host collaborators the registrars act upon.
#[derive(Clone)]
pub struct Collaborators {
    /// Supplies enabled extension records.
    pub source: Arc<dyn ExtensionSource>,
    /// Imports and evicts modules.
    pub loader: Arc<dyn ModuleLoader>,
    /// Runs untrusted extensions.
    pub sandbox: Arc<dyn Sandbox>,
    /// Event bus hooks subscribe to.
    pub bus: Arc<dyn EventBus>,
    /// Cron scheduler for `schedule` hooks.
    pub scheduler: Arc<dyn Scheduler>,
    /// Workflow engine.
    pub flows: Arc<dyn OperationRegistry>,
    /// Shared endpoint router.
    pub router: Arc<EndpointRouter>,
    /// Head/body embeds.
    pub embeds: Arc<HookEmbeds>,
    /// Resources extension contexts are built from.
    pub resources: HostResources,
    /// Global scheduling flag; scheduled hooks skip their tick while it is off.
    pub schedule_enabled: Arc<AtomicBool>,
}

impl fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collaborators")
            .field("router", &self.router)
            .field("embeds", &self.embeds)
            .finish_non_exhaustive()
    }
}
