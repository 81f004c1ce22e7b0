//! Registration manager: loads, registers and tears down API extensions.

use std::fmt;
use std::sync::atomic::Ordering;

use futures::future::join_all;
use tracing::{error, info, warn};

use exthost_core::types::extension::{Extension, ExtensionKind};
use exthost_core::types::normalize_path;
use exthost_core::{AppError, AppResult};

use crate::ledger::{Ledger, LedgerEntry};
use crate::module::ExtensionModule;
use crate::operations::builtin_operations;
use crate::registration::{
    Collaborators, register_bundle, register_endpoint, register_hook, register_operation,
};

/// How one registration pass over a kind went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistrationSummary {
    /// Kind the pass covered.
    pub kind: ExtensionKind,
    /// Extensions imported and registered in-process.
    pub loaded: usize,
    /// Untrusted extensions handed to the sandbox.
    pub sandboxed: usize,
    /// Extensions that failed to load or register.
    pub failed: usize,
}

impl RegistrationSummary {
    fn new(kind: ExtensionKind) -> Self {
        Self {
            kind,
            loaded: 0,
            sandboxed: 0,
            failed: 0,
        }
    }
}

enum Outcome {
    Loaded,
    Sandboxed,
}

/// Lifecycle controller for API extensions.
///
/// Registration and teardown take `&mut self`; hosts share the manager behind
/// a `tokio::sync::Mutex` so passes never overlap.
pub struct RegistrationManager {
    collaborators: Collaborators,
    ledger: Ledger,
}

impl fmt::Debug for RegistrationManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrationManager")
            .field("ledger", &self.ledger.counts())
            .finish_non_exhaustive()
    }
}

impl RegistrationManager {
    /// Creates a manager acting on the given collaborators.
    pub fn new(collaborators: Collaborators) -> Self {
        Self {
            collaborators,
            ledger: Ledger::new(),
        }
    }

    /// The collaborators this manager acts upon.
    pub fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }

    /// Side effects awaiting teardown.
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Turns scheduled hook execution on or off without touching the jobs.
    pub fn set_schedule_enabled(&self, enabled: bool) {
        self.collaborators
            .schedule_enabled
            .store(enabled, Ordering::Relaxed);
    }

    /// Registers every enabled hook extension.
    pub async fn register_hooks(&mut self) -> RegistrationSummary {
        self.register_kind(ExtensionKind::Hook).await
    }

    /// Registers every enabled endpoint extension.
    pub async fn register_endpoints(&mut self) -> RegistrationSummary {
        self.register_kind(ExtensionKind::Endpoint).await
    }

    /// Registers the built-in operations, then every enabled operation extension.
    ///
    /// Built-in operations are never sandboxed and are not counted in the summary.
    pub async fn register_operations(&mut self) -> RegistrationSummary {
        for operation in builtin_operations() {
            register_operation(&self.collaborators, &operation).await;
        }

        self.register_kind(ExtensionKind::Operation).await
    }

    /// Registers every enabled bundle extension.
    pub async fn register_bundles(&mut self) -> RegistrationSummary {
        self.register_kind(ExtensionKind::Bundle).await
    }

    /// Registers hooks, endpoints, operations and bundles, in that order.
    pub async fn register_api_extensions(&mut self) -> Vec<RegistrationSummary> {
        let hooks = self.register_hooks().await;
        let endpoints = self.register_endpoints().await;
        let operations = self.register_operations().await;
        let bundles = self.register_bundles().await;

        let routes = self.collaborators.router.len().await;
        info!(ledger = self.ledger.len(), routes, "API extensions registered");

        vec![hooks, endpoints, operations, bundles]
    }

    /// Tears everything down and registers again.
    pub async fn reload(&mut self) -> Vec<RegistrationSummary> {
        self.unregister_api_extensions().await;
        self.register_api_extensions().await
    }

    /// Reverses every recorded side effect.
    ///
    /// Unsubscribes every handler and stops every job, then clears the shared
    /// router and the workflow engine, then evicts every loaded module.
    pub async fn unregister_api_extensions(&mut self) {
        let entries = self.ledger.drain();
        let recorded = entries.len();

        let bus = self.collaborators.bus.as_ref();
        let mut jobs = Vec::new();
        let mut modules = Vec::new();

        for entry in entries {
            match entry {
                LedgerEntry::Filter { event, handler } => {
                    bus.off_filter(&event, &handler).await;
                }
                LedgerEntry::Action { event, handler } => {
                    bus.off_action(&event, &handler).await;
                }
                LedgerEntry::Init { event, handler } => {
                    bus.off_init(&event, &handler).await;
                }
                LedgerEntry::Schedule { job } => jobs.push(job),
                LedgerEntry::LoadedModule { path } => modules.push(path),
            }
        }

        let stops = join_all(jobs.iter().map(|job| job.stop())).await;
        for (job, result) in jobs.iter().zip(stops) {
            if let Err(e) = result {
                error!(job = %job.key(), error = %e, "Failed to stop scheduled job");
            }
        }

        let routes = self.collaborators.router.clear().await;
        self.collaborators.flows.clear_operations().await;

        for path in &modules {
            self.collaborators.loader.evict(path).await;
        }

        info!(
            recorded,
            jobs = jobs.len(),
            routes,
            modules = modules.len(),
            "API extensions unregistered"
        );
    }

    async fn register_kind(&mut self, kind: ExtensionKind) -> RegistrationSummary {
        let extensions: Vec<Extension> = self
            .collaborators
            .source
            .enabled_extensions()
            .await
            .into_iter()
            .filter(|e| e.kind == kind)
            .collect();

        let mut summary = RegistrationSummary::new(kind);

        for extension in &extensions {
            match self.register_extension(extension).await {
                Ok(Outcome::Loaded) => summary.loaded += 1,
                Ok(Outcome::Sandboxed) => summary.sandboxed += 1,
                Err(e) => {
                    summary.failed += 1;
                    warn!(
                        extension = %extension.name,
                        kind = %kind,
                        error = %e,
                        "Couldn't register {kind} \"{}\"",
                        extension.name
                    );
                }
            }
        }

        info!(
            kind = %kind,
            loaded = summary.loaded,
            sandboxed = summary.sandboxed,
            failed = summary.failed,
            "Extensions registered"
        );
        summary
    }

    async fn register_extension(&mut self, extension: &Extension) -> AppResult<Outcome> {
        let entrypoint = extension.resolved_api_entrypoint().ok_or_else(|| {
            AppError::extension(format!("Extension '{}' has no server-side entrypoint", extension.name))
        })?;

        if !extension.trusted {
            self.collaborators
                .sandbox
                .run_extension(extension, &entrypoint)
                .await?;
            return Ok(Outcome::Sandboxed);
        }

        let exports = self.collaborators.loader.import(&entrypoint).await?;
        self.ledger.record(LedgerEntry::LoadedModule {
            path: normalize_path(&entrypoint),
        });

        let module = exports.into_default().ok_or_else(|| {
            AppError::extension(format!("'{}' has no default export", entrypoint.display()))
        })?;

        let name = extension.name.as_str();
        match (extension.kind, module) {
            (ExtensionKind::Hook, ExtensionModule::Hook(register)) => {
                register_hook(&self.collaborators, &mut self.ledger, register.as_ref(), name).await?;
            }
            (ExtensionKind::Endpoint, ExtensionModule::Endpoint(config)) => {
                register_endpoint(&self.collaborators, &config, name).await?;
            }
            (ExtensionKind::Operation, ExtensionModule::Operation(config)) => {
                register_operation(&self.collaborators, &config).await;
            }
            (ExtensionKind::Bundle, ExtensionModule::Bundle(config)) => {
                register_bundle(&self.collaborators, &mut self.ledger, &config, name).await?;
            }
            (kind, module) => {
                return Err(AppError::extension(format!(
                    "Expected a {kind} export, found a {} export",
                    module.shape()
                )));
            }
        }

        Ok(Outcome::Loaded)
    }
}
