//! Extension context: host resources available to registration code.

use std::fmt;
use std::sync::Arc;

use crate::emitter::Emitter;

use super::logger::ExtensionLogger;
use super::services::{Env, ExtensionDatabase, NoDatabase, SchemaProvider, ServiceRegistry, StaticSchema};

/// Context passed to every hook, endpoint and operation at registration.
///
/// Cloning is cheap; every resource except the logger is shared.
#[derive(Clone)]
pub struct ExtensionContext {
    /// Named host services.
    pub services: Arc<ServiceRegistry>,
    /// Environment configuration.
    pub env: Arc<Env>,
    /// Database handle.
    pub database: Arc<dyn ExtensionDatabase>,
    /// Host event emitter, for extensions that emit their own events.
    pub emitter: Arc<Emitter>,
    /// Logger stamped with the extension name.
    pub logger: ExtensionLogger,
    /// Schema accessor.
    pub schema: Arc<dyn SchemaProvider>,
}

impl fmt::Debug for ExtensionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionContext")
            .field("extension", &self.logger.extension())
            .finish_non_exhaustive()
    }
}

/// Shared host resources from which per-extension contexts are built.
#[derive(Clone)]
pub struct HostResources {
    pub services: Arc<ServiceRegistry>,
    pub env: Arc<Env>,
    pub database: Arc<dyn ExtensionDatabase>,
    pub emitter: Arc<Emitter>,
    pub schema: Arc<dyn SchemaProvider>,
}

impl fmt::Debug for HostResources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostResources")
            .field("services", &self.services)
            .finish_non_exhaustive()
    }
}

impl HostResources {
    /// Creates resources around the given emitter, with no database and an empty schema.
    pub fn new(emitter: Arc<Emitter>, env: Env) -> Self {
        Self {
            services: Arc::new(ServiceRegistry::new()),
            env: Arc::new(env),
            database: Arc::new(NoDatabase),
            emitter,
            schema: Arc::new(StaticSchema::default()),
        }
    }

    /// Replaces the service registry.
    pub fn with_services(mut self, services: ServiceRegistry) -> Self {
        self.services = Arc::new(services);
        self
    }

    /// Replaces the database handle.
    pub fn with_database(mut self, database: Arc<dyn ExtensionDatabase>) -> Self {
        self.database = database;
        self
    }

    /// Replaces the schema accessor.
    pub fn with_schema(mut self, schema: Arc<dyn SchemaProvider>) -> Self {
        self.schema = schema;
        self
    }

    /// Builds the context handed to the named extension.
    pub fn context_for(&self, extension: &str) -> ExtensionContext {
        ExtensionContext {
            services: Arc::clone(&self.services),
            env: Arc::clone(&self.env),
            database: Arc::clone(&self.database),
            emitter: Arc::clone(&self.emitter),
            logger: ExtensionLogger::new(extension),
            schema: Arc::clone(&self.schema),
        }
    }
}
