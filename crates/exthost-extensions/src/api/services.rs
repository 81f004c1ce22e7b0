//! Host services handed to extensions through their context.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use exthost_core::{AppError, AppResult};

/// Named host services, looked up by extensions at registration time.
#[derive(Default)]
pub struct ServiceRegistry {
    services: HashMap<String, Arc<dyn Any + Send + Sync>>,
}

impl fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.services.keys().collect();
        names.sort();
        f.debug_struct("ServiceRegistry").field("services", &names).finish()
    }
}

impl ServiceRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a service under `name`, replacing any previous one.
    pub fn register<T: Any + Send + Sync>(&mut self, name: impl Into<String>, service: Arc<T>) {
        self.services.insert(name.into(), service);
    }

    /// Looks up a service by name and concrete type.
    pub fn get<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        self.services
            .get(name)
            .cloned()
            .and_then(|service| service.downcast::<T>().ok())
    }

    /// Returns whether a service is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.services.contains_key(name)
    }
}

/// Environment configuration visible to extensions.
#[derive(Debug, Clone, Default)]
pub struct Env {
    values: HashMap<String, String>,
}

impl Env {
    /// Creates an environment from key/value pairs.
    pub fn new(values: HashMap<String, String>) -> Self {
        Self { values }
    }

    /// Returns the value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Returns the value for `key`, or `default`.
    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }
}

/// Database access available to extensions.
#[async_trait]
pub trait ExtensionDatabase: Send + Sync {
    /// Runs a named query with JSON parameters.
    async fn query(&self, query: &str, params: Value) -> AppResult<Value>;
}

/// Database handle for hosts without a database.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDatabase;

#[async_trait]
impl ExtensionDatabase for NoDatabase {
    async fn query(&self, query: &str, _params: Value) -> AppResult<Value> {
        Err(AppError::service_unavailable(format!(
            "No database configured, cannot run '{query}'"
        )))
    }
}

/// Schema accessor available to extensions.
#[async_trait]
pub trait SchemaProvider: Send + Sync {
    /// Returns the current schema snapshot.
    async fn schema(&self) -> AppResult<Value>;
}

/// Schema provider returning a fixed snapshot.
#[derive(Debug, Clone, Default)]
pub struct StaticSchema {
    snapshot: Value,
}

impl StaticSchema {
    /// Creates a provider for the given snapshot.
    pub fn new(snapshot: Value) -> Self {
        Self { snapshot }
    }
}

#[async_trait]
impl SchemaProvider for StaticSchema {
    async fn schema(&self) -> AppResult<Value> {
        Ok(self.snapshot.clone())
    }
}
