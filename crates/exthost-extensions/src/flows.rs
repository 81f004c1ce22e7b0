//! Workflow engine operation registry.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info};

use exthost_core::{AppError, AppResult};

use crate::api::context::HostResources;
use crate::module::{OperationContext, OperationHandler};

/// Operation registration interface of the workflow engine.
#[async_trait]
pub trait OperationRegistry: Send + Sync {
    /// Registers `handler` under `id`, replacing any previous registration.
    async fn add_operation(&self, id: &str, handler: Arc<dyn OperationHandler>);

    /// Removes every registered operation.
    async fn clear_operations(&self);
}

/// In-process workflow engine.
pub struct FlowManager {
    operations: RwLock<HashMap<String, Arc<dyn OperationHandler>>>,
    resources: HostResources,
}

impl fmt::Debug for FlowManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlowManager").finish_non_exhaustive()
    }
}

impl FlowManager {
    /// Creates an engine that hands `resources` to running operations.
    pub fn new(resources: HostResources) -> Self {
        Self {
            operations: RwLock::new(HashMap::new()),
            resources,
        }
    }

    /// Runs the operation registered under `id`.
    pub async fn run_operation(&self, id: &str, options: Value, data: Value) -> AppResult<Value> {
        let handler = self
            .operations
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("Operation '{id}' is not registered")))?;

        debug!(operation = %id, "Running operation");

        let ctx = OperationContext {
            data,
            extension: self.resources.context_for(id),
        };
        handler.run(options, ctx).await
    }

    /// Returns whether an operation is registered under `id`.
    pub async fn has_operation(&self, id: &str) -> bool {
        self.operations.read().await.contains_key(id)
    }

    /// Registered operation ids, sorted.
    pub async fn operation_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.operations.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }
}

#[async_trait]
impl OperationRegistry for FlowManager {
    async fn add_operation(&self, id: &str, handler: Arc<dyn OperationHandler>) {
        if self
            .operations
            .write()
            .await
            .insert(id.to_string(), handler)
            .is_some()
        {
            debug!(operation = %id, "Operation replaced");
        }
    }

    async fn clear_operations(&self) {
        let mut operations = self.operations.write().await;
        let count = operations.len();
        operations.clear();
        info!(count, "Operations cleared");
    }
}
