//! Operation registrar.

use std::sync::Arc;

use tracing::debug;

use crate::module::OperationConfig;

use super::Collaborators;

/// Registers the operation with the workflow engine under its id.
pub async fn register_operation(collaborators: &Collaborators, config: &OperationConfig) {
    collaborators
        .flows
        .add_operation(&config.id, Arc::clone(&config.handler))
        .await;
    debug!(operation = %config.id, "Operation registered");
}
