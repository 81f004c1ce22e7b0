//! Isolation collaborator for untrusted extensions.

use std::path::Path;

use async_trait::async_trait;

use exthost_core::types::extension::Extension;
use exthost_core::{AppError, AppResult};

/// Runs untrusted extensions outside the host process.
#[async_trait]
pub trait Sandbox: Send + Sync {
    /// Starts `extension` from its resolved server-side entrypoint.
    async fn run_extension(&self, extension: &Extension, entrypoint: &Path) -> AppResult<()>;
}

/// Sandbox for hosts without an isolation engine. Refuses every extension.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledSandbox;

#[async_trait]
impl Sandbox for DisabledSandbox {
    async fn run_extension(&self, extension: &Extension, entrypoint: &Path) -> AppResult<()> {
        Err(AppError::extension(format!(
            "Extension '{}' is not trusted and no sandbox is available to run '{}'",
            extension.name,
            entrypoint.display()
        )))
    }
}
