//! Bundle registrar: fans a bundle out to the other registrars.

use tracing::debug;

use exthost_core::AppResult;

use crate::ledger::Ledger;
use crate::module::BundleConfig;

use super::{Collaborators, register_endpoint, register_hook, register_operation};

/// Registers a bundle's hooks, then its endpoints, then its operations.
///
/// The first failure stops the bundle; entries registered before it stay.
pub async fn register_bundle(
    collaborators: &Collaborators,
    ledger: &mut Ledger,
    bundle: &BundleConfig,
    name: &str,
) -> AppResult<()> {
    for hook in &bundle.hooks {
        register_hook(collaborators, ledger, hook.config.as_ref(), &hook.name).await?;
    }

    for endpoint in &bundle.endpoints {
        register_endpoint(collaborators, &endpoint.config, &endpoint.name).await?;
    }

    for operation in &bundle.operations {
        register_operation(collaborators, &operation.config).await;
    }

    debug!(
        extension = %name,
        hooks = bundle.hooks.len(),
        endpoints = bundle.endpoints.len(),
        operations = bundle.operations.len(),
        "Bundle registered"
    );
    Ok(())
}
