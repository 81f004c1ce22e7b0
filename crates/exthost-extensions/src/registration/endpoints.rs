//! Endpoint registrar.

use std::panic::{AssertUnwindSafe, catch_unwind};

use exthost_core::{AppError, AppResult};

use crate::module::EndpointConfig;
use crate::router::{EndpointRouter, ScopedRouter};

use super::Collaborators;

/// Builds the endpoint's routes on a fresh router and mounts them.
///
/// The mount path is the config's `id`, else the extension name. Nothing is
/// mounted when the handler fails. Returns the mounted prefix.
pub async fn register_endpoint(
    collaborators: &Collaborators,
    config: &EndpointConfig,
    name: &str,
) -> AppResult<String> {
    let mount_path = config.mount_path(name);
    EndpointRouter::normalize_mount_path(mount_path)?;

    let ctx = collaborators.resources.context_for(name);
    let mut scoped = ScopedRouter::new();

    catch_unwind(AssertUnwindSafe(|| config.handler().register(&mut scoped, &ctx))).map_err(|_| {
        AppError::extension(format!("Endpoint '{name}' panicked while building its routes"))
    })??;

    collaborators
        .router
        .mount(name, mount_path, scoped.into_router())
        .await
}
