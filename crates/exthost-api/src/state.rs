//! Application state shared across all handlers and middleware.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Mutex;

use exthost_bundler::AppExtensionBundler;
use exthost_core::config::AppConfig;
use exthost_extensions::{Emitter, EndpointRouter, FlowManager, HookEmbeds, RegistrationManager};

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
/// All fields are `Arc`-wrapped for cheap cloning across tasks.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Process start, for uptime reporting
    pub started_at: Instant,

    /// Registration lifecycle; locked for whole passes
    pub manager: Arc<Mutex<RegistrationManager>>,
    /// Routes mounted by endpoint extensions
    pub router: Arc<EndpointRouter>,
    /// Markup contributed by hook extensions
    pub embeds: Arc<HookEmbeds>,
    /// Host event bus
    pub emitter: Arc<Emitter>,
    /// Workflow operations
    pub flows: Arc<FlowManager>,
    /// Compiled app extension bundle
    pub bundler: Arc<AppExtensionBundler>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("server", &self.config.server)
            .field("router", &self.router)
            .finish_non_exhaustive()
    }
}
