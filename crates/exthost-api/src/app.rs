//! Application builder: wires collaborators, registers extensions and serves.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Instant;

use axum::Router;
use serde_json::json;
use tokio::sync::Mutex;

use exthost_bundler::AppExtensionBundler;
use exthost_core::config::AppConfig;
use exthost_core::error::AppError;
use exthost_core::traits::{ExtensionSource, StaticExtensionSource};
use exthost_extensions::api::services::Env;
use exthost_extensions::{
    Collaborators, CronScheduler, DisabledSandbox, Emitter, EndpointRouter, EventMeta, FlowManager, HookEmbeds,
    HostResources, ModuleLoader, RegistrationManager, Sandbox, Scheduler,
};

use crate::router::build_router;
use crate::state::AppState;

/// Collaborators that differ between deployments and tests.
pub struct HostParts {
    /// Supplies enabled extension records.
    pub source: Arc<dyn ExtensionSource>,
    /// Imports extension modules.
    pub loader: Arc<dyn ModuleLoader>,
    /// Runs untrusted extensions.
    pub sandbox: Arc<dyn Sandbox>,
    /// Runs `schedule` hooks.
    pub scheduler: Arc<dyn Scheduler>,
}

impl HostParts {
    /// Parts for a served host: extensions from `config.extensions.installed`,
    /// the given loader and scheduler, and the disabled sandbox.
    pub fn from_config(config: &AppConfig, loader: Arc<dyn ModuleLoader>, scheduler: Arc<dyn Scheduler>) -> Self {
        Self {
            source: Arc::new(StaticExtensionSource::new(config.extensions.installed.clone())),
            loader,
            sandbox: Arc::new(DisabledSandbox),
            scheduler,
        }
    }
}

/// Builds the complete Axum application with all routes and middleware.
pub fn build_app(state: AppState) -> Router {
    build_router(state)
}

/// Wires the host, registers every API extension and compiles the app bundle.
///
/// Fires the `app.before` init event once registration is done.
pub async fn bootstrap(config: AppConfig, parts: HostParts) -> Result<AppState, AppError> {
    let emitter = Arc::new(Emitter::new());
    let resources = HostResources::new(Arc::clone(&emitter), Env::new(config.extensions.env.clone()));
    let flows = Arc::new(FlowManager::new(resources.clone()));
    let router = Arc::new(EndpointRouter::new());
    let embeds = Arc::new(HookEmbeds::new());

    let collaborators = Collaborators {
        source: Arc::clone(&parts.source),
        loader: parts.loader,
        sandbox: parts.sandbox,
        bus: emitter.clone(),
        scheduler: parts.scheduler,
        flows: flows.clone(),
        router: Arc::clone(&router),
        embeds: Arc::clone(&embeds),
        resources,
        schedule_enabled: Arc::new(AtomicBool::new(config.extensions.schedule)),
    };

    let mut manager = RegistrationManager::new(collaborators);
    for summary in manager.register_api_extensions().await {
        if summary.failed > 0 {
            tracing::warn!(kind = %summary.kind, failed = summary.failed, "Some extensions failed to register");
        }
    }

    let bundler = Arc::new(AppExtensionBundler::from_config(&config.extensions, parts.source)?);
    if bundler.generate_extension_bundle().await.is_none() {
        tracing::warn!("Serving without an app extensions bundle");
    }

    emitter
        .emit_init("app.before", &EventMeta::new("app.before"))
        .await;

    Ok(AppState {
        config: Arc::new(config),
        started_at: Instant::now(),
        manager: Arc::new(Mutex::new(manager)),
        router,
        embeds,
        emitter,
        flows,
        bundler,
    })
}

/// Loader for this build: shared libraries when `dynamic` is enabled,
/// otherwise an empty static loader.
pub fn default_loader() -> Arc<dyn ModuleLoader> {
    #[cfg(feature = "dynamic")]
    {
        Arc::new(exthost_extensions::loader::dynamic_loader::DynamicModuleLoader::new())
    }
    #[cfg(not(feature = "dynamic"))]
    {
        Arc::new(exthost_extensions::StaticModuleLoader::new())
    }
}

/// Runs the exthost server with the given configuration and [`default_loader`].
pub async fn run_server(config: AppConfig) -> Result<(), AppError> {
    run_server_with_loader(config, default_loader()).await
}

/// Runs the exthost server, importing API extensions through `loader`.
///
/// Embedders with compiled-in extensions pass a populated
/// [`StaticModuleLoader`](exthost_extensions::StaticModuleLoader).
pub async fn run_server_with_loader(config: AppConfig, loader: Arc<dyn ModuleLoader>) -> Result<(), AppError> {
    tracing::info!(installed = config.extensions.installed.len(), "Starting exthost server...");

    let scheduler = Arc::new(CronScheduler::new().await?);
    scheduler.start().await?;

    let parts = HostParts::from_config(&config, loader, scheduler.clone());

    let state = bootstrap(config, parts).await?;
    let app = build_app(state.clone());

    let addr = state.config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;

    tracing::info!("exthost server listening on {}", addr);

    state
        .emitter
        .emit_init("app.after", &EventMeta::new("app.after").with_data("address", json!(addr)))
        .await;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::internal(format!("Server error: {e}")))?;

    state.manager.lock().await.unregister_api_extensions().await;
    scheduler.shutdown().await?;

    tracing::info!("exthost server stopped");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown...");
}
