//! Shapes of loaded extension modules and the interfaces their code implements.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;

use exthost_core::AppResult;

use crate::api::context::ExtensionContext;
use crate::embeds::{EmbedContent, EmbedPosition};
use crate::emitter::handlers::{ActionHandler, FilterHandler, InitHandler, ScheduleHandler};
use crate::router::ScopedRouter;

/// The verbs a hook's register function may call.
///
/// A fresh capability object is built for every hook registration; everything
/// it subscribes is recorded for teardown.
#[async_trait]
pub trait HookCapabilities: Send {
    /// Subscribes a payload-transforming handler that runs before `event` completes.
    async fn filter(&mut self, event: &str, handler: Arc<dyn FilterHandler>);

    /// Subscribes a side-effect handler that runs after `event` completed.
    async fn action(&mut self, event: &str, handler: Arc<dyn ActionHandler>);

    /// Subscribes to a process-lifecycle event.
    async fn init(&mut self, event: &str, handler: Arc<dyn InitHandler>);

    /// Runs `handler` on a cron schedule. Invalid expressions are ignored with a warning.
    async fn schedule(&mut self, cron: &str, handler: Arc<dyn ScheduleHandler>);

    /// Contributes markup to the app's `<head>` or `<body>`. Blank content is ignored.
    async fn embed(&mut self, position: EmbedPosition, content: EmbedContent);
}

/// Register function exported by a hook extension.
#[async_trait]
pub trait HookRegister: Send + Sync {
    /// Called exactly once per registration pass.
    async fn register(&self, hooks: &mut dyn HookCapabilities, ctx: &ExtensionContext) -> AppResult<()>;
}

type HookClosure = dyn for<'a> Fn(&'a mut dyn HookCapabilities, &'a ExtensionContext) -> BoxFuture<'a, AppResult<()>>
    + Send
    + Sync;

/// A closure-based hook register function.
pub struct HookFn {
    register: Box<HookClosure>,
}

impl fmt::Debug for HookFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookFn").field("register", &"<closure>").finish()
    }
}

#[async_trait]
impl HookRegister for HookFn {
    async fn register(&self, hooks: &mut dyn HookCapabilities, ctx: &ExtensionContext) -> AppResult<()> {
        (self.register)(hooks, ctx).await
    }
}

/// Creates a hook register function from a closure returning a boxed future.
pub fn hook_fn<F>(register: F) -> Arc<dyn HookRegister>
where
    F: for<'a> Fn(&'a mut dyn HookCapabilities, &'a ExtensionContext) -> BoxFuture<'a, AppResult<()>>
        + Send
        + Sync
        + 'static,
{
    Arc::new(HookFn {
        register: Box::new(register),
    })
}

/// Builds an endpoint's routes. Receives a fresh router scoped to the mount path.
pub trait EndpointHandler: Send + Sync {
    /// Adds routes to `router`.
    fn register(&self, router: &mut ScopedRouter, ctx: &ExtensionContext) -> AppResult<()>;
}

struct EndpointFn<F> {
    register: F,
}

impl<F> EndpointHandler for EndpointFn<F>
where
    F: Fn(&mut ScopedRouter, &ExtensionContext) -> AppResult<()> + Send + Sync,
{
    fn register(&self, router: &mut ScopedRouter, ctx: &ExtensionContext) -> AppResult<()> {
        (self.register)(router, ctx)
    }
}

/// Creates an endpoint handler from a closure.
pub fn endpoint_fn<F>(register: F) -> Arc<dyn EndpointHandler>
where
    F: Fn(&mut ScopedRouter, &ExtensionContext) -> AppResult<()> + Send + Sync + 'static,
{
    Arc::new(EndpointFn { register })
}

/// Export of an endpoint extension.
#[derive(Clone)]
pub enum EndpointConfig {
    /// Bare handler, mounted under the extension name.
    Handler(Arc<dyn EndpointHandler>),
    /// Handler with an explicit mount path.
    WithId {
        /// Mount path, without the leading slash.
        id: String,
        /// Route builder.
        handler: Arc<dyn EndpointHandler>,
    },
}

impl EndpointConfig {
    /// Mount path for an extension of the given name.
    pub fn mount_path<'a>(&'a self, extension: &'a str) -> &'a str {
        match self {
            Self::Handler(_) => extension,
            Self::WithId { id, .. } => id,
        }
    }

    /// The route builder.
    pub fn handler(&self) -> &Arc<dyn EndpointHandler> {
        match self {
            Self::Handler(handler) | Self::WithId { handler, .. } => handler,
        }
    }
}

impl fmt::Debug for EndpointConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Handler(_) => f.write_str("EndpointConfig::Handler"),
            Self::WithId { id, .. } => f.debug_struct("EndpointConfig::WithId").field("id", id).finish(),
        }
    }
}

/// Runtime context of an operation invocation.
#[derive(Debug, Clone)]
pub struct OperationContext {
    /// Data accumulated by the running flow.
    pub data: Value,
    /// Host resources.
    pub extension: ExtensionContext,
}

/// Handler of a workflow operation.
#[async_trait]
pub trait OperationHandler: Send + Sync {
    /// Runs the operation with its configured options.
    async fn run(&self, options: Value, ctx: OperationContext) -> AppResult<Value>;
}

type OperationClosure = dyn Fn(Value, OperationContext) -> BoxFuture<'static, AppResult<Value>> + Send + Sync;

/// A closure-based operation handler.
pub struct OperationFn {
    handler: Box<OperationClosure>,
}

impl fmt::Debug for OperationFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationFn").field("handler", &"<closure>").finish()
    }
}

#[async_trait]
impl OperationHandler for OperationFn {
    async fn run(&self, options: Value, ctx: OperationContext) -> AppResult<Value> {
        (self.handler)(options, ctx).await
    }
}

/// Creates an operation handler from a closure.
pub fn operation_fn<F, Fut>(handler: F) -> Arc<dyn OperationHandler>
where
    F: Fn(Value, OperationContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = AppResult<Value>> + Send + 'static,
{
    Arc::new(OperationFn {
        handler: Box::new(move |options, ctx| Box::pin(handler(options, ctx))),
    })
}

/// Export of an operation extension.
#[derive(Clone)]
pub struct OperationConfig {
    /// Operation id in the workflow engine.
    pub id: String,
    /// Operation body.
    pub handler: Arc<dyn OperationHandler>,
}

impl OperationConfig {
    /// Creates an operation config.
    pub fn new(id: impl Into<String>, handler: Arc<dyn OperationHandler>) -> Self {
        Self { id: id.into(), handler }
    }
}

impl fmt::Debug for OperationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationConfig").field("id", &self.id).finish_non_exhaustive()
    }
}

/// A named entry of a bundle.
#[derive(Clone)]
pub struct BundleEntry<T> {
    /// Name of the bundled extension.
    pub name: String,
    /// Its export.
    pub config: T,
}

impl<T> fmt::Debug for BundleEntry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BundleEntry").field("name", &self.name).finish_non_exhaustive()
    }
}

/// Export of a bundle extension.
#[derive(Debug, Clone, Default)]
pub struct BundleConfig {
    pub hooks: Vec<BundleEntry<Arc<dyn HookRegister>>>,
    pub endpoints: Vec<BundleEntry<EndpointConfig>>,
    pub operations: Vec<BundleEntry<OperationConfig>>,
}

/// The exported configuration of a loaded module.
#[derive(Clone)]
pub enum ExtensionModule {
    Hook(Arc<dyn HookRegister>),
    Endpoint(EndpointConfig),
    Operation(OperationConfig),
    Bundle(BundleConfig),
}

impl ExtensionModule {
    /// Short name of the export shape.
    pub fn shape(&self) -> &'static str {
        match self {
            Self::Hook(_) => "hook",
            Self::Endpoint(_) => "endpoint",
            Self::Operation(_) => "operation",
            Self::Bundle(_) => "bundle",
        }
    }
}

impl fmt::Debug for ExtensionModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hook(_) => f.write_str("ExtensionModule::Hook"),
            Self::Endpoint(config) => f.debug_tuple("ExtensionModule::Endpoint").field(config).finish(),
            Self::Operation(config) => f.debug_tuple("ExtensionModule::Operation").field(config).finish(),
            Self::Bundle(config) => f.debug_tuple("ExtensionModule::Bundle").field(config).finish(),
        }
    }
}

/// Everything a module exports.
#[derive(Debug, Clone, Default)]
pub struct ModuleExports {
    default: Option<ExtensionModule>,
    named: HashMap<String, ExtensionModule>,
}

impl ModuleExports {
    /// Exports with a bare default export.
    pub fn with_default(module: ExtensionModule) -> Self {
        Self {
            default: Some(module),
            named: HashMap::new(),
        }
    }

    /// Adds a named export.
    pub fn named(mut self, name: impl Into<String>, module: ExtensionModule) -> Self {
        self.named.insert(name.into(), module);
        self
    }

    /// The configuration to register: the default export, else the export named `default`.
    pub fn into_default(mut self) -> Option<ExtensionModule> {
        self.default.take().or_else(|| self.named.remove("default"))
    }
}
