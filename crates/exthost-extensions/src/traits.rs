//! Closure-based handlers for quick handler creation.
//!
//! Closures receive owned copies of the payload and metadata so the returned
//! futures can be `'static`.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;

use exthost_core::AppResult;

use crate::emitter::handlers::{ActionHandler, EventMeta, FilterHandler, InitHandler, ScheduleHandler};

type FilterClosure = dyn Fn(Value, EventMeta) -> BoxFuture<'static, AppResult<Value>> + Send + Sync;
type MetaClosure = dyn Fn(EventMeta) -> BoxFuture<'static, AppResult<()>> + Send + Sync;
type TickClosure = dyn Fn() -> BoxFuture<'static, AppResult<()>> + Send + Sync;

/// A closure-based filter handler.
pub struct FilterFn {
    handler: Box<FilterClosure>,
}

impl FilterFn {
    /// Wraps a closure.
    pub fn new<F, Fut>(handler: F) -> Self
    where
        F: Fn(Value, EventMeta) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AppResult<Value>> + Send + 'static,
    {
        Self {
            handler: Box::new(move |payload, meta| Box::pin(handler(payload, meta))),
        }
    }
}

impl fmt::Debug for FilterFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterFn").field("handler", &"<closure>").finish()
    }
}

#[async_trait]
impl FilterHandler for FilterFn {
    async fn handle(&self, payload: Value, meta: &EventMeta) -> AppResult<Value> {
        (self.handler)(payload, meta.clone()).await
    }
}

/// A closure-based action or init handler.
pub struct MetaFn {
    handler: Box<MetaClosure>,
}

impl MetaFn {
    /// Wraps a closure.
    pub fn new<F, Fut>(handler: F) -> Self
    where
        F: Fn(EventMeta) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AppResult<()>> + Send + 'static,
    {
        Self {
            handler: Box::new(move |meta| Box::pin(handler(meta))),
        }
    }
}

impl fmt::Debug for MetaFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetaFn").field("handler", &"<closure>").finish()
    }
}

#[async_trait]
impl ActionHandler for MetaFn {
    async fn handle(&self, meta: &EventMeta) -> AppResult<()> {
        (self.handler)(meta.clone()).await
    }
}

#[async_trait]
impl InitHandler for MetaFn {
    async fn handle(&self, meta: &EventMeta) -> AppResult<()> {
        (self.handler)(meta.clone()).await
    }
}

/// A closure-based schedule handler.
pub struct TickFn {
    handler: Box<TickClosure>,
}

impl TickFn {
    /// Wraps a closure.
    pub fn new<F, Fut>(handler: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AppResult<()>> + Send + 'static,
    {
        Self {
            handler: Box::new(move || Box::pin(handler())),
        }
    }
}

impl fmt::Debug for TickFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TickFn").field("handler", &"<closure>").finish()
    }
}

#[async_trait]
impl ScheduleHandler for TickFn {
    async fn run(&self) -> AppResult<()> {
        (self.handler)().await
    }
}

/// Creates a shared filter handler from a closure.
pub fn filter_fn<F, Fut>(handler: F) -> Arc<dyn FilterHandler>
where
    F: Fn(Value, EventMeta) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = AppResult<Value>> + Send + 'static,
{
    Arc::new(FilterFn::new(handler))
}

/// Creates a shared action handler from a closure.
pub fn action_fn<F, Fut>(handler: F) -> Arc<dyn ActionHandler>
where
    F: Fn(EventMeta) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = AppResult<()>> + Send + 'static,
{
    Arc::new(MetaFn::new(handler))
}

/// Creates a shared init handler from a closure.
pub fn init_fn<F, Fut>(handler: F) -> Arc<dyn InitHandler>
where
    F: Fn(EventMeta) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = AppResult<()>> + Send + 'static,
{
    Arc::new(MetaFn::new(handler))
}

/// Creates a shared schedule handler from a closure.
pub fn schedule_fn<F, Fut>(handler: F) -> Arc<dyn ScheduleHandler>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = AppResult<()>> + Send + 'static,
{
    Arc::new(TickFn::new(handler))
}
