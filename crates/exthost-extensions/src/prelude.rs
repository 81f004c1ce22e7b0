//! Prelude for extension authors.

pub use async_trait::async_trait;

pub use crate::api::context::ExtensionContext;
pub use crate::api::logger::ExtensionLogger;
pub use crate::embeds::{EmbedContent, EmbedPosition};
pub use crate::emitter::handlers::{ActionHandler, EventMeta, FilterHandler, InitHandler, ScheduleHandler};
pub use crate::module::{
    BundleConfig, EndpointConfig, EndpointHandler, ExtensionModule, HookCapabilities, HookRegister, ModuleExports,
    OperationConfig, OperationContext, OperationHandler, endpoint_fn, hook_fn, operation_fn,
};
pub use crate::router::ScopedRouter;
pub use crate::traits::{action_fn, filter_fn, init_fn, schedule_fn};

pub use crate::{event_meta, export_extension};
