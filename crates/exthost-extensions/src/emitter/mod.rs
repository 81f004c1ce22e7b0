//! Event emitter: filter/action/init subscriptions and their dispatch.

pub mod dispatcher;
pub mod handlers;
pub mod registry;

pub use handlers::{ActionHandler, EventMeta, FilterHandler, InitHandler, ScheduleHandler};
pub use registry::{Emitter, EventBus, EventKind};
