//! # exthost-extensions
//!
//! Extension registration runtime for exthost. Provides:
//!
//! - Module loading with a path-keyed cache (compiled-in, or `libloading` behind `dynamic`)
//! - Hook, endpoint, operation and bundle registrars
//! - An in-process event emitter with filter/action/init dispatch
//! - A cron scheduler with non-overlapping, key-synchronized jobs
//! - A ledger of every registration side effect, reversed on teardown
//! - The workflow operation registry and built-in operations

pub mod api;
pub mod embeds;
pub mod emitter;
pub mod exports;
pub mod flows;
pub mod ledger;
pub mod loader;
pub mod macros;
pub mod manager;
pub mod module;
pub mod operations;
pub mod prelude;
pub mod registration;
pub mod router;
pub mod sandbox;
pub mod scheduler;
pub mod traits;

pub use api::context::{ExtensionContext, HostResources};
pub use embeds::HookEmbeds;
pub use emitter::{Emitter, EventBus, EventMeta};
pub use flows::{FlowManager, OperationRegistry};
pub use ledger::{Ledger, LedgerEntry};
pub use loader::{ModuleLoader, StaticModuleLoader};
pub use manager::{RegistrationManager, RegistrationSummary};
pub use module::{ExtensionModule, ModuleExports};
pub use registration::Collaborators;
pub use router::EndpointRouter;
pub use sandbox::{DisabledSandbox, Sandbox};
pub use scheduler::{CronScheduler, Scheduler};
