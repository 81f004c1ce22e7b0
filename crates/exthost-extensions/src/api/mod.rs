//! Extension API: context and services exposed to extension code.

pub mod context;
pub mod logger;
pub mod services;

pub use context::{ExtensionContext, HostResources};
pub use logger::ExtensionLogger;
pub use services::{Env, ExtensionDatabase, NoDatabase, SchemaProvider, ServiceRegistry, StaticSchema};
