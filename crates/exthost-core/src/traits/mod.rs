//! Collaborator traits defined in `exthost-core` and implemented elsewhere.

pub mod extension_source;

pub use extension_source::{ExtensionSource, StaticExtensionSource};
