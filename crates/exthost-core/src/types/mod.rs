//! Core type definitions used across the exthost workspace.

pub mod extension;
pub mod path;

pub use extension::{Entrypoint, Extension, ExtensionKind};
pub use path::normalize_path;
