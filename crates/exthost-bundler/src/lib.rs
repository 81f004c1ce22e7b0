//! # exthost-bundler
//!
//! Compiles the browser-side code of every enabled app extension into a
//! single ES-module bundle. Dependencies the admin app already ships
//! (`vue`, `pinia`, the SDK) are kept external and pointed at the app's
//! pre-built assets so extensions share one copy at runtime.

pub mod bundler;
pub mod chunker;
pub mod entrypoint;
mod lexer;
pub mod manager;
pub mod shared_deps;
pub mod url;

pub use bundler::{BundleInput, ModuleBundler, OutputChunk};
pub use chunker::{ChunkBundler, ENTRY_CHUNK};
pub use entrypoint::generate_extensions_entrypoint;
pub use manager::AppExtensionBundler;
pub use shared_deps::{SharedDependencyMapping, map_shared_dependencies, scan_shared_dependencies};
pub use url::AssetUrl;
