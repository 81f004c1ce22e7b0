//! Module bundler collaborator.

use async_trait::async_trait;

use exthost_core::AppResult;

use crate::shared_deps::SharedDependencyMapping;

/// What to bundle.
#[derive(Debug, Clone, Default)]
pub struct BundleInput {
    /// Source of the virtual entry module.
    pub entry: String,
    /// Bare specifiers left external and rewritten to the mapped URL.
    pub externals: SharedDependencyMapping,
}

/// One emitted chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputChunk {
    /// File name the chunk is served under.
    pub file_name: String,
    /// Generated ES module source.
    pub code: String,
    /// Whether this is the entry chunk.
    pub is_entry: bool,
}

/// Compiles an entry module and its imports into ES-module chunks.
///
/// The entry chunk comes first in the returned list.
#[async_trait]
pub trait ModuleBundler: Send + Sync {
    /// Bundles `input`.
    async fn bundle(&self, input: &BundleInput) -> AppResult<Vec<OutputChunk>>;
}
