//! App extension bundle state.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, warn};

use exthost_core::config::extensions::ExtensionsConfig;
use exthost_core::traits::ExtensionSource;
use exthost_core::AppResult;

use crate::bundler::{BundleInput, ModuleBundler};
use crate::chunker::ChunkBundler;
use crate::entrypoint::generate_extensions_entrypoint;
use crate::shared_deps::scan_shared_dependencies;
use crate::url::AssetUrl;

#[derive(Debug, Default)]
struct BundleState {
    /// Entry chunk code of the last successful bundle.
    entry: Option<String>,
    /// Every chunk of the last successful bundle, by file name.
    chunks: HashMap<String, String>,
}

/// Compiles enabled app extensions into one browser bundle and serves its
/// chunks.
///
/// A failed bundle pass keeps whatever the previous pass produced.
pub struct AppExtensionBundler {
    source: Arc<dyn ExtensionSource>,
    bundler: Arc<dyn ModuleBundler>,
    assets_dir: PathBuf,
    shared_deps: Vec<String>,
    url: AssetUrl,
    state: RwLock<BundleState>,
}

impl std::fmt::Debug for AppExtensionBundler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppExtensionBundler")
            .field("assets_dir", &self.assets_dir)
            .field("shared_deps", &self.shared_deps)
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

impl AppExtensionBundler {
    /// Creates a bundler with explicit collaborators.
    pub fn new(
        source: Arc<dyn ExtensionSource>,
        bundler: Arc<dyn ModuleBundler>,
        assets_dir: impl Into<PathBuf>,
        shared_deps: Vec<String>,
        url: AssetUrl,
    ) -> Self {
        Self {
            source,
            bundler,
            assets_dir: assets_dir.into(),
            shared_deps,
            url,
            state: RwLock::new(BundleState::default()),
        }
    }

    /// Creates a bundler from the extensions configuration, compiling with
    /// [`ChunkBundler`].
    pub fn from_config(config: &ExtensionsConfig, source: Arc<dyn ExtensionSource>) -> AppResult<Self> {
        Ok(Self::new(
            source,
            Arc::new(ChunkBundler::default()),
            &config.app_assets_dir,
            config.shared_deps.clone(),
            AssetUrl::new(&config.public_url)?,
        ))
    }

    /// Bundles every enabled app extension and returns the entry chunk code.
    ///
    /// On success the stored chunks are replaced as a whole. On failure a
    /// warning is logged, `None` is returned and the stored chunks are left
    /// untouched.
    pub async fn generate_extension_bundle(&self) -> Option<String> {
        let extensions = self.source.enabled_extensions().await;
        let mut externals = scan_shared_dependencies(&self.assets_dir, &self.shared_deps, &self.url).await;
        // Unmapped shared deps stay bare imports and fail in the browser, not here.
        for dependency in &self.shared_deps {
            externals
                .entry(dependency.clone())
                .or_insert_with(|| dependency.clone());
        }
        let input = BundleInput {
            entry: generate_extensions_entrypoint(&extensions),
            externals,
        };

        let output = match self.bundler.bundle(&input).await {
            Ok(output) => output,
            Err(e) => {
                warn!(error = %e, "Couldn't bundle App extensions");
                return None;
            }
        };

        let mut entry = None;
        let mut chunks = HashMap::with_capacity(output.len());
        for chunk in output {
            if chunk.is_entry && entry.is_none() {
                entry = Some(chunk.code.clone());
            }
            chunks.insert(chunk.file_name, chunk.code);
        }

        let Some(entry) = entry else {
            warn!("Couldn't bundle App extensions: bundler produced no entry chunk");
            return None;
        };

        info!(chunks = chunks.len(), externals = input.externals.len(), "App extensions bundled");
        *self.state.write().await = BundleState {
            entry: Some(entry.clone()),
            chunks,
        };
        Some(entry)
    }

    /// Returns the code of a chunk produced by the last successful bundle.
    pub async fn get_app_extension_chunk(&self, name: &str) -> Option<String> {
        self.state.read().await.chunks.get(name).cloned()
    }

    /// Returns the entry chunk code produced by the last successful bundle.
    pub async fn app_extensions(&self) -> Option<String> {
        self.state.read().await.entry.clone()
    }

    /// Names of the chunks currently stored, sorted.
    pub async fn chunk_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.state.read().await.chunks.keys().cloned().collect();
        names.sort();
        names
    }
}
