//! Module loaders: turn an entrypoint path into the module's exports, with a cache.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use exthost_core::types::normalize_path;
use exthost_core::{AppError, AppResult};

use crate::module::ModuleExports;

/// Loads extension modules and caches them by resolved path.
#[async_trait]
pub trait ModuleLoader: Send + Sync {
    /// Returns the exports of the module at `path`, loading it on a cache miss.
    async fn import(&self, path: &Path) -> AppResult<ModuleExports>;

    /// Drops the cached module at `path`. Returns whether one was cached.
    async fn evict(&self, path: &Path) -> bool;
}

type ModuleFactory = dyn Fn() -> AppResult<ModuleExports> + Send + Sync;

/// Loader for modules compiled into the host binary.
///
/// Each path maps to a factory; a cache miss runs the factory again, so an
/// evicted module comes back as a fresh instance.
#[derive(Default)]
pub struct StaticModuleLoader {
    factories: HashMap<PathBuf, Arc<ModuleFactory>>,
    cache: RwLock<HashMap<PathBuf, ModuleExports>>,
}

impl fmt::Debug for StaticModuleLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticModuleLoader")
            .field("modules", &self.factories.len())
            .finish_non_exhaustive()
    }
}

impl StaticModuleLoader {
    /// Creates a loader with no modules.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the factory for the module at `path`.
    pub fn register<F>(&mut self, path: impl AsRef<Path>, factory: F)
    where
        F: Fn() -> AppResult<ModuleExports> + Send + Sync + 'static,
    {
        self.factories
            .insert(normalize_path(path.as_ref()), Arc::new(factory));
    }

    /// Builder form of [`register`](Self::register).
    pub fn with_module<F>(mut self, path: impl AsRef<Path>, factory: F) -> Self
    where
        F: Fn() -> AppResult<ModuleExports> + Send + Sync + 'static,
    {
        self.register(path, factory);
        self
    }

    /// Number of cached modules.
    pub async fn cached(&self) -> usize {
        self.cache.read().await.len()
    }
}

#[async_trait]
impl ModuleLoader for StaticModuleLoader {
    async fn import(&self, path: &Path) -> AppResult<ModuleExports> {
        let key = normalize_path(path);

        if let Some(exports) = self.cache.read().await.get(&key) {
            return Ok(exports.clone());
        }

        let factory = self.factories.get(&key).ok_or_else(|| {
            AppError::extension(format!("No module found at '{}'", key.display()))
        })?;

        let exports = factory()?;
        self.cache.write().await.insert(key.clone(), exports.clone());

        debug!(path = %key.display(), "Module instantiated");
        Ok(exports)
    }

    async fn evict(&self, path: &Path) -> bool {
        self.cache.write().await.remove(&normalize_path(path)).is_some()
    }
}

#[cfg(feature = "dynamic")]
pub mod dynamic_loader {
    use tracing::info;

    use super::*;

    /// Entry symbol exported by extension libraries, see [`export_extension!`](crate::export_extension).
    pub const ENTRY_SYMBOL: &[u8] = b"exthost_extension_module";

    /// Signature of the entry symbol. Returns a leaked `Box<ModuleExports>`.
    pub type ModuleEntryFn = unsafe extern "C" fn() -> *mut ModuleExports;

    struct LoadedLibrary {
        // Dropped before the library that holds its code.
        exports: ModuleExports,
        _library: libloading::Library,
    }

    /// Libraries by path, plus every library evicted so far.
    ///
    /// Handlers cloned out of a library (emit snapshots, mounted routers,
    /// in-flight operations, scheduler closures) can outlive its eviction, so
    /// an evicted library is retired rather than dropped and stays mapped
    /// until the process exits.
    pub(crate) struct LibraryTable<L> {
        live: HashMap<PathBuf, L>,
        retired: Vec<L>,
    }

    impl<L> Default for LibraryTable<L> {
        fn default() -> Self {
            Self {
                live: HashMap::new(),
                retired: Vec::new(),
            }
        }
    }

    impl<L> LibraryTable<L> {
        pub(crate) fn get(&self, key: &Path) -> Option<&L> {
            self.live.get(key)
        }

        pub(crate) fn insert(&mut self, key: PathBuf, library: L) {
            if let Some(previous) = self.live.insert(key, library) {
                self.retired.push(previous);
            }
        }

        /// Moves the library at `key` to the retired list.
        pub(crate) fn retire(&mut self, key: &Path) -> bool {
            match self.live.remove(key) {
                Some(library) => {
                    self.retired.push(library);
                    true
                }
                None => false,
            }
        }

        pub(crate) fn retired(&self) -> usize {
            self.retired.len()
        }
    }

    /// Loads extension modules from shared libraries (.so / .dll / .dylib).
    ///
    /// Eviction retires a library instead of unloading it, so the platform
    /// loader hands back the same code on the next import of that path. A
    /// rebuilt library is picked up by installing it under a new path.
    #[derive(Default)]
    pub struct DynamicModuleLoader {
        libraries: RwLock<LibraryTable<LoadedLibrary>>,
    }

    impl DynamicModuleLoader {
        /// Creates an empty loader.
        pub fn new() -> Self {
            Self::default()
        }

        fn load(path: &Path) -> AppResult<LoadedLibrary> {
            // SAFETY: loading runs the library's initializers; only trusted
            // extensions reach the in-process loader.
            let library = unsafe { libloading::Library::new(path) }.map_err(|e| {
                AppError::extension(format!(
                    "Failed to load extension library '{}': {e}",
                    path.display()
                ))
            })?;

            // SAFETY: the symbol type matches the one `export_extension!` emits.
            let exports = unsafe {
                let entry: libloading::Symbol<ModuleEntryFn> =
                    library.get(ENTRY_SYMBOL).map_err(|e| {
                        AppError::extension(format!(
                            "Extension library '{}' has no entry symbol: {e}",
                            path.display()
                        ))
                    })?;
                let raw = entry();
                if raw.is_null() {
                    return Err(AppError::extension(format!(
                        "Extension library '{}' returned no exports",
                        path.display()
                    )));
                }
                *Box::from_raw(raw)
            };

            Ok(LoadedLibrary {
                exports,
                _library: library,
            })
        }
    }

    impl fmt::Debug for DynamicModuleLoader {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.debug_struct("DynamicModuleLoader").finish_non_exhaustive()
        }
    }

    #[async_trait]
    impl ModuleLoader for DynamicModuleLoader {
        async fn import(&self, path: &Path) -> AppResult<ModuleExports> {
            let key = normalize_path(path);
            let mut libraries = self.libraries.write().await;

            if let Some(loaded) = libraries.get(&key) {
                return Ok(loaded.exports.clone());
            }

            let loaded = Self::load(&key)?;
            let exports = loaded.exports.clone();
            libraries.insert(key.clone(), loaded);

            info!(path = %key.display(), "Extension library loaded");
            Ok(exports)
        }

        async fn evict(&self, path: &Path) -> bool {
            let mut libraries = self.libraries.write().await;
            let retired = libraries.retire(&normalize_path(path));
            if retired {
                info!(path = %path.display(), retired = libraries.retired(), "Extension library retired");
            }
            retired
        }
    }
}

#[cfg(feature = "dynamic")]
pub use dynamic_loader::DynamicModuleLoader;


#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::Value;

    use super::*;
    use crate::module::{ExtensionModule, OperationConfig, operation_fn};

    fn operation_exports() -> AppResult<ModuleExports> {
        Ok(ModuleExports::with_default(ExtensionModule::Operation(
            OperationConfig::new("noop", operation_fn(|_o, _c| async { Ok(Value::Null) })),
        )))
    }

    #[tokio::test]
    async fn test_import_caches_until_evicted() {
        let created = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&created);
        let loader = StaticModuleLoader::new().with_module("/ext/noop/index.js", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            operation_exports()
        });
        let path = Path::new("/ext/noop/./index.js");

        loader.import(path).await.unwrap();
        loader.import(path).await.unwrap();
        assert_eq!(created.load(Ordering::SeqCst), 1);
        assert_eq!(loader.cached().await, 1);

        assert!(loader.evict(path).await);
        assert!(!loader.evict(path).await);

        loader.import(path).await.unwrap();
        assert_eq!(created.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unknown_module_fails() {
        let loader = StaticModuleLoader::new();
        let err = loader.import(Path::new("/ext/missing.js")).await.unwrap_err();
        assert_eq!(err.kind, exthost_core::error::ErrorKind::Extension);
    }
}
