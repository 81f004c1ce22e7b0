//! The extension source collaborator.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::types::extension::Extension;

/// Supplies the ordered list of enabled extensions on demand.
///
/// Discovery and manifest validation live behind this trait; the runtime
/// only ever reads the records it returns.
#[async_trait]
pub trait ExtensionSource: Send + Sync {
    /// Returns every enabled extension, in registration order.
    async fn enabled_extensions(&self) -> Vec<Extension>;
}

/// Extension source backed by an in-memory list of records.
#[derive(Debug, Default)]
pub struct StaticExtensionSource {
    /// Installed records, including disabled ones.
    extensions: RwLock<Vec<Extension>>,
}

impl StaticExtensionSource {
    /// Creates a source from the given records.
    pub fn new(extensions: Vec<Extension>) -> Self {
        Self {
            extensions: RwLock::new(extensions),
        }
    }

    /// Replaces the installed records, e.g. before a reload pass.
    pub async fn replace(&self, extensions: Vec<Extension>) {
        *self.extensions.write().await = extensions;
    }

    /// Appends a record.
    pub async fn push(&self, extension: Extension) {
        self.extensions.write().await.push(extension);
    }
}

#[async_trait]
impl ExtensionSource for StaticExtensionSource {
    async fn enabled_extensions(&self) -> Vec<Extension> {
        self.extensions
            .read()
            .await
            .iter()
            .filter(|e| e.enabled)
            .cloned()
            .collect()
    }
}
