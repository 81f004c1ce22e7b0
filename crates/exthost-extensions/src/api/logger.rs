//! Logger handed to extensions; stamps every record with the extension name.

use tracing::{debug, error, info, warn};

/// Logger scoped to one extension.
#[derive(Debug, Clone)]
pub struct ExtensionLogger {
    extension: String,
}

impl ExtensionLogger {
    /// Creates a logger for the named extension.
    pub fn new(extension: impl Into<String>) -> Self {
        Self {
            extension: extension.into(),
        }
    }

    /// Name stamped on every record.
    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn debug(&self, message: &str) {
        debug!(extension = %self.extension, "{message}");
    }

    pub fn info(&self, message: &str) {
        info!(extension = %self.extension, "{message}");
    }

    pub fn warn(&self, message: &str) {
        warn!(extension = %self.extension, "{message}");
    }

    pub fn error(&self, message: &str) {
        error!(extension = %self.extension, "{message}");
    }
}
