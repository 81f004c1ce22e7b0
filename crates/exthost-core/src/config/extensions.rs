//! Extension runtime configuration.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::extension::Extension;

/// Shared dependencies the admin app ships pre-built, in the order they are
/// resolved when bundling app extensions.
pub const APP_SHARED_DEPS: &[&str] = &["@exthost/sdk", "vue", "vue-router", "vue-i18n", "pinia"];

/// Extension runtime configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtensionsConfig {
    /// Whether hook `schedule` handlers are allowed to run on this instance.
    #[serde(default = "default_true")]
    pub schedule: bool,
    /// Public base URL the admin app is served under.
    #[serde(default = "default_public_url")]
    pub public_url: String,
    /// Directory holding the admin app's built assets (`<dep>.<hash>.entry.js`).
    #[serde(default = "default_app_assets_dir")]
    pub app_assets_dir: String,
    /// Shared dependencies app extensions import from the host instead of bundling.
    #[serde(default = "default_shared_deps")]
    pub shared_deps: Vec<String>,
    /// Environment values exposed to extensions through their context.
    #[serde(default)]
    pub env: HashMap<String, String>,
    /// Installed extension records.
    #[serde(default)]
    pub installed: Vec<Extension>,
}

impl Default for ExtensionsConfig {
    fn default() -> Self {
        Self {
            schedule: true,
            public_url: default_public_url(),
            app_assets_dir: default_app_assets_dir(),
            shared_deps: default_shared_deps(),
            env: HashMap::new(),
            installed: Vec::new(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_public_url() -> String {
    "/".to_string()
}

fn default_app_assets_dir() -> String {
    "./app/dist/assets".to_string()
}

fn default_shared_deps() -> Vec<String> {
    APP_SHARED_DEPS.iter().map(|d| d.to_string()).collect()
}
