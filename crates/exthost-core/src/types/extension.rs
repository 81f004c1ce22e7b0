//! Extension records as supplied by the extension manager.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Kind of an installed extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtensionKind {
    /// Subscribes to host events, schedules jobs, or embeds markup.
    Hook,
    /// Mounts HTTP routes under its own prefix.
    Endpoint,
    /// Adds a workflow operation (API handler plus optional app UI).
    Operation,
    /// Packages several hooks, endpoints and operations together.
    Bundle,
    /// App-only field interface.
    Interface,
    /// App-only value display.
    Display,
    /// App-only collection layout.
    Layout,
    /// App-only module page.
    Module,
    /// App-only dashboard panel.
    Panel,
}

impl ExtensionKind {
    /// Kinds that are loaded into the host process.
    pub const API: [ExtensionKind; 4] = [Self::Hook, Self::Endpoint, Self::Operation, Self::Bundle];

    /// Returns whether extensions of this kind carry server-side code.
    pub fn has_api(&self) -> bool {
        Self::API.contains(self)
    }

    /// Returns whether extensions of this kind carry browser-side code.
    pub fn has_app(&self) -> bool {
        !matches!(self, Self::Hook | Self::Endpoint)
    }

    /// Name of the export array app extensions of this kind are collected into.
    pub fn app_collection(&self) -> Option<&'static str> {
        match self {
            Self::Interface => Some("interfaces"),
            Self::Display => Some("displays"),
            Self::Layout => Some("layouts"),
            Self::Module => Some("modules"),
            Self::Panel => Some("panels"),
            Self::Operation => Some("operations"),
            Self::Hook | Self::Endpoint | Self::Bundle => None,
        }
    }
}

impl fmt::Display for ExtensionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Hook => "hook",
            Self::Endpoint => "endpoint",
            Self::Operation => "operation",
            Self::Bundle => "bundle",
            Self::Interface => "interface",
            Self::Display => "display",
            Self::Layout => "layout",
            Self::Module => "module",
            Self::Panel => "panel",
        };
        f.write_str(name)
    }
}

/// Entrypoint of an extension, relative to its directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Entrypoint {
    /// A single module (hooks, endpoints, app-only kinds).
    Single(PathBuf),
    /// Separate server and browser modules (operations, bundles).
    Split {
        /// Browser-side module.
        app: PathBuf,
        /// Server-side module.
        api: PathBuf,
    },
}

/// An installed extension record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extension {
    /// Unique extension name.
    pub name: String,
    /// Extension kind.
    pub kind: ExtensionKind,
    /// Directory the extension is installed in.
    pub path: PathBuf,
    /// Module entrypoint(s), relative to `path`.
    pub entrypoint: Entrypoint,
    /// Whether the host may load this extension in-process.
    ///
    /// Untrusted ("secure") extensions are handed to the sandbox instead.
    #[serde(default)]
    pub trusted: bool,
    /// Whether the extension is enabled.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl Extension {
    /// Creates an enabled, untrusted extension record.
    pub fn new(
        name: impl Into<String>,
        kind: ExtensionKind,
        path: impl Into<PathBuf>,
        entrypoint: Entrypoint,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            path: path.into(),
            entrypoint,
            trusted: false,
            enabled: true,
        }
    }

    /// Marks the record as trusted.
    pub fn trusted(mut self) -> Self {
        self.trusted = true;
        self
    }

    /// Marks the record as disabled.
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Server-side entrypoint, if this kind has one.
    pub fn api_entrypoint(&self) -> Option<&Path> {
        if !self.kind.has_api() {
            return None;
        }
        match &self.entrypoint {
            Entrypoint::Single(path) => Some(path),
            Entrypoint::Split { api, .. } => Some(api),
        }
    }

    /// Browser-side entrypoint, if this kind has one.
    pub fn app_entrypoint(&self) -> Option<&Path> {
        if !self.kind.has_app() {
            return None;
        }
        match &self.entrypoint {
            Entrypoint::Single(path) if !self.kind.has_api() => Some(path),
            Entrypoint::Single(_) => None,
            Entrypoint::Split { app, .. } => Some(app),
        }
    }

    /// Resolves the server-side entrypoint against the extension directory.
    pub fn resolved_api_entrypoint(&self) -> Option<PathBuf> {
        self.api_entrypoint().map(|entry| self.path.join(entry))
    }

    /// Resolves the browser-side entrypoint against the extension directory.
    pub fn resolved_app_entrypoint(&self) -> Option<PathBuf> {
        self.app_entrypoint().map(|entry| self.path.join(entry))
    }
}
