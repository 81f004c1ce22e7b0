//! Export helpers for building extension modules.

use std::sync::Arc;

use crate::module::{
    BundleConfig, BundleEntry, EndpointConfig, ExtensionModule, HookRegister, ModuleExports, OperationConfig,
};

impl ModuleExports {
    /// Exports a hook register function as the default export.
    pub fn hook(register: Arc<dyn HookRegister>) -> Self {
        Self::with_default(ExtensionModule::Hook(register))
    }

    /// Exports an endpoint as the default export.
    pub fn endpoint(config: EndpointConfig) -> Self {
        Self::with_default(ExtensionModule::Endpoint(config))
    }

    /// Exports an operation as the default export.
    pub fn operation(config: OperationConfig) -> Self {
        Self::with_default(ExtensionModule::Operation(config))
    }

    /// Exports a bundle as the default export.
    pub fn bundle(config: BundleConfig) -> Self {
        Self::with_default(ExtensionModule::Bundle(config))
    }
}

impl BundleConfig {
    /// Creates an empty bundle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a hook.
    pub fn hook(mut self, name: impl Into<String>, register: Arc<dyn HookRegister>) -> Self {
        self.hooks.push(BundleEntry {
            name: name.into(),
            config: register,
        });
        self
    }

    /// Adds an endpoint.
    pub fn endpoint(mut self, name: impl Into<String>, config: EndpointConfig) -> Self {
        self.endpoints.push(BundleEntry {
            name: name.into(),
            config,
        });
        self
    }

    /// Adds an operation. It registers under `config.id`, not `name`.
    pub fn operation(mut self, name: impl Into<String>, config: OperationConfig) -> Self {
        self.operations.push(BundleEntry {
            name: name.into(),
            config,
        });
        self
    }

    /// Total number of bundled entries.
    pub fn len(&self) -> usize {
        self.hooks.len() + self.endpoints.len() + self.operations.len()
    }

    /// Returns whether the bundle is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
