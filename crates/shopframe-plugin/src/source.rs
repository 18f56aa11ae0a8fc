//! Code source resolution — how plugin code is brought into the process.
//!
//! The loader never imports code directly; it asks a [`PluginSource`] to
//! turn a path into a [`PluginDefinition`]. Hosts pick the strategy:
//! the shipped [`BundledSource`] serves definitions compiled into the host
//! binary, while disk- or network-backed hosts supply their own
//! implementation behind the same contract.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::definition::PluginDefinition;
use crate::error::PluginError;

/// Resolves a plugin path to its definition.
#[async_trait]
pub trait PluginSource: Send + Sync {
    /// Resolve the definition at `path`, or fail with a load error.
    async fn resolve(&self, path: &str) -> Result<PluginDefinition, PluginError>;
}

/// Factory producing a fresh definition on every resolve.
pub type DefinitionFactory =
    Arc<dyn Fn() -> Result<PluginDefinition, PluginError> + Send + Sync>;

/// A source for plugins bundled into the host binary at build time.
///
/// Paths map to registered definition factories; resolving an unknown
/// path is a load error.
#[derive(Default)]
pub struct BundledSource {
    factories: RwLock<HashMap<String, DefinitionFactory>>,
}

impl BundledSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under a path, replacing any previous one.
    pub fn register(&self, path: impl Into<String>, factory: DefinitionFactory) {
        let mut factories = self.factories.write().unwrap_or_else(|e| e.into_inner());
        factories.insert(path.into(), factory);
    }

    /// Convenience: register a ready-made definition under a path.
    pub fn register_definition(&self, path: impl Into<String>, definition: PluginDefinition) {
        self.register(path, Arc::new(move || Ok(definition.clone())));
    }

    /// Paths with a registered factory, sorted.
    pub fn paths(&self) -> Vec<String> {
        let factories = self.factories.read().unwrap_or_else(|e| e.into_inner());
        let mut paths: Vec<String> = factories.keys().cloned().collect();
        paths.sort();
        paths
    }
}

#[async_trait]
impl PluginSource for BundledSource {
    async fn resolve(&self, path: &str) -> Result<PluginDefinition, PluginError> {
        let factory = {
            let factories = self.factories.read().unwrap_or_else(|e| e.into_inner());
            factories.get(path).cloned()
        };

        match factory {
            Some(factory) => factory(),
            None => Err(PluginError::Load(format!(
                "no plugin registered at path '{path}'"
            ))),
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────
