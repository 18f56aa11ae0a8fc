//! Capability context injected into plugin code.
//!
//! The runtime never talks to a database or cache itself; plugins receive a
//! `CapabilityContext` bundling trait handles for structured storage, the
//! key-value cache, a structured logger, the hook registry, a cross-plugin
//! service registry, and the plugin's own configuration. The host supplies
//! the implementations behind the traits.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::PluginError;
use crate::hooks::HookDispatcher;

/// Maximum log message length from plugins.
const MAX_LOG_MESSAGE_LEN: usize = 2048;

/// Sanitize a log message from a plugin.
///
/// Strips control characters (except newline/tab), truncates to max length.
fn sanitize_log_message(message: &str) -> String {
    let cleaned: String = message
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .take(MAX_LOG_MESSAGE_LEN)
        .collect();
    if message.len() > MAX_LOG_MESSAGE_LEN {
        format!("{cleaned}… (truncated)")
    } else {
        cleaned
    }
}

// ─── Capability traits ──────────────────────────────────────────────────

/// Structured storage handle: prepared statements with the run/all/first
/// execution trio. Implemented by the host over its relational engine.
#[async_trait]
pub trait StructuredStore: Send + Sync {
    /// Execute a statement, returning the number of affected rows.
    async fn run(&self, sql: &str, params: &[Value]) -> Result<u64, PluginError>;

    /// Execute a query, returning all rows as JSON objects.
    async fn all(&self, sql: &str, params: &[Value]) -> Result<Vec<Value>, PluginError>;

    /// Execute a query, returning the first row if any.
    async fn first(&self, sql: &str, params: &[Value]) -> Result<Option<Value>, PluginError>;
}

/// Key-value cache handle.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, PluginError>;

    /// Store a value, optionally expiring after `ttl`.
    async fn put(&self, key: &str, value: Value, ttl: Option<Duration>) -> Result<(), PluginError>;

    async fn delete(&self, key: &str) -> Result<bool, PluginError>;

    /// List keys with the given prefix.
    async fn list(&self, prefix: &str) -> Result<Vec<String>, PluginError>;
}

// ─── Plugin logger ──────────────────────────────────────────────────────

/// Structured logger scoped to one plugin.
///
/// Wraps `tracing` with the plugin name as a field; messages are sanitized
/// before emission.
#[derive(Debug, Clone)]
pub struct PluginLogger {
    plugin: String,
}

impl PluginLogger {
    pub fn new(plugin: impl Into<String>) -> Self {
        Self {
            plugin: plugin.into(),
        }
    }

    pub fn plugin_name(&self) -> &str {
        &self.plugin
    }

    pub fn debug(&self, message: &str) {
        tracing::debug!(plugin = %self.plugin, "{}", sanitize_log_message(message));
    }

    pub fn info(&self, message: &str) {
        tracing::info!(plugin = %self.plugin, "{}", sanitize_log_message(message));
    }

    pub fn warn(&self, message: &str) {
        tracing::warn!(plugin = %self.plugin, "{}", sanitize_log_message(message));
    }

    pub fn error(&self, message: &str) {
        tracing::error!(plugin = %self.plugin, "{}", sanitize_log_message(message));
    }
}

// ─── Service registry ───────────────────────────────────────────────────

/// Cross-plugin registry of named shared singletons.
///
/// A plugin registers a service under a name; other plugins fetch it by
/// name and downcast to the concrete type.
#[derive(Default)]
pub struct ServiceRegistry {
    services: RwLock<HashMap<String, Arc<dyn Any + Send + Sync>>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a service, replacing any previous one under the same name.
    pub fn register<T: Any + Send + Sync>(&self, name: impl Into<String>, service: Arc<T>) {
        let mut services = self.services.write().unwrap_or_else(|e| e.into_inner());
        services.insert(name.into(), service);
    }

    /// Fetch a service by name, downcast to `T`. Returns `None` when the
    /// name is unknown or the stored type differs.
    pub fn get<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        let services = self.services.read().unwrap_or_else(|e| e.into_inner());
        services.get(name).cloned()?.downcast::<T>().ok()
    }

    /// Remove a service. Returns whether one was present.
    pub fn remove(&self, name: &str) -> bool {
        let mut services = self.services.write().unwrap_or_else(|e| e.into_inner());
        services.remove(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.services.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ─── Capability context ─────────────────────────────────────────────────

/// The bundle of handles passed into every plugin lifecycle and hook
/// callback. Cheap to clone; the loader derives per-call variants via
/// [`for_plugin`](CapabilityContext::for_plugin), [`with_config`](CapabilityContext::with_config),
/// and [`with_remove_data`](CapabilityContext::with_remove_data).
#[derive(Clone)]
pub struct CapabilityContext {
    storage: Arc<dyn StructuredStore>,
    kv: Arc<dyn KeyValueStore>,
    hooks: Arc<HookDispatcher>,
    services: Arc<ServiceRegistry>,
    logger: PluginLogger,
    config: Value,
    remove_data: bool,
}

impl CapabilityContext {
    pub fn new(
        storage: Arc<dyn StructuredStore>,
        kv: Arc<dyn KeyValueStore>,
        hooks: Arc<HookDispatcher>,
        services: Arc<ServiceRegistry>,
    ) -> Self {
        Self {
            storage,
            kv,
            hooks,
            services,
            logger: PluginLogger::new("host"),
            config: Value::Null,
            remove_data: false,
        }
    }

    /// Structured storage handle.
    pub fn storage(&self) -> &Arc<dyn StructuredStore> {
        &self.storage
    }

    /// Key-value cache handle.
    pub fn kv(&self) -> &Arc<dyn KeyValueStore> {
        &self.kv
    }

    /// Hook registry accessor.
    pub fn hooks(&self) -> &Arc<HookDispatcher> {
        &self.hooks
    }

    /// Cross-plugin service registry.
    pub fn services(&self) -> &Arc<ServiceRegistry> {
        &self.services
    }

    /// Logger scoped to the receiving plugin.
    pub fn logger(&self) -> &PluginLogger {
        &self.logger
    }

    /// This plugin's configuration object.
    pub fn config(&self) -> &Value {
        &self.config
    }

    /// Whether the plugin should drop its persisted state. Only set for
    /// uninstall callbacks.
    pub fn remove_data(&self) -> bool {
        self.remove_data
    }

    /// Derive a context scoped to the named plugin.
    pub fn for_plugin(&self, plugin: &str) -> Self {
        let mut ctx = self.clone();
        ctx.logger = PluginLogger::new(plugin);
        ctx
    }

    /// Derive a context carrying the given configuration.
    pub fn with_config(&self, config: Value) -> Self {
        let mut ctx = self.clone();
        ctx.config = config;
        ctx
    }

    /// Derive a context carrying the remove-data flag.
    pub fn with_remove_data(&self, remove_data: bool) -> Self {
        let mut ctx = self.clone();
        ctx.remove_data = remove_data;
        ctx
    }
}

impl std::fmt::Debug for CapabilityContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityContext")
            .field("plugin", &self.logger.plugin_name())
            .field("remove_data", &self.remove_data)
            .finish_non_exhaustive()
    }
}

// ─── Test support ───────────────────────────────────────────────────────
