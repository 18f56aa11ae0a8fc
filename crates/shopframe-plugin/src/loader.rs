//! Plugin loader — registry, lifecycle state machine, failure boundary.
//!
//! The loader owns the authoritative in-memory registry of loaded plugins
//! and drives every lifecycle transition:
//!
//! `unloaded → loaded → installed → active → deactivated/uninstalled`
//!
//! All errors are caught at this boundary and converted into a structured
//! [`InstallResult`]; nothing escapes to the host. A failed transition
//! never mutates metadata, so retries are always safe. Transitions for the
//! same plugin name are serialized through a per-name mutex.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex as StdMutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};

use crate::context::CapabilityContext;
use crate::definition::{MenuItem, MiddlewareSpec, PluginDefinition, RouteSpec};
use crate::discovery::{self, DiscoveredPlugin};
use crate::error::PluginError;
use crate::resolver;
use crate::source::PluginSource;
use crate::validator;

// ─── Status and metadata ────────────────────────────────────────────────

/// Lifecycle status of a plugin as tracked by the loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginStatus {
    Discovered,
    Loaded,
    Installed,
    Active,
    Uninstalled,
}

impl std::fmt::Display for PluginStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PluginStatus::Discovered => "discovered",
            PluginStatus::Loaded => "loaded",
            PluginStatus::Installed => "installed",
            PluginStatus::Active => "active",
            PluginStatus::Uninstalled => "uninstalled",
        };
        f.write_str(s)
    }
}

/// Per-plugin bookkeeping, mutated only by loader transitions. Retained
/// after uninstall for audit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginMetadata {
    /// Origin of the plugin's code (source path).
    pub path: String,
    pub config: Value,
    pub status: PluginStatus,
    pub loaded_at: DateTime<Utc>,
    pub installed_at: Option<DateTime<Utc>>,
    pub uninstalled_at: Option<DateTime<Utc>>,
}

/// Boolean view of a plugin's status derived from metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PluginStatusView {
    pub installed: bool,
    pub active: bool,
}

// ─── Host-facing option and result types ────────────────────────────────

/// Options for [`PluginLoader::load`].
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Path handed to the code source resolver.
    pub plugin_path: String,
    /// Configuration stored for the plugin and passed to `install` when
    /// auto-installing.
    pub config: Value,
    /// Attempt the install transition immediately after loading.
    pub auto_install: bool,
    /// Gate the load on declared dependencies being loaded.
    pub validate_dependencies: bool,
}

impl LoadOptions {
    pub fn new(plugin_path: impl Into<String>) -> Self {
        Self {
            plugin_path: plugin_path.into(),
            config: Value::Null,
            auto_install: false,
            validate_dependencies: false,
        }
    }

    pub fn config(mut self, config: Value) -> Self {
        self.config = config;
        self
    }

    pub fn auto_install(mut self, auto_install: bool) -> Self {
        self.auto_install = auto_install;
        self
    }

    pub fn validate_dependencies(mut self, validate: bool) -> Self {
        self.validate_dependencies = validate;
        self
    }
}

/// Structured outcome of a lifecycle operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallResult {
    pub success: bool,
    pub plugin_name: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl InstallResult {
    fn ok(name: &str, version: &str, message: impl Into<String>) -> Self {
        Self {
            success: true,
            plugin_name: name.to_string(),
            version: version.to_string(),
            message: Some(message.into()),
            error: None,
        }
    }

    fn fail(name: &str, version: &str, error: impl std::fmt::Display) -> Self {
        Self {
            success: false,
            plugin_name: name.to_string(),
            version: version.to_string(),
            message: None,
            error: Some(error.to_string()),
        }
    }
}

/// Receives a plugin's declared routes, middleware, and menu items at
/// install time. The loader passes priorities and auth flags through
/// uninterpreted; absence of a sink means a headless host.
pub trait RouterSink: Send + Sync {
    fn mount_route(&self, plugin: &str, route: &RouteSpec);
    fn mount_middleware(&self, plugin: &str, middleware: &MiddlewareSpec);
    fn add_menu_item(&self, plugin: &str, item: &MenuItem);
}

// ─── Loader ─────────────────────────────────────────────────────────────

/// Orchestrator for the plugin runtime.
///
/// An explicit, constructible instance owned by the host's application
/// context — there is no global singleton; tests build a fresh loader per
/// case.
pub struct PluginLoader {
    /// Loaded definitions keyed by plugin name.
    definitions: RwLock<HashMap<String, Arc<PluginDefinition>>>,
    /// Lifecycle bookkeeping keyed by plugin name.
    metadata: RwLock<HashMap<String, PluginMetadata>>,
    /// Process-wide hook registry.
    dispatcher: Arc<crate::hooks::HookDispatcher>,
    /// Resolves plugin paths to definitions.
    source: Arc<dyn PluginSource>,
    /// Optional host router for route/middleware pass-through.
    router: Option<Arc<dyn RouterSink>>,
    /// Per-name transition locks: two transitions for the same plugin
    /// never run concurrently.
    transition_locks: StdMutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl PluginLoader {
    pub fn new(source: Arc<dyn PluginSource>) -> Self {
        Self {
            definitions: RwLock::new(HashMap::new()),
            metadata: RwLock::new(HashMap::new()),
            dispatcher: Arc::new(crate::hooks::HookDispatcher::new()),
            source,
            router: None,
            transition_locks: StdMutex::new(HashMap::new()),
        }
    }

    /// Attach a host router sink.
    pub fn with_router(mut self, router: Arc<dyn RouterSink>) -> Self {
        self.router = Some(router);
        self
    }

    /// The loader's hook dispatcher. Share this with the capability
    /// context handed to plugins so their registrations land here.
    pub fn dispatcher(&self) -> &Arc<crate::hooks::HookDispatcher> {
        &self.dispatcher
    }

    fn transition_lock(&self, name: &str) -> Arc<Mutex<()>> {
        let mut locks = self
            .transition_locks
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        locks.entry(name.to_string()).or_default().clone()
    }

    // ── Discovery ────────────────────────────────────────────────────

    /// Enumerate candidate plugins under `base_dir` and record them as
    /// `discovered` in the metadata map (names already loaded keep their
    /// current status).
    pub async fn discover(&self, base_dir: &Path) -> Result<Vec<DiscoveredPlugin>, PluginError> {
        let found = discovery::discover_plugins(base_dir).await?;

        let mut metadata = self.metadata.write().await;
        for candidate in &found {
            metadata
                .entry(candidate.name.clone())
                .or_insert_with(|| PluginMetadata {
                    path: candidate.path.display().to_string(),
                    config: Value::Null,
                    status: PluginStatus::Discovered,
                    loaded_at: Utc::now(),
                    installed_at: None,
                    uninstalled_at: None,
                });
        }

        Ok(found)
    }

    // ── Lifecycle transitions ────────────────────────────────────────

    /// Load a plugin: resolve its code, validate, optionally check
    /// dependencies, and insert it into the registry with status
    /// `loaded`. With `auto_install`, the install transition is attempted
    /// immediately and its result returned.
    pub async fn load(&self, options: LoadOptions, ctx: &CapabilityContext) -> InstallResult {
        let definition = match self.source.resolve(&options.plugin_path).await {
            Ok(definition) => definition,
            Err(e) => return InstallResult::fail(&options.plugin_path, "", e),
        };

        let name = definition.name.clone();
        let version = definition.version.clone();

        let report = validator::validate(&definition);
        if !report.valid {
            return InstallResult::fail(
                &name,
                &version,
                PluginError::Validation(report.summary()),
            );
        }

        let lock = self.transition_lock(&name);
        let _guard = lock.lock().await;

        {
            let definitions = self.definitions.read().await;

            if definitions.contains_key(&name) {
                return InstallResult::fail(&name, &version, PluginError::Duplicate(name.clone()));
            }

            if options.validate_dependencies {
                let loaded = definitions.keys().cloned().collect();
                let deps = resolver::check_dependencies(&definition, &loaded);
                if !deps.valid {
                    return InstallResult::fail(
                        &name,
                        &version,
                        PluginError::Dependency(deps.summary()),
                    );
                }
            }
        }

        {
            let mut definitions = self.definitions.write().await;
            definitions.insert(name.clone(), Arc::new(definition));
        }
        {
            let mut metadata = self.metadata.write().await;
            metadata.insert(
                name.clone(),
                PluginMetadata {
                    path: options.plugin_path.clone(),
                    config: options.config.clone(),
                    status: PluginStatus::Loaded,
                    loaded_at: Utc::now(),
                    installed_at: None,
                    uninstalled_at: None,
                },
            );
        }

        tracing::info!(plugin = %name, version = %version, "plugin loaded");

        if options.auto_install {
            return self.install_locked(&name, options.config, ctx).await;
        }

        InstallResult::ok(&name, &version, "loaded")
    }

    /// Install a loaded plugin: run its `install` callback, then make its
    /// declared hooks effective and hand routes to the router.
    pub async fn install(
        &self,
        name: &str,
        config: Value,
        ctx: &CapabilityContext,
    ) -> InstallResult {
        let lock = self.transition_lock(name);
        let _guard = lock.lock().await;
        self.install_locked(name, config, ctx).await
    }

    /// Install body; caller holds the per-name transition lock.
    async fn install_locked(
        &self,
        name: &str,
        config: Value,
        ctx: &CapabilityContext,
    ) -> InstallResult {
        let definition = {
            let definitions = self.definitions.read().await;
            match definitions.get(name) {
                Some(definition) => definition.clone(),
                None => {
                    return InstallResult::fail(name, "", PluginError::NotFound(name.to_string()))
                }
            }
        };
        let version = definition.version.clone();

        let status = self.current_status(name).await;
        if status != Some(PluginStatus::Loaded) {
            return InstallResult::fail(
                name,
                &version,
                PluginError::Lifecycle(format!(
                    "cannot install '{name}' from status '{}'",
                    status.map_or_else(|| "unknown".to_string(), |s| s.to_string())
                )),
            );
        }

        if let Some(ref callback) = definition.install {
            let callback_ctx = ctx.for_plugin(name).with_config(config.clone());
            if let Err(e) = callback(callback_ctx).await {
                tracing::error!(plugin = %name, "install callback failed: {e}");
                return InstallResult::fail(name, &version, PluginError::Lifecycle(e.to_string()));
            }
        }

        // The callback completed; only now do declared hooks go live and
        // routes reach the host router.
        for hook in &definition.hooks {
            self.dispatcher.register(
                hook.event.clone(),
                name,
                hook.priority,
                hook.strict,
                hook.handler.clone(),
            );
        }
        if let Some(ref router) = self.router {
            for route in &definition.routes {
                router.mount_route(name, route);
            }
            for middleware in &definition.middleware {
                router.mount_middleware(name, middleware);
            }
            for item in &definition.menu_items {
                router.add_menu_item(name, item);
            }
        }

        {
            let mut metadata = self.metadata.write().await;
            if let Some(meta) = metadata.get_mut(name) {
                meta.status = PluginStatus::Installed;
                meta.installed_at = Some(Utc::now());
                meta.config = config;
            }
        }

        tracing::info!(plugin = %name, version = %version, "plugin installed");
        InstallResult::ok(name, &version, "installed")
    }

    /// Activate an installed plugin by running its `activate` callback.
    /// A failure leaves the plugin `installed` and is retriable.
    pub async fn activate(&self, name: &str, ctx: &CapabilityContext) -> InstallResult {
        self.run_transition(
            name,
            ctx,
            PluginStatus::Installed,
            PluginStatus::Active,
            "activate",
        )
        .await
    }

    /// Deactivate an active plugin, returning it to `installed`.
    pub async fn deactivate(&self, name: &str, ctx: &CapabilityContext) -> InstallResult {
        self.run_transition(
            name,
            ctx,
            PluginStatus::Active,
            PluginStatus::Installed,
            "deactivate",
        )
        .await
    }

    async fn run_transition(
        &self,
        name: &str,
        ctx: &CapabilityContext,
        from: PluginStatus,
        to: PluginStatus,
        verb: &str,
    ) -> InstallResult {
        let lock = self.transition_lock(name);
        let _guard = lock.lock().await;

        let definition = {
            let definitions = self.definitions.read().await;
            match definitions.get(name) {
                Some(definition) => definition.clone(),
                None => {
                    return InstallResult::fail(name, "", PluginError::NotFound(name.to_string()))
                }
            }
        };
        let version = definition.version.clone();

        let status = self.current_status(name).await;
        if status != Some(from) {
            return InstallResult::fail(
                name,
                &version,
                PluginError::Lifecycle(format!(
                    "cannot {verb} '{name}' from status '{}'",
                    status.map_or_else(|| "unknown".to_string(), |s| s.to_string())
                )),
            );
        }

        let callback = match verb {
            "activate" => definition.activate.clone(),
            _ => definition.deactivate.clone(),
        };
        if let Some(callback) = callback {
            if let Err(e) = callback(ctx.for_plugin(name)).await {
                tracing::error!(plugin = %name, "{verb} callback failed: {e}");
                return InstallResult::fail(name, &version, PluginError::Lifecycle(e.to_string()));
            }
        }

        {
            let mut metadata = self.metadata.write().await;
            if let Some(meta) = metadata.get_mut(name) {
                meta.status = to;
            }
        }

        tracing::info!(plugin = %name, version = %version, status = %to, "plugin {verb}d");
        InstallResult::ok(name, &version, format!("{verb}d"))
    }

    /// Uninstall a plugin: run its `uninstall` callback (with the
    /// remove-data flag on the context), drop its hooks and definition,
    /// and mark the metadata `uninstalled`.
    ///
    /// Blocked while another loaded plugin declares this one as a
    /// dependency; uninstall the dependents first.
    pub async fn uninstall(
        &self,
        name: &str,
        ctx: &CapabilityContext,
        remove_data: bool,
    ) -> InstallResult {
        let lock = self.transition_lock(name);
        let _guard = lock.lock().await;

        let definition = {
            let definitions = self.definitions.read().await;
            match definitions.get(name) {
                Some(definition) => definition.clone(),
                None => {
                    return InstallResult::fail(name, "", PluginError::NotFound(name.to_string()))
                }
            }
        };
        let version = definition.version.clone();

        let dependents: Vec<String> = {
            let definitions = self.definitions.read().await;
            let mut dependents: Vec<String> = definitions
                .values()
                .filter(|d| d.dependencies.iter().any(|dep| dep == name))
                .map(|d| d.name.clone())
                .collect();
            dependents.sort();
            dependents
        };
        if !dependents.is_empty() {
            return InstallResult::fail(
                name,
                &version,
                PluginError::Dependency(format!(
                    "plugin '{name}' is required by loaded plugins: {}",
                    dependents.join(", ")
                )),
            );
        }

        if let Some(ref callback) = definition.uninstall {
            let callback_ctx = ctx.for_plugin(name).with_remove_data(remove_data);
            if let Err(e) = callback(callback_ctx).await {
                tracing::error!(plugin = %name, "uninstall callback failed: {e}");
                return InstallResult::fail(name, &version, PluginError::Lifecycle(e.to_string()));
            }
        }

        let removed_hooks = self.dispatcher.unregister_plugin(name);
        {
            let mut definitions = self.definitions.write().await;
            definitions.remove(name);
        }
        {
            let mut metadata = self.metadata.write().await;
            if let Some(meta) = metadata.get_mut(name) {
                meta.status = PluginStatus::Uninstalled;
                meta.uninstalled_at = Some(Utc::now());
            }
        }

        tracing::info!(
            plugin = %name,
            version = %version,
            removed_hooks,
            remove_data,
            "plugin uninstalled"
        );
        InstallResult::ok(name, &version, "uninstalled")
    }

    // ── Query methods (pure reads, no side effects) ──────────────────

    /// Definition of a loaded plugin.
    pub async fn get_plugin(&self, name: &str) -> Option<Arc<PluginDefinition>> {
        self.definitions.read().await.get(name).cloned()
    }

    /// All loaded definitions, sorted by name.
    pub async fn all_plugins(&self) -> Vec<Arc<PluginDefinition>> {
        let definitions = self.definitions.read().await;
        let mut all: Vec<Arc<PluginDefinition>> = definitions.values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }

    /// Metadata snapshot for a plugin (retained after uninstall).
    pub async fn metadata(&self, name: &str) -> Option<PluginMetadata> {
        self.metadata.read().await.get(name).cloned()
    }

    /// Boolean status view. `None` for a name that was never loaded
    /// (discovery alone does not count).
    pub async fn status(&self, name: &str) -> Option<PluginStatusView> {
        let metadata = self.metadata.read().await;
        metadata
            .get(name)
            .filter(|meta| meta.status != PluginStatus::Discovered)
            .map(|meta| PluginStatusView {
                installed: matches!(meta.status, PluginStatus::Installed | PluginStatus::Active),
                active: meta.status == PluginStatus::Active,
            })
    }

    async fn current_status(&self, name: &str) -> Option<PluginStatus> {
        self.metadata.read().await.get(name).map(|m| m.status)
    }
}

impl std::fmt::Debug for PluginLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginLoader").finish_non_exhaustive()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────
