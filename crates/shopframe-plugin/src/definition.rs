//! Plugin definition — the immutable declarative record a plugin builds.
//!
//! A `PluginDefinition` is produced by the [`PluginBuilder`](crate::builder::PluginBuilder)
//! and describes everything a plugin contributes: routes, middleware, data
//! models, hook subscriptions, menu items, and lifecycle callbacks. Once
//! built it is never mutated; the loader clones it into the registry.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::CapabilityContext;
use crate::error::PluginError;

// ─── Handler type aliases ───────────────────────────────────────────────

/// Future returned by a hook handler: the transformed payload.
pub type HookFuture = Pin<Box<dyn Future<Output = Result<Value, PluginError>> + Send>>;

/// A hook handler: receives the current payload and the capability
/// context, returns the payload to feed into the next handler.
pub type HookHandler = Arc<dyn Fn(Value, CapabilityContext) -> HookFuture + Send + Sync>;

/// Future returned by a lifecycle callback.
pub type LifecycleFuture = Pin<Box<dyn Future<Output = Result<(), PluginError>> + Send>>;

/// A lifecycle callback (`install` / `activate` / `deactivate` / `uninstall`).
pub type LifecycleHook = Arc<dyn Fn(CapabilityContext) -> LifecycleFuture + Send + Sync>;

/// An opaque request handler for routes and middleware. The runtime never
/// interprets these; they are passed through to the host's router.
pub type RequestHandler = Arc<dyn Fn(Value, CapabilityContext) -> HookFuture + Send + Sync>;

// ─── Declarative parts ──────────────────────────────────────────────────

/// A route contribution, handed to the host router at install time.
#[derive(Clone)]
pub struct RouteSpec {
    pub mount_path: String,
    pub handler: RequestHandler,
    pub requires_auth: bool,
    pub priority: i32,
    pub description: String,
}

impl RouteSpec {
    pub fn new(mount_path: impl Into<String>, handler: RequestHandler) -> Self {
        Self {
            mount_path: mount_path.into(),
            handler,
            requires_auth: false,
            priority: 0,
            description: String::new(),
        }
    }

    pub fn requires_auth(mut self, requires_auth: bool) -> Self {
        self.requires_auth = requires_auth;
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

impl std::fmt::Debug for RouteSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteSpec")
            .field("mount_path", &self.mount_path)
            .field("requires_auth", &self.requires_auth)
            .field("priority", &self.priority)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// A middleware contribution.
#[derive(Clone)]
pub struct MiddlewareSpec {
    pub name: String,
    pub handler: RequestHandler,
    pub global: bool,
    pub priority: i32,
}

impl MiddlewareSpec {
    pub fn new(name: impl Into<String>, handler: RequestHandler) -> Self {
        Self {
            name: name.into(),
            handler,
            global: false,
            priority: 0,
        }
    }

    pub fn global(mut self, global: bool) -> Self {
        self.global = global;
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

impl std::fmt::Debug for MiddlewareSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiddlewareSpec")
            .field("name", &self.name)
            .field("global", &self.global)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}

/// A data model contribution: table name, validation schema, and the
/// ordered migration statements run through the storage capability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSpec {
    pub table: String,
    pub schema: Value,
    pub migrations: Vec<String>,
}

impl ModelSpec {
    pub fn new(table: impl Into<String>, schema: Value, migrations: Vec<String>) -> Self {
        Self {
            table: table.into(),
            schema,
            migrations,
        }
    }
}

/// A hook subscription declared by a plugin.
#[derive(Clone)]
pub struct HookSpec {
    pub event: String,
    pub handler: HookHandler,
    pub priority: i32,
    /// When true, a handler failure aborts the event pipeline instead of
    /// being logged and skipped.
    pub strict: bool,
}

impl std::fmt::Debug for HookSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookSpec")
            .field("event", &self.event)
            .field("priority", &self.priority)
            .field("strict", &self.strict)
            .finish_non_exhaustive()
    }
}

/// An admin menu contribution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuItem {
    pub label: String,
    pub path: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub order: i32,
    #[serde(default)]
    pub permissions: Vec<String>,
}

impl MenuItem {
    pub fn new(label: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            path: path.into(),
            icon: None,
            order: 0,
            permissions: Vec::new(),
        }
    }
}

// ─── Definition ─────────────────────────────────────────────────────────

/// The immutable declarative record produced by the builder.
#[derive(Clone, Default)]
pub struct PluginDefinition {
    pub name: String,
    pub version: String,
    pub description: String,
    pub author: Option<String>,
    pub license: Option<String>,
    pub homepage: Option<String>,
    pub dependencies: Vec<String>,
    pub routes: Vec<RouteSpec>,
    pub middleware: Vec<MiddlewareSpec>,
    pub models: Vec<ModelSpec>,
    pub hooks: Vec<HookSpec>,
    pub menu_items: Vec<MenuItem>,
    pub install: Option<LifecycleHook>,
    pub activate: Option<LifecycleHook>,
    pub deactivate: Option<LifecycleHook>,
    pub uninstall: Option<LifecycleHook>,
}

impl std::fmt::Debug for PluginDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginDefinition")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("description", &self.description)
            .field("dependencies", &self.dependencies)
            .field("routes", &self.routes.len())
            .field("middleware", &self.middleware.len())
            .field("models", &self.models.len())
            .field("hooks", &self.hooks.len())
            .field("menu_items", &self.menu_items.len())
            .finish_non_exhaustive()
    }
}
