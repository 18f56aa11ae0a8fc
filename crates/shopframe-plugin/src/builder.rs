//! Plugin builder — fluent construction of plugin definitions.
//!
//! The composed call sequence is the plugin's specification; there is no
//! other source of truth. `build` materializes the accumulated state into
//! an immutable [`PluginDefinition`] and can be called more than once —
//! every build clones the accumulated collections, so two definitions
//! never share a mutable sequence.

use crate::definition::{
    HookHandler, HookSpec, LifecycleHook, MenuItem, MiddlewareSpec, ModelSpec, PluginDefinition,
    RouteSpec,
};
use crate::error::PluginError;
use crate::manifest::{is_valid_name, is_valid_semver};

/// Fluent accumulator for a [`PluginDefinition`].
///
/// ```
/// use std::sync::Arc;
/// use shopframe_plugin::{HookFuture, PluginBuilder};
///
/// let definition = PluginBuilder::new("audit", "1.0.0", "Audit trail")
///     .depends_on("content-core")
///     .hook("content:create", 5, Arc::new(|payload, _ctx| -> HookFuture {
///         Box::pin(async move { Ok(payload) })
///     }))
///     .build()
///     .unwrap();
/// assert_eq!(definition.name, "audit");
/// ```
#[derive(Default)]
pub struct PluginBuilder {
    definition: PluginDefinition,
}

impl PluginBuilder {
    /// Seed a builder with the three required fields.
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            definition: PluginDefinition {
                name: name.into(),
                version: version.into(),
                description: description.into(),
                ..Default::default()
            },
        }
    }

    /// Set optional author/license/homepage metadata.
    pub fn metadata(
        mut self,
        author: Option<String>,
        license: Option<String>,
        homepage: Option<String>,
    ) -> Self {
        self.definition.author = author;
        self.definition.license = license;
        self.definition.homepage = homepage;
        self
    }

    /// Declare a dependency on another plugin by name.
    pub fn depends_on(mut self, name: impl Into<String>) -> Self {
        self.definition.dependencies.push(name.into());
        self
    }

    /// Declare a route contribution.
    pub fn route(mut self, route: RouteSpec) -> Self {
        self.definition.routes.push(route);
        self
    }

    /// Declare a middleware contribution.
    pub fn middleware(mut self, middleware: MiddlewareSpec) -> Self {
        self.definition.middleware.push(middleware);
        self
    }

    /// Declare a data model with its migrations.
    pub fn model(mut self, model: ModelSpec) -> Self {
        self.definition.models.push(model);
        self
    }

    /// Subscribe a handler to an event. Non-strict: a failure is logged
    /// and the pipeline continues.
    pub fn hook(mut self, event: impl Into<String>, priority: i32, handler: HookHandler) -> Self {
        self.definition.hooks.push(HookSpec {
            event: event.into(),
            handler,
            priority,
            strict: false,
        });
        self
    }

    /// Subscribe a strict handler: a failure aborts the event pipeline and
    /// reaches the event's caller.
    pub fn strict_hook(
        mut self,
        event: impl Into<String>,
        priority: i32,
        handler: HookHandler,
    ) -> Self {
        self.definition.hooks.push(HookSpec {
            event: event.into(),
            handler,
            priority,
            strict: true,
        });
        self
    }

    /// Contribute an admin menu item.
    pub fn menu_item(mut self, item: MenuItem) -> Self {
        self.definition.menu_items.push(item);
        self
    }

    pub fn on_install(mut self, callback: LifecycleHook) -> Self {
        self.definition.install = Some(callback);
        self
    }

    pub fn on_activate(mut self, callback: LifecycleHook) -> Self {
        self.definition.activate = Some(callback);
        self
    }

    pub fn on_deactivate(mut self, callback: LifecycleHook) -> Self {
        self.definition.deactivate = Some(callback);
        self
    }

    pub fn on_uninstall(mut self, callback: LifecycleHook) -> Self {
        self.definition.uninstall = Some(callback);
        self
    }

    /// Materialize the accumulated state into an immutable definition.
    ///
    /// Performs no I/O. Fails when the required fields are missing or
    /// malformed rather than silently coercing them.
    pub fn build(&self) -> Result<PluginDefinition, PluginError> {
        if !is_valid_name(&self.definition.name) {
            return Err(PluginError::Validation(format!(
                "plugin name must match ^[a-z][a-z0-9-]{{1,63}}$, got '{}'",
                self.definition.name
            )));
        }
        if !is_valid_semver(&self.definition.version) {
            return Err(PluginError::Validation(format!(
                "plugin version is not valid semver: '{}'",
                self.definition.version
            )));
        }
        if self.definition.description.is_empty() {
            return Err(PluginError::Validation(
                "plugin description must not be empty".into(),
            ));
        }

        Ok(self.definition.clone())
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────
