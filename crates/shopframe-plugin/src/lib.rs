//! Shopframe Plugin System
//!
//! Dynamic extension runtime for the Shopframe platform. Plugins are
//! declarative definitions built with [`PluginBuilder`], loaded through a
//! host-provided [`PluginSource`], and driven through an explicit lifecycle
//! (loaded, installed, active, uninstalled) by the [`PluginLoader`].
//! Installed plugins contribute hooks to the shared [`HookDispatcher`] and
//! interact with the host only through the capabilities handed to them in a
//! [`CapabilityContext`].

pub mod builder;
pub mod context;
pub mod definition;
pub mod discovery;
pub mod error;
pub mod hooks;
pub mod loader;
pub mod manifest;
pub mod resolver;
pub mod source;
pub mod validator;

pub use builder::PluginBuilder;
pub use context::{
    CapabilityContext, KeyValueStore, PluginLogger, ServiceRegistry, StructuredStore,
};
pub use definition::{
    HookFuture, HookHandler, HookSpec, LifecycleFuture, LifecycleHook, MenuItem, MiddlewareSpec,
    ModelSpec, PluginDefinition, RequestHandler, RouteSpec,
};
pub use discovery::{discover_plugins, DiscoveredPlugin};
pub use error::PluginError;
pub use hooks::{HookDispatcher, HookInfo};
pub use loader::{
    InstallResult, LoadOptions, PluginLoader, PluginMetadata, PluginStatus, PluginStatusView,
    RouterSink,
};
pub use manifest::{PluginManifest, PluginMeta};
pub use resolver::check_dependencies;
pub use source::{BundledSource, DefinitionFactory, PluginSource};
pub use validator::{validate, ValidationReport};
