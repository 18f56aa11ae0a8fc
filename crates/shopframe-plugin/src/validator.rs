//! Structural plugin validator.
//!
//! Pure, synchronous checks run before a definition is accepted into the
//! registry. All failures are accumulated rather than short-circuiting so
//! an operator sees every problem at once.

use crate::definition::PluginDefinition;
use crate::manifest::{is_valid_name, is_valid_semver};

/// Outcome of a validation pass. `valid` is true iff `errors` is empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl ValidationReport {
    pub(crate) fn from_errors(errors: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }

    /// All error messages joined for a single human-readable line.
    pub fn summary(&self) -> String {
        self.errors.join("; ")
    }
}

/// Validate a definition's structure. Checks run in a fixed order and
/// every failure is collected.
pub fn validate(definition: &PluginDefinition) -> ValidationReport {
    let mut errors = Vec::new();

    if definition.name.is_empty() {
        errors.push("plugin name is required".to_string());
    } else if !is_valid_name(&definition.name) {
        errors.push(format!(
            "plugin name must match ^[a-z][a-z0-9-]{{1,63}}$, got '{}'",
            definition.name
        ));
    }

    if definition.version.is_empty() {
        errors.push("plugin version is required".to_string());
    } else if !is_valid_semver(&definition.version) {
        errors.push(format!(
            "plugin version is not valid semver: '{}'",
            definition.version
        ));
    }

    for (i, route) in definition.routes.iter().enumerate() {
        if route.mount_path.is_empty() {
            errors.push(format!("route {i} has an empty mount path"));
        }
    }

    for (i, hook) in definition.hooks.iter().enumerate() {
        if hook.event.is_empty() {
            errors.push(format!("hook {i} has an empty event name"));
        }
    }

    for (i, middleware) in definition.middleware.iter().enumerate() {
        if middleware.name.is_empty() {
            errors.push(format!("middleware {i} has an empty name"));
        }
    }

    for (i, model) in definition.models.iter().enumerate() {
        if model.table.is_empty() {
            errors.push(format!("model {i} has an empty table name"));
        }
        if model.migrations.is_empty() {
            errors.push(format!(
                "model {i} ('{}') has no migration statements",
                model.table
            ));
        }
    }

    ValidationReport::from_errors(errors)
}

// ─── Tests ──────────────────────────────────────────────────────────────
