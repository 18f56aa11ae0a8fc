//! Dependency resolver — membership check against the loaded set.
//!
//! Gates a single plugin's load against the plugins already in the
//! registry. This is deliberately not a graph solve: batch install
//! ordering is the caller's responsibility.

use std::collections::HashSet;

use crate::definition::PluginDefinition;
use crate::validator::ValidationReport;

/// Check that every declared dependency is present among the loaded
/// plugin names. Emits one error per missing dependency; a definition
/// with no dependencies is trivially valid.
pub fn check_dependencies(
    definition: &PluginDefinition,
    loaded: &HashSet<String>,
) -> ValidationReport {
    let errors = definition
        .dependencies
        .iter()
        .filter(|dep| !loaded.contains(*dep))
        .map(|dep| format!("required plugin '{dep}' is not loaded"))
        .collect();

    ValidationReport::from_errors(errors)
}

// ─── Tests ──────────────────────────────────────────────────────────────
