//! Plugin manifest parsing and validation.
//!
//! Parses `plugin.toml` files that describe a plugin before its code is
//! resolved: metadata, the entry identifier handed to the code source,
//! and declared dependencies.

use serde::{Deserialize, Serialize};

use crate::error::PluginError;

/// Plugin manifest parsed from `plugin.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginManifest {
    pub plugin: PluginMeta,
    /// Entry identifier resolved by the host's [`PluginSource`](crate::source::PluginSource).
    pub entry: String,
    #[serde(default)]
    pub dependencies: Vec<String>,
}

/// Plugin metadata section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginMeta {
    pub name: String,
    pub version: String,
    pub description: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub license: Option<String>,
    #[serde(default)]
    pub homepage: Option<String>,
}

// ─── Validation helpers ─────────────────────────────────────────────

/// Check a plugin name against `^[a-z][a-z0-9-]{1,63}$`.
///
/// The name must start with a lowercase ASCII letter, followed by 1-63
/// characters that are lowercase ASCII letters, digits, or hyphens.
/// Total length: 2-64 characters.
pub(crate) fn is_valid_name(name: &str) -> bool {
    if !(2..=64).contains(&name.len()) {
        return false;
    }
    let mut chars = name.chars();
    let first = chars.next().unwrap();
    if !first.is_ascii_lowercase() {
        return false;
    }
    chars.all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-')
}

/// Check a version string is valid semver.
pub(crate) fn is_valid_semver(value: &str) -> bool {
    semver::Version::parse(value).is_ok()
}

fn validate_plugin_name(name: &str) -> Result<(), PluginError> {
    if is_valid_name(name) {
        return Ok(());
    }
    Err(PluginError::InvalidManifest(format!(
        "plugin name must match ^[a-z][a-z0-9-]{{1,63}}$, got '{name}'"
    )))
}

fn validate_semver(value: &str, field_name: &str) -> Result<(), PluginError> {
    semver::Version::parse(value).map_err(|_| {
        PluginError::InvalidManifest(format!("{field_name} is not valid semver: '{value}'"))
    })?;
    Ok(())
}

/// Validate that an entry path is safe (no `..` components, not absolute).
fn validate_path_safety(path: &str, field_name: &str) -> Result<(), PluginError> {
    let p = std::path::Path::new(path);
    if p.is_absolute() {
        return Err(PluginError::InvalidManifest(format!(
            "{field_name} must be a relative path, got absolute: '{path}'"
        )));
    }
    for component in p.components() {
        if matches!(component, std::path::Component::ParentDir) {
            return Err(PluginError::InvalidManifest(format!(
                "{field_name} must not contain '..': '{path}'"
            )));
        }
    }
    Ok(())
}

impl PluginManifest {
    /// Parse a plugin manifest from a TOML string.
    pub fn parse(toml_str: &str) -> Result<Self, PluginError> {
        let manifest: PluginManifest = toml::from_str(toml_str)?;
        Ok(manifest)
    }

    /// Validate all fields of a parsed manifest.
    pub fn validate(&self) -> Result<(), PluginError> {
        // ── Plugin metadata ─────────────────────────────────────────
        validate_plugin_name(&self.plugin.name)?;

        validate_semver(&self.plugin.version, "plugin.version")?;

        let desc_len = self.plugin.description.len();
        if desc_len == 0 || desc_len > 500 {
            return Err(PluginError::InvalidManifest(format!(
                "plugin.description must be 1-500 characters, got {desc_len}"
            )));
        }

        if let Some(ref author) = self.plugin.author {
            let len = author.len();
            if len == 0 || len > 255 {
                return Err(PluginError::InvalidManifest(format!(
                    "plugin.author must be 1-255 characters, got {len}"
                )));
            }
        }

        if let Some(ref license) = self.plugin.license {
            let len = license.len();
            if len == 0 || len > 50 {
                return Err(PluginError::InvalidManifest(format!(
                    "plugin.license must be 1-50 characters, got {len}"
                )));
            }
        }

        // ── Entry ───────────────────────────────────────────────────
        if self.entry.is_empty() {
            return Err(PluginError::InvalidManifest("entry must not be empty".into()));
        }
        validate_path_safety(&self.entry, "entry")?;

        // ── Dependencies ────────────────────────────────────────────
        for dep in &self.dependencies {
            if !is_valid_name(dep) {
                return Err(PluginError::InvalidManifest(format!(
                    "dependency is not a valid plugin name: '{dep}'"
                )));
            }
            if *dep == self.plugin.name {
                return Err(PluginError::InvalidManifest(format!(
                    "plugin '{dep}' cannot depend on itself"
                )));
            }
        }

        Ok(())
    }

    /// Parse and validate a plugin manifest from a TOML string.
    pub fn parse_and_validate(toml_str: &str) -> Result<Self, PluginError> {
        let manifest = Self::parse(toml_str)?;
        manifest.validate()?;
        Ok(manifest)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
