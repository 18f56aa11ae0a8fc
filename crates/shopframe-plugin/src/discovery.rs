//! Plugin discovery — enumerate candidate plugins before loading code.
//!
//! Scans one directory level under a base directory for `plugin.toml`
//! manifests. Malformed manifests are skipped with a warning rather than
//! failing the whole scan.

use std::path::{Path, PathBuf};

use crate::error::PluginError;
use crate::manifest::PluginManifest;

/// A candidate plugin found on disk, not yet loaded.
#[derive(Debug, Clone)]
pub struct DiscoveredPlugin {
    /// Directory containing the manifest.
    pub path: PathBuf,
    pub name: String,
    pub version: String,
    pub manifest: PluginManifest,
}

/// Scan `base_dir` for plugin directories.
///
/// Each immediate subdirectory holding a `plugin.toml` yields one
/// candidate. Results are sorted by plugin name for determinism. A
/// missing base directory yields an empty list; only I/O failures on an
/// existing directory are errors.
pub async fn discover_plugins(base_dir: &Path) -> Result<Vec<DiscoveredPlugin>, PluginError> {
    if !base_dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut discovered = Vec::new();
    let mut entries = tokio::fs::read_dir(base_dir).await?;

    while let Some(entry) = entries.next_entry().await? {
        let dir = entry.path();
        if !dir.is_dir() {
            continue;
        }

        let manifest_path = dir.join("plugin.toml");
        let content = match tokio::fs::read_to_string(&manifest_path).await {
            Ok(content) => content,
            Err(_) => continue,
        };

        match PluginManifest::parse_and_validate(&content) {
            Ok(manifest) => {
                discovered.push(DiscoveredPlugin {
                    path: dir,
                    name: manifest.plugin.name.clone(),
                    version: manifest.plugin.version.clone(),
                    manifest,
                });
            }
            Err(e) => {
                tracing::warn!(
                    manifest = %manifest_path.display(),
                    "skipping plugin with invalid manifest: {e}"
                );
            }
        }
    }

    discovered.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(discovered)
}

// ─── Tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    async fn write_manifest(base: &Path, dir: &str, toml: &str) {
        let plugin_dir = base.join(dir);
        tokio::fs::create_dir_all(&plugin_dir).await.unwrap();
        tokio::fs::write(plugin_dir.join("plugin.toml"), toml)
            .await
            .unwrap();
    }

    fn manifest_toml(name: &str, version: &str) -> String {
        format!(
            r#"
entry = "plugins/{name}"

[plugin]
name = "{name}"
version = "{version}"
description = "Test plugin {name}"
"#
        )
    }

    #[tokio::test]
    async fn test_discover_empty_base_dir() {
        let dir = tempfile::tempdir().unwrap();
        let found = discover_plugins(dir.path()).await.unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_discover_missing_base_dir() {
        let found = discover_plugins(Path::new("/nonexistent/plugins"))
            .await
            .unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_discover_sorted_by_name() {
        let dir = tempfile::tempdir().unwrap();
        write_manifest(dir.path(), "zeta", &manifest_toml("zeta", "1.0.0")).await;
        write_manifest(dir.path(), "alpha", &manifest_toml("alpha", "0.2.0")).await;

        let found = discover_plugins(dir.path()).await.unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].name, "alpha");
        assert_eq!(found[0].version, "0.2.0");
        assert_eq!(found[1].name, "zeta");
        assert_eq!(found[1].manifest.entry, "plugins/zeta");
    }

    #[tokio::test]
    async fn test_discover_skips_invalid_manifest() {
        let dir = tempfile::tempdir().unwrap();
        write_manifest(dir.path(), "good", &manifest_toml("good", "1.0.0")).await;
        write_manifest(dir.path(), "bad", "not valid {{ toml").await;
        write_manifest(
            dir.path(),
            "bad-name",
            &manifest_toml("Bad_Name", "1.0.0"),
        )
        .await;

        let found = discover_plugins(dir.path()).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "good");
    }

    #[tokio::test]
    async fn test_discover_ignores_dirs_without_manifest() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::create_dir_all(dir.path().join("empty"))
            .await
            .unwrap();
        tokio::fs::write(dir.path().join("stray-file.txt"), "x")
            .await
            .unwrap();
        write_manifest(dir.path(), "only", &manifest_toml("only", "1.0.0")).await;

        let found = discover_plugins(dir.path()).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "only");
        assert!(found[0].path.ends_with("only"));
    }
}
