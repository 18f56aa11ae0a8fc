//! Plugin runtime error types.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PluginError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("invalid manifest: {0}")]
    InvalidManifest(String),

    #[error("dependency error: {0}")]
    Dependency(String),

    #[error("load error: {0}")]
    Load(String),

    #[error("lifecycle error: {0}")]
    Lifecycle(String),

    #[error("plugin already loaded: {0}")]
    Duplicate(String),

    #[error("plugin not found: {0}")]
    NotFound(String),

    #[error("hook error: {0}")]
    Hook(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("semver error: {0}")]
    Semver(#[from] semver::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    // ── Display messages ──────────────────────────────────────────────

    #[test]
    fn test_display_validation() {
        let err = PluginError::Validation("name is empty".into());
        assert_eq!(err.to_string(), "validation error: name is empty");
    }

    #[test]
    fn test_display_invalid_manifest() {
        let err = PluginError::InvalidManifest("bad version".into());
        assert_eq!(err.to_string(), "invalid manifest: bad version");
    }

    #[test]
    fn test_display_dependency() {
        let err = PluginError::Dependency("required plugin 'a' is not loaded".into());
        assert_eq!(
            err.to_string(),
            "dependency error: required plugin 'a' is not loaded"
        );
    }

    #[test]
    fn test_display_load() {
        let err = PluginError::Load("unknown source path".into());
        assert_eq!(err.to_string(), "load error: unknown source path");
    }

    #[test]
    fn test_display_lifecycle() {
        let err = PluginError::Lifecycle("install callback failed".into());
        assert_eq!(err.to_string(), "lifecycle error: install callback failed");
    }

    #[test]
    fn test_display_duplicate() {
        let err = PluginError::Duplicate("my-plugin".into());
        assert_eq!(err.to_string(), "plugin already loaded: my-plugin");
    }

    #[test]
    fn test_display_not_found() {
        let err = PluginError::NotFound("my-plugin".into());
        assert_eq!(err.to_string(), "plugin not found: my-plugin");
    }

    #[test]
    fn test_display_hook() {
        let err = PluginError::Hook("handler rejected payload".into());
        assert_eq!(err.to_string(), "hook error: handler rejected payload");
    }

    // ── From conversions ──────────────────────────────────────────────

    #[test]
    fn test_from_io_error() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file missing");
        let err: PluginError = io_err.into();
        assert!(matches!(err, PluginError::Io(_)));
        assert!(err.to_string().contains("file missing"));
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<String>("bad json{{{").unwrap_err();
        let err: PluginError = json_err.into();
        assert!(matches!(err, PluginError::Serialization(_)));
    }

    #[test]
    fn test_from_toml_error() {
        let toml_err = toml::from_str::<toml::Value>("= bad").unwrap_err();
        let err: PluginError = toml_err.into();
        assert!(matches!(err, PluginError::TomlParse(_)));
    }

    #[test]
    fn test_from_semver_error() {
        let sv_err = "not.a.version".parse::<semver::Version>().unwrap_err();
        let err: PluginError = sv_err.into();
        assert!(matches!(err, PluginError::Semver(_)));
    }

    // ── Error trait source chain ──────────────────────────────────────

    #[test]
    fn test_error_source_io() {
        use std::error::Error;
        let io_err = io::Error::new(io::ErrorKind::BrokenPipe, "pipe broken");
        let err: PluginError = io_err.into();
        assert!(err.source().is_some());
    }

    #[test]
    fn test_error_source_string_variants() {
        use std::error::Error;
        let err = PluginError::Lifecycle("timeout".into());
        assert!(err.source().is_none());
    }

    #[test]
    fn test_debug_formatting() {
        let err = PluginError::NotFound("test".into());
        let debug = format!("{:?}", err);
        assert!(debug.contains("NotFound"));
        assert!(debug.contains("test"));
    }
}
