use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::platform::{NativePlatform, Platform};

/// Static settings read once at startup from `config.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub storage: StorageSettings,
    pub platforms: HashMap<String, PlatformOverrides>,
    /// Seeded into the built-in defaults layer of the runtime config.
    pub defaults: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub admin_token: Option<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 17900,
            admin_token: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub database_path: Option<PathBuf>,
}

/// Per-platform tweaks layered over the built-in adapter profile.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PlatformOverrides {
    pub endpoint: Option<String>,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub timeout_secs: Option<u64>,
}

impl Settings {
    pub fn default_path() -> PathBuf {
        NativePlatform::data_dir().join("config.toml")
    }

    /// Loads settings from `path`, or from the default location when `path` is `None`.
    /// A missing default file yields defaults; a missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (Self::default_path(), false),
        };
        if !path.exists() {
            if explicit {
                anyhow::bail!("config file not found: {}", path.display());
            }
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn parse(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| NativePlatform::data_dir().join("keepalive.db"))
    }

    pub fn platform(&self, code: &str) -> PlatformOverrides {
        self.platforms.get(code).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let settings = Settings::parse("").unwrap();
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.server.port, 17900);
        assert!(settings.server.admin_token.is_none());
        assert!(settings.platforms.is_empty());
    }

    #[test]
    fn parses_sections_and_platform_overrides() {
        let settings = Settings::parse(
            r#"
            [server]
            port = 18000
            admin_token = "s3cret"

            [storage]
            database_path = "/tmp/k.db"

            [platforms.zhipu]
            model = "glm-4-air"
            timeout_secs = 5

            [defaults]
            "ai.zhipu.prompts" = '["ping"]'
            "#,
        )
        .unwrap();
        assert_eq!(settings.server.port, 18000);
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.server.admin_token.as_deref(), Some("s3cret"));
        assert_eq!(settings.database_path(), PathBuf::from("/tmp/k.db"));
        let zhipu = settings.platform("zhipu");
        assert_eq!(zhipu.model.as_deref(), Some("glm-4-air"));
        assert_eq!(zhipu.timeout_secs, Some(5));
        assert!(settings.platform("doubao").model.is_none());
        assert_eq!(settings.defaults.get("ai.zhipu.prompts").unwrap(), r#"["ping"]"#);
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(Settings::load(Some(&missing)).is_err());
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[server]\nhost = \"0.0.0.0\"\n").unwrap();
        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.server.host, "0.0.0.0");
    }
}
