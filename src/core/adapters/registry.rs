use anyhow::Result;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

use super::{ChatKeepaliveAdapter, PlatformAdapter, builtin_profiles};
use crate::core::config::{ConfigProvider, Settings};
use crate::core::error::{KeepaliveError, KeepaliveResult};

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformInfo {
    pub code: String,
    pub name: String,
    pub model: String,
    pub task_code: String,
}

/// Table from platform code to adapter, filled once at startup.
#[derive(Default, Clone)]
pub struct AdapterRegistry {
    adapters: BTreeMap<String, Arc<dyn PlatformAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the built-in platforms with any overrides from `settings`.
    pub fn builtin(settings: &Settings, config: Arc<dyn ConfigProvider>) -> Result<Self> {
        let mut registry = Self::new();
        for profile in builtin_profiles() {
            let overrides = settings.platform(&profile.code);
            let adapter =
                ChatKeepaliveAdapter::new(profile.with_overrides(&overrides), Some(config.clone()))?;
            registry.register(Arc::new(adapter));
        }
        Ok(registry)
    }

    pub fn register(&mut self, adapter: Arc<dyn PlatformAdapter>) {
        info!(
            "Registered keepalive platform: {} ({})",
            adapter.platform_code(),
            adapter.platform_name()
        );
        self.adapters
            .insert(adapter.platform_code().to_string(), adapter);
    }

    pub fn resolve(&self, platform_code: &str) -> KeepaliveResult<Arc<dyn PlatformAdapter>> {
        self.adapters
            .get(platform_code)
            .cloned()
            .ok_or_else(|| KeepaliveError::UnsupportedPlatform(platform_code.to_string()))
    }

    pub fn resolve_by_task_code(&self, task_code: &str) -> KeepaliveResult<Arc<dyn PlatformAdapter>> {
        self.resolve(platform_of_task_code(task_code)?)
    }

    pub fn platforms(&self) -> Vec<PlatformInfo> {
        self.adapters
            .values()
            .map(|a| PlatformInfo {
                code: a.platform_code().to_string(),
                name: a.platform_name().to_string(),
                model: a.model().to_string(),
                task_code: a.task_code(),
            })
            .collect()
    }
}

/// The platform segment of a task code is everything before the first `_`.
pub fn platform_of_task_code(task_code: &str) -> KeepaliveResult<&str> {
    match task_code.split_once('_') {
        Some((platform, _)) if !platform.is_empty() => Ok(platform),
        _ => Err(KeepaliveError::InvalidTaskCode(task_code.to_string())),
    }
}
