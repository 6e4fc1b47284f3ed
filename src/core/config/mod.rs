mod settings;

pub use settings::{PlatformOverrides, Settings};

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::warn;

/// Prefix for environment variables folded into the runtime overlay.
/// `LLM_KEEPALIVE__AI__ZHIPU__KEYS` maps to `ai.zhipu.keys`.
pub const ENV_OVERLAY_PREFIX: &str = "LLM_KEEPALIVE__";

/// Read access to runtime configuration.
#[async_trait]
pub trait ConfigProvider: Send + Sync {
    async fn get_string(&self, key: &str, default: &str) -> String;

    async fn get_bool(&self, key: &str, default: bool) -> bool {
        match self
            .get_string(key, "")
            .await
            .trim()
            .to_ascii_lowercase()
            .as_str()
        {
            "true" | "1" | "yes" | "on" => true,
            "false" | "0" | "no" | "off" => false,
            _ => default,
        }
    }
}

/// A persisted key/value source sitting below the runtime overlay.
#[async_trait]
pub trait ConfigSource: Send + Sync {
    async fn lookup(&self, key: &str) -> anyhow::Result<Option<String>>;
}

/// Resolves keys as runtime overlay, then persisted store, then built-in defaults.
pub struct LayeredConfig {
    overlay: RwLock<HashMap<String, String>>,
    store: Option<Arc<dyn ConfigSource>>,
    defaults: HashMap<String, String>,
}

impl LayeredConfig {
    pub fn new(store: Option<Arc<dyn ConfigSource>>, defaults: HashMap<String, String>) -> Self {
        let mut merged = builtin_defaults();
        merged.extend(defaults);
        Self {
            overlay: RwLock::new(HashMap::new()),
            store,
            defaults: merged,
        }
    }

    pub fn set_override(&self, key: impl Into<String>, value: impl Into<String>) {
        let mut overlay = self.overlay.write().unwrap_or_else(|e| e.into_inner());
        overlay.insert(key.into(), value.into());
    }

    #[cfg(test)]
    pub fn clear_override(&self, key: &str) -> Option<String> {
        let mut overlay = self.overlay.write().unwrap_or_else(|e| e.into_inner());
        overlay.remove(key)
    }

    pub fn extend_overrides(&self, entries: HashMap<String, String>) {
        for (key, value) in entries {
            self.set_override(key, value);
        }
    }

    pub fn has_override(&self, key: &str) -> bool {
        let overlay = self.overlay.read().unwrap_or_else(|e| e.into_inner());
        overlay.contains_key(key)
    }

    pub async fn resolve(&self, key: &str) -> Option<String> {
        let overlaid = {
            let overlay = self.overlay.read().unwrap_or_else(|e| e.into_inner());
            overlay.get(key).cloned()
        };
        if overlaid.is_some() {
            return overlaid;
        }

        if let Some(store) = &self.store {
            match store.lookup(key).await {
                Ok(Some(value)) => return Some(value),
                Ok(None) => {}
                Err(e) => warn!("Config store lookup for '{}' failed: {}", key, e),
            }
        }

        self.defaults.get(key).cloned()
    }
}

#[async_trait]
impl ConfigProvider for LayeredConfig {
    async fn get_string(&self, key: &str, default: &str) -> String {
        self.resolve(key)
            .await
            .unwrap_or_else(|| default.to_string())
    }
}

fn builtin_defaults() -> HashMap<String, String> {
    ["zhipu", "doubao"]
        .iter()
        .map(|platform| (credential_pool_key(platform), "[]".to_string()))
        .collect()
}

pub fn credential_pool_key(platform: &str) -> String {
    format!("ai.{}.keys", platform)
}

pub fn prompt_pool_key(platform: &str) -> String {
    format!("ai.{}.prompts", platform)
}

pub fn task_enabled_key(task_code: &str) -> String {
    format!("task.{}.enabled", task_code)
}

/// Parses a JSON string array, dropping blank entries. `None` when unparsable.
pub fn parse_string_list(raw: &str) -> Option<Vec<String>> {
    let items: Vec<String> = serde_json::from_str(raw.trim()).ok()?;
    Some(
        items
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
    )
}

/// Collects `LLM_KEEPALIVE__SECTION__KEY=value` pairs as `section.key` overrides.
pub fn env_overrides<I>(vars: I) -> HashMap<String, String>
where
    I: IntoIterator<Item = (String, String)>,
{
    vars.into_iter()
        .filter_map(|(name, value)| {
            let rest = name.strip_prefix(ENV_OVERLAY_PREFIX)?;
            if rest.is_empty() {
                return None;
            }
            let key = rest
                .split("__")
                .map(|part| part.to_ascii_lowercase())
                .collect::<Vec<_>>()
                .join(".");
            Some((key, value))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct MapSource {
        values: Mutex<HashMap<String, String>>,
        fail: bool,
    }

    #[async_trait]
    impl ConfigSource for MapSource {
        async fn lookup(&self, key: &str) -> anyhow::Result<Option<String>> {
            if self.fail {
                anyhow::bail!("database is locked");
            }
            Ok(self.values.lock().unwrap().get(key).cloned())
        }
    }

    fn source(pairs: &[(&str, &str)], fail: bool) -> Arc<dyn ConfigSource> {
        Arc::new(MapSource {
            values: Mutex::new(
                pairs
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            ),
            fail,
        })
    }

    #[tokio::test]
    async fn overlay_beats_store_beats_defaults() {
        let defaults = HashMap::from([("ai.zhipu.model".to_string(), "default".to_string())]);
        let config = LayeredConfig::new(
            Some(source(&[("ai.zhipu.model", "stored")], false)),
            defaults,
        );
        assert_eq!(config.get_string("ai.zhipu.model", "caller").await, "stored");

        config.set_override("ai.zhipu.model", "overlay");
        assert_eq!(config.get_string("ai.zhipu.model", "caller").await, "overlay");

        config.clear_override("ai.zhipu.model");
        assert_eq!(config.get_string("ai.zhipu.model", "caller").await, "stored");
    }

    #[tokio::test]
    async fn missing_everywhere_falls_back_to_caller_default() {
        let config = LayeredConfig::new(None, HashMap::new());
        assert_eq!(config.get_string("ai.unknown.model", "fallback").await, "fallback");
        assert_eq!(config.get_string("ai.zhipu.keys", "x").await, "[]");
    }

    #[tokio::test]
    async fn store_errors_fall_through_to_defaults() {
        let defaults = HashMap::from([("k".to_string(), "builtin".to_string())]);
        let config = LayeredConfig::new(Some(source(&[("k", "stored")], true)), defaults);
        assert_eq!(config.get_string("k", "caller").await, "builtin");
    }

    #[tokio::test]
    async fn get_bool_parses_common_spellings() {
        let config = LayeredConfig::new(None, HashMap::new());
        config.set_override("a", "TRUE");
        config.set_override("b", "0");
        config.set_override("c", "maybe");
        assert!(config.get_bool("a", false).await);
        assert!(!config.get_bool("b", true).await);
        assert!(config.get_bool("c", true).await);
        assert!(!config.get_bool("absent", false).await);
    }

    #[test]
    fn parse_string_list_drops_blanks_and_rejects_garbage() {
        assert_eq!(
            parse_string_list(r#"["k1", " ", "k2 "]"#),
            Some(vec!["k1".to_string(), "k2".to_string()])
        );
        assert_eq!(parse_string_list("[]"), Some(Vec::new()));
        assert_eq!(parse_string_list("k1,k2"), None);
        assert_eq!(parse_string_list(""), None);
    }

    #[test]
    fn env_overrides_map_double_underscores_to_dots() {
        let vars = vec![
            (
                "LLM_KEEPALIVE__AI__ZHIPU__KEYS".to_string(),
                r#"["k1"]"#.to_string(),
            ),
            ("PATH".to_string(), "/usr/bin".to_string()),
            ("LLM_KEEPALIVE__".to_string(), "ignored".to_string()),
        ];
        let overrides = env_overrides(vars);
        assert_eq!(overrides.len(), 1);
        assert_eq!(overrides.get("ai.zhipu.keys").unwrap(), r#"["k1"]"#);
    }
}
