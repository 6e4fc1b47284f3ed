use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::core::adapters::{AdapterRegistry, PlatformAdapter, mask_credential};
use crate::core::config::{ConfigSource, LayeredConfig};
use crate::core::keepalive::KeepaliveOrchestrator;
use crate::core::store::types::{
    ExecutionLog, ExecutionStatus, LogContent, LogFilter, ScheduledTask, TaskType,
};
use crate::core::store::{LogSink, Store, TaskStore};
use crate::core::tasks::{NewTask, TaskRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Script {
    Succeed,
    Fail,
    Panic,
}

/// Adapter double that records the credentials it was handed.
pub(crate) struct ScriptedAdapter {
    code: String,
    prefix: String,
    script: Mutex<Script>,
    seen: Mutex<Vec<String>>,
}

impl ScriptedAdapter {
    pub(crate) fn new(code: &str, prefix: &str) -> Arc<Self> {
        Arc::new(Self {
            code: code.to_string(),
            prefix: prefix.to_string(),
            script: Mutex::new(Script::Succeed),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn set_script(&self, script: Script) {
        *self.script.lock().unwrap() = script;
    }

    pub(crate) fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl PlatformAdapter for ScriptedAdapter {
    fn platform_code(&self) -> &str {
        &self.code
    }

    fn platform_name(&self) -> &str {
        &self.code
    }

    fn model(&self) -> &str {
        "scripted-model"
    }

    fn mask_prefix(&self) -> &str {
        &self.prefix
    }

    async fn call_keepalive(&self, credential: &str, prompt: Option<&str>) -> ExecutionLog {
        self.seen.lock().unwrap().push(credential.to_string());
        let script = *self.script.lock().unwrap();
        let status = match script {
            Script::Succeed => ExecutionStatus::Success,
            Script::Fail => ExecutionStatus::Failed,
            Script::Panic => panic!("scripted adapter exploded"),
        };
        ExecutionLog {
            id: None,
            log_type: "keepalive".to_string(),
            log_category: "ai".to_string(),
            platform_code: self.code.clone(),
            task_code: self.task_code(),
            title: format!("{} {}", self.code, status.as_str()),
            model: Some("scripted-model".to_string()),
            status,
            error_message: (status == ExecutionStatus::Failed).then(|| "HTTP 401".to_string()),
            content: LogContent {
                api_key_masked: mask_credential(&self.prefix, credential),
                prompt: prompt.unwrap_or("Hello").to_string(),
                ..Default::default()
            },
            duration_ms: 3,
            created_at: Utc::now(),
        }
    }
}

/// Log sink whose writes always fail; reads are empty.
pub(crate) struct BrokenLogSink;

#[async_trait]
impl LogSink for BrokenLogSink {
    async fn append(&self, _log: &ExecutionLog) -> Result<i64> {
        anyhow::bail!("disk I/O error")
    }

    async fn query_logs(
        &self,
        _filter: &LogFilter,
        _limit: usize,
        _offset: usize,
    ) -> Result<Vec<ExecutionLog>> {
        Ok(Vec::new())
    }

    async fn count_logs(&self, _filter: &LogFilter) -> Result<u64> {
        Ok(0)
    }
}

pub(crate) struct Harness {
    pub(crate) store: Arc<Store>,
    pub(crate) config: Arc<LayeredConfig>,
    pub(crate) orchestrator: Arc<KeepaliveOrchestrator>,
    pub(crate) zhipu: Arc<ScriptedAdapter>,
    pub(crate) doubao: Arc<ScriptedAdapter>,
}

impl Harness {
    pub(crate) async fn new() -> Self {
        let store = Arc::new(Store::open_in_memory().unwrap());
        Self::build(store.clone(), store)
    }

    pub(crate) async fn with_broken_logs() -> Self {
        let store = Arc::new(Store::open_in_memory().unwrap());
        Self::build(store, Arc::new(BrokenLogSink))
    }

    fn build(store: Arc<Store>, logs: Arc<dyn LogSink>) -> Self {
        let config = Arc::new(LayeredConfig::new(
            Some(store.clone() as Arc<dyn ConfigSource>),
            HashMap::new(),
        ));
        let zhipu = ScriptedAdapter::new("zhipu", "sk-");
        let doubao = ScriptedAdapter::new("doubao", "ak-");
        let mut adapters = AdapterRegistry::new();
        adapters.register(zhipu.clone());
        adapters.register(doubao.clone());

        let orchestrator = Arc::new(KeepaliveOrchestrator::new(
            TaskRegistry::new(store.clone() as Arc<dyn TaskStore>),
            Arc::new(adapters),
            config.clone(),
            logs,
        ));
        Self {
            store,
            config,
            orchestrator,
            zhipu,
            doubao,
        }
    }

    pub(crate) async fn set_keys(&self, platform: &str, keys_json: &str) {
        self.store
            .upsert_config(&format!("ai.{}.keys", platform), keys_json, "ai", None)
            .await
            .unwrap();
    }

    pub(crate) async fn enable(&self, task_code: &str) {
        self.orchestrator
            .tasks()
            .set_enabled(task_code, true)
            .await
            .unwrap();
    }

    pub(crate) async fn task(&self, task_code: &str) -> ScheduledTask {
        self.orchestrator
            .tasks()
            .get_by_code(task_code)
            .await
            .unwrap()
    }

    pub(crate) async fn log_count(&self) -> u64 {
        self.store.count_logs(&LogFilter::default()).await.unwrap()
    }
}

/// An enabled keepalive task definition.
pub(crate) fn keepalive_task(code: Option<&str>, platform: Option<&str>) -> NewTask {
    NewTask {
        task_code: code.map(str::to_string),
        task_name: "Extra probe".to_string(),
        task_type: TaskType::Keepalive,
        description: None,
        cron_expression: None,
        enabled: true,
        platform_code: platform.map(str::to_string),
        config_category: Some("ai".to_string()),
    }
}
