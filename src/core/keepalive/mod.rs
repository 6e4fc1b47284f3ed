pub mod rotation;
pub mod scheduler;
pub mod stats;
#[cfg(test)]
pub(crate) mod tests;

use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::core::adapters::registry::platform_of_task_code;
use crate::core::adapters::{
    AdapterRegistry, LOG_CATEGORY_AI, LOG_TYPE_KEEPALIVE, PlatformAdapter, mask_credential,
};
use crate::core::config::{
    ConfigProvider, credential_pool_key, parse_string_list, task_enabled_key,
};
use crate::core::error::{KeepaliveError, KeepaliveResult};
use crate::core::store::LogSink;
use crate::core::store::types::{
    ExecutionLog, ExecutionStatus, LogContent, ScheduledTask, TaskType,
};
use crate::core::tasks::TaskRegistry;

pub use rotation::CredentialRotator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    TaskMissing,
    TaskDisabled,
    NoCredentials,
    StoreUnavailable,
}

/// Result of one pass through the pipeline on the scheduled path.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    Skipped { reason: SkipReason },
    Executed { log: ExecutionLog },
}

impl RunOutcome {
    pub fn status_label(&self) -> &'static str {
        match self {
            RunOutcome::Skipped { .. } => "skipped",
            RunOutcome::Executed { log } => log.status.as_str(),
        }
    }

    #[cfg(test)]
    pub fn log(&self) -> Option<&ExecutionLog> {
        match self {
            RunOutcome::Executed { log } => Some(log),
            RunOutcome::Skipped { .. } => None,
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRunReport {
    pub task_code: String,
    pub status: &'static str,
    #[serde(flatten)]
    pub outcome: RunOutcome,
}

/// Why a run stopped before an adapter produced a log.
enum Halt {
    NoCredentials(String),
    Unresolvable(String, KeepaliveError),
}

/// Runs one keepalive attempt per call: enablement check, credential fetch,
/// rotation, adapter call, log persistence and the statistics update.
///
/// The scheduled path never returns an error and skips silently when there is
/// nothing to do. The manual path reports every stop as a [`KeepaliveError`].
pub struct KeepaliveOrchestrator {
    tasks: TaskRegistry,
    adapters: Arc<AdapterRegistry>,
    rotator: CredentialRotator,
    config: Arc<dyn ConfigProvider>,
    logs: Arc<dyn LogSink>,
}

impl KeepaliveOrchestrator {
    pub fn new(
        tasks: TaskRegistry,
        adapters: Arc<AdapterRegistry>,
        config: Arc<dyn ConfigProvider>,
        logs: Arc<dyn LogSink>,
    ) -> Self {
        Self {
            tasks,
            adapters,
            rotator: CredentialRotator::new(),
            config,
            logs,
        }
    }

    pub fn tasks(&self) -> &TaskRegistry {
        &self.tasks
    }

    pub fn adapters(&self) -> &AdapterRegistry {
        &self.adapters
    }

    pub fn logs(&self) -> &Arc<dyn LogSink> {
        &self.logs
    }

    /// Timer entry point. Failures are logged and absorbed.
    pub async fn run_scheduled(&self, task_code: &str) -> RunOutcome {
        let task = match self.tasks.find(task_code).await {
            Ok(Some(task)) => task,
            Ok(None) => {
                debug!("Keepalive {} skipped: task not found", task_code);
                return RunOutcome::Skipped {
                    reason: SkipReason::TaskMissing,
                };
            }
            Err(e) => {
                error!("Keepalive {} skipped: could not load task: {}", task_code, e);
                return RunOutcome::Skipped {
                    reason: SkipReason::StoreUnavailable,
                };
            }
        };

        if !self.is_enabled(&task).await {
            debug!("Keepalive {} skipped: task disabled", task_code);
            return RunOutcome::Skipped {
                reason: SkipReason::TaskDisabled,
            };
        }

        let log = match self.execute(&task).await {
            Ok(log) => log,
            Err(Halt::NoCredentials(platform)) => {
                warn!(
                    "Keepalive {} skipped: no API keys configured for {}",
                    task_code, platform
                );
                return RunOutcome::Skipped {
                    reason: SkipReason::NoCredentials,
                };
            }
            Err(Halt::Unresolvable(platform, e)) => {
                error!("Keepalive {} cannot dispatch: {}", task_code, e);
                failure_log(&task, &platform, None, e.to_string(), 0)
            }
        };

        let mut log = log;
        match self.logs.append(&log).await {
            Ok(id) => log.id = Some(id),
            Err(e) => error!("Failed to persist keepalive log for {}: {}", task_code, e),
        }
        if let Err(e) = self.record_stats(task_code, log.status).await {
            error!("Failed to update statistics for {}: {}", task_code, e);
        }

        info!(
            "Keepalive {} finished: {} in {}ms",
            task_code,
            log.status.as_str(),
            log.duration_ms
        );
        RunOutcome::Executed { log }
    }

    /// Administrative entry point; every stop is an error and the log is returned on completion.
    pub async fn trigger_task(&self, task_code: &str) -> KeepaliveResult<ExecutionLog> {
        let task = self.tasks.get_by_code(task_code).await?;
        if task.task_type != TaskType::Keepalive {
            return Err(KeepaliveError::InvalidInput(format!(
                "task {} is a {} task, only keepalive tasks can be triggered",
                task_code,
                task.task_type.as_str()
            )));
        }
        if !self.is_enabled(&task).await {
            return Err(KeepaliveError::TaskDisabled(task_code.to_string()));
        }

        let mut log = match self.execute(&task).await {
            Ok(log) => log,
            Err(Halt::NoCredentials(platform)) => {
                return Err(KeepaliveError::NoCredentials(platform));
            }
            Err(Halt::Unresolvable(_, e)) => return Err(e),
        };

        log.id = Some(self.logs.append(&log).await?);
        self.record_stats(task_code, log.status).await?;
        info!(
            "Manual keepalive {} finished: {} in {}ms",
            task_code,
            log.status.as_str(),
            log.duration_ms
        );
        Ok(log)
    }

    /// Manual trigger for a platform's default task.
    pub async fn trigger_platform(&self, platform_code: &str) -> KeepaliveResult<ExecutionLog> {
        let adapter = self.adapters.resolve(platform_code)?;
        self.trigger_task(&adapter.task_code()).await
    }

    /// Runs every enabled keepalive task through the scheduled pipeline, one at a time.
    pub async fn trigger_all(&self) -> KeepaliveResult<Vec<TaskRunReport>> {
        let tasks = self.tasks.list_by_type(TaskType::Keepalive).await?;
        let mut reports = Vec::new();
        for task in tasks.into_iter().filter(|t| t.enabled) {
            let outcome = self.run_scheduled(&task.task_code).await;
            reports.push(TaskRunReport {
                task_code: task.task_code,
                status: outcome.status_label(),
                outcome,
            });
        }
        Ok(reports)
    }

    pub async fn credential_pool(&self, platform_code: &str) -> Vec<String> {
        let key = credential_pool_key(platform_code);
        let raw = self.config.get_string(&key, "[]").await;
        match parse_string_list(&raw) {
            Some(pool) => pool,
            None => {
                warn!("Ignoring unparsable credential pool at {}", key);
                Vec::new()
            }
        }
    }

    async fn record_stats(&self, task_code: &str, status: ExecutionStatus) -> KeepaliveResult<()> {
        match status {
            ExecutionStatus::Success => self.tasks.record_success(task_code).await,
            ExecutionStatus::Failed => self.tasks.record_failure(task_code).await,
        }
    }

    /// Row flag combined with the `task.<code>.enabled` config override.
    pub(crate) async fn is_enabled(&self, task: &ScheduledTask) -> bool {
        task.enabled
            && self
                .config
                .get_bool(&task_enabled_key(&task.task_code), true)
                .await
    }

    /// Credential fetch, adapter resolution, rotation and the adapter call.
    async fn execute(&self, task: &ScheduledTask) -> Result<ExecutionLog, Halt> {
        let platform = match platform_for(task) {
            Ok(platform) => platform,
            Err(e) => return Err(Halt::Unresolvable("unknown".to_string(), e)),
        };

        let pool = self.credential_pool(&platform).await;
        if pool.is_empty() {
            return Err(Halt::NoCredentials(platform));
        }

        let resolved = match task.platform_code.as_deref().filter(|p| !p.is_empty()) {
            Some(code) => self.adapters.resolve(code),
            None => self.adapters.resolve_by_task_code(&task.task_code),
        };
        let adapter = match resolved {
            Ok(adapter) => adapter,
            Err(e) => return Err(Halt::Unresolvable(platform, e)),
        };

        let credential = match self.rotator.next(&task.task_code, &pool) {
            Ok(credential) => credential.to_string(),
            Err(_) => return Err(Halt::NoCredentials(platform)),
        };

        let mut log = invoke_isolated(adapter, task, &platform, credential).await;
        log.task_code = task.task_code.clone();
        Ok(log)
    }
}

/// Runs the adapter on its own task so a panic becomes a failed log.
async fn invoke_isolated(
    adapter: Arc<dyn PlatformAdapter>,
    task: &ScheduledTask,
    platform: &str,
    credential: String,
) -> ExecutionLog {
    let started = Instant::now();
    let masked = mask_credential(adapter.mask_prefix(), &credential);
    let handle = tokio::spawn(async move { adapter.call_keepalive(&credential, None).await });
    match handle.await {
        Ok(log) => log,
        Err(e) => {
            let elapsed = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
            error!("Keepalive adapter for {} aborted: {}", task.task_code, e);
            failure_log(
                task,
                platform,
                Some(masked),
                format!("adapter aborted: {}", e),
                elapsed,
            )
        }
    }
}

fn platform_for(task: &ScheduledTask) -> KeepaliveResult<String> {
    match task.platform_code.as_deref().filter(|p| !p.is_empty()) {
        Some(platform) => Ok(platform.to_string()),
        None => Ok(platform_of_task_code(&task.task_code)?.to_string()),
    }
}

/// Outcome log for runs that never produced an adapter log.
fn failure_log(
    task: &ScheduledTask,
    platform: &str,
    masked_credential: Option<String>,
    message: String,
    duration_ms: u64,
) -> ExecutionLog {
    ExecutionLog {
        id: None,
        log_type: LOG_TYPE_KEEPALIVE.to_string(),
        log_category: LOG_CATEGORY_AI.to_string(),
        platform_code: platform.to_string(),
        task_code: task.task_code.clone(),
        title: format!("{}保活失败", task.task_name),
        model: None,
        status: ExecutionStatus::Failed,
        error_message: Some(message.clone()),
        content: LogContent {
            api_key_masked: masked_credential.unwrap_or_default(),
            error: Some(message),
            ..Default::default()
        },
        duration_ms,
        created_at: Utc::now(),
    }
}
