use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

use crate::core::error::{KeepaliveError, KeepaliveResult};
use crate::core::store::types::{
    ExecutionStatus, ScheduledTask, TaskFilter, TaskInsert, TaskType, TaskUpdate,
};
use crate::core::store::{DEFAULT_KEEPALIVE_CRON, TaskStore};

/// Creation payload. A missing code is generated; tasks start disabled unless asked otherwise.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    #[serde(default)]
    pub task_code: Option<String>,
    pub task_name: String,
    pub task_type: TaskType,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub cron_expression: Option<String>,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub platform_code: Option<String>,
    #[serde(default)]
    pub config_category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStats {
    pub total_tasks: u64,
    pub enabled_tasks: u64,
    /// Tasks whose most recent run happened since `since`.
    pub tasks_run_today: u64,
    pub total_success: i64,
    pub total_failed: i64,
    /// Percentage with one decimal; 100.0 before anything has run.
    pub success_rate: f64,
    pub by_type: BTreeMap<String, u64>,
}

/// Owns task definitions and is the only writer of their counters.
#[derive(Clone)]
pub struct TaskRegistry {
    store: Arc<dyn TaskStore>,
}

impl TaskRegistry {
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self { store }
    }

    pub async fn find(&self, task_code: &str) -> KeepaliveResult<Option<ScheduledTask>> {
        Ok(self.store.find_task(task_code).await?)
    }

    pub async fn get_by_code(&self, task_code: &str) -> KeepaliveResult<ScheduledTask> {
        self.find(task_code)
            .await?
            .ok_or_else(|| KeepaliveError::TaskNotFound(task_code.to_string()))
    }

    pub async fn list_all(&self) -> KeepaliveResult<Vec<ScheduledTask>> {
        Ok(self.store.list_tasks(&TaskFilter::default()).await?)
    }

    pub async fn list_by_type(&self, task_type: TaskType) -> KeepaliveResult<Vec<ScheduledTask>> {
        let filter = TaskFilter {
            task_type: Some(task_type),
            ..Default::default()
        };
        Ok(self.store.list_tasks(&filter).await?)
    }

    pub async fn list_by_platform(&self, platform_code: &str) -> KeepaliveResult<Vec<ScheduledTask>> {
        let filter = TaskFilter {
            platform_code: Some(platform_code.to_string()),
            ..Default::default()
        };
        Ok(self.store.list_tasks(&filter).await?)
    }

    /// Idempotent. Unknown or deleted codes are reported as not found.
    pub async fn set_enabled(&self, task_code: &str, enabled: bool) -> KeepaliveResult<()> {
        if !self.store.set_task_enabled(task_code, enabled).await? {
            return Err(KeepaliveError::TaskNotFound(task_code.to_string()));
        }
        info!("Task {} {}", task_code, if enabled { "enabled" } else { "disabled" });
        Ok(())
    }

    pub async fn record_success(&self, task_code: &str) -> KeepaliveResult<()> {
        self.record(task_code, ExecutionStatus::Success).await
    }

    pub async fn record_failure(&self, task_code: &str) -> KeepaliveResult<()> {
        self.record(task_code, ExecutionStatus::Failed).await
    }

    async fn record(&self, task_code: &str, status: ExecutionStatus) -> KeepaliveResult<()> {
        if !self.store.record_execution(task_code, status).await? {
            return Err(KeepaliveError::TaskNotFound(task_code.to_string()));
        }
        Ok(())
    }

    pub async fn create(&self, new: NewTask) -> KeepaliveResult<ScheduledTask> {
        let task_name = required(&new.task_name, "taskName")?;
        let platform_code = optional(new.platform_code);
        let task_code = match new.task_code.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            Some(code) => {
                if code.chars().any(char::is_whitespace) {
                    return Err(KeepaliveError::InvalidInput(
                        "taskCode must not contain whitespace".to_string(),
                    ));
                }
                code.to_string()
            }
            None => generate_task_code(platform_code.as_deref(), new.task_type, Utc::now()),
        };
        let cron_expression = optional(new.cron_expression)
            .unwrap_or_else(|| DEFAULT_KEEPALIVE_CRON.to_string());

        let insert = TaskInsert {
            task_code: task_code.clone(),
            task_name,
            task_type: new.task_type,
            description: optional(new.description),
            cron_expression,
            enabled: new.enabled,
            platform_code,
            config_category: optional(new.config_category),
        };
        if !self.store.insert_task(&insert).await? {
            return Err(KeepaliveError::TaskAlreadyExists(task_code));
        }
        info!("Created task {}", task_code);
        self.get_by_code(&task_code).await
    }

    /// Replaces the definition of a live task. Counters are untouched.
    pub async fn update(&self, task_code: &str, update: TaskUpdate) -> KeepaliveResult<ScheduledTask> {
        let update = TaskUpdate {
            task_name: required(&update.task_name, "taskName")?,
            cron_expression: required(&update.cron_expression, "cronExpression")?,
            description: optional(update.description),
            platform_code: optional(update.platform_code),
            config_category: optional(update.config_category),
            ..update
        };
        if !self.store.replace_task(task_code, &update).await? {
            return Err(KeepaliveError::TaskNotFound(task_code.to_string()));
        }
        info!("Updated task {}", task_code);
        self.get_by_code(task_code).await
    }

    /// Disables and hides the task. Counters and logs are kept.
    pub async fn soft_delete(&self, task_code: &str) -> KeepaliveResult<()> {
        if !self.store.soft_delete_task(task_code).await? {
            return Err(KeepaliveError::TaskNotFound(task_code.to_string()));
        }
        info!("Soft-deleted task {}", task_code);
        Ok(())
    }

    pub async fn stats(&self, since: DateTime<Utc>) -> KeepaliveResult<TaskStats> {
        let tasks = self.list_all().await?;
        let mut stats = TaskStats {
            total_tasks: tasks.len() as u64,
            enabled_tasks: 0,
            tasks_run_today: 0,
            total_success: 0,
            total_failed: 0,
            success_rate: 100.0,
            by_type: BTreeMap::new(),
        };
        for task in &tasks {
            if task.enabled {
                stats.enabled_tasks += 1;
            }
            if task.last_execution_time.is_some_and(|t| t >= since) {
                stats.tasks_run_today += 1;
            }
            stats.total_success += task.success_executions;
            stats.total_failed += task.failed_executions;
            *stats
                .by_type
                .entry(task.task_type.as_str().to_string())
                .or_default() += 1;
        }
        stats.success_rate = success_rate(stats.total_success, stats.total_failed);
        Ok(stats)
    }
}

pub fn success_rate(success: i64, failed: i64) -> f64 {
    let total = success + failed;
    if total <= 0 {
        return 100.0;
    }
    (success as f64 * 1000.0 / total as f64).round() / 10.0
}

fn generate_task_code(platform: Option<&str>, task_type: TaskType, now: DateTime<Utc>) -> String {
    format!(
        "{}_{}_{}",
        platform.unwrap_or("task"),
        task_type.as_str(),
        now.timestamp_millis()
    )
}

fn required(value: &str, field: &str) -> KeepaliveResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(KeepaliveError::InvalidInput(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
