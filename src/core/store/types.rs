use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Keepalive,
    DataCollection,
    Cleanup,
    Custom,
}

impl TaskType {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskType::Keepalive => "keepalive",
            TaskType::DataCollection => "data_collection",
            TaskType::Cleanup => "cleanup",
            TaskType::Custom => "custom",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "keepalive" => Some(TaskType::Keepalive),
            "data_collection" => Some(TaskType::DataCollection),
            "cleanup" => Some(TaskType::Cleanup),
            "custom" => Some(TaskType::Custom),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Success,
    Failed,
}

impl ExecutionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ExecutionStatus::Success => "success",
            ExecutionStatus::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "success" => Some(ExecutionStatus::Success),
            "failed" => Some(ExecutionStatus::Failed),
            _ => None,
        }
    }
}

/// Durable definition of one schedulable unit of work plus its run counters.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledTask {
    pub id: i64,
    pub task_code: String,
    pub task_name: String,
    pub task_type: TaskType,
    pub description: Option<String>,
    pub cron_expression: String,
    pub enabled: bool,
    pub platform_code: Option<String>,
    pub config_category: Option<String>,
    pub total_executions: i64,
    pub success_executions: i64,
    pub failed_executions: i64,
    pub last_execution_time: Option<DateTime<Utc>>,
    pub last_execution_status: Option<ExecutionStatus>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row inserted by the registry after the task code has been resolved.
#[derive(Debug, Clone)]
pub struct TaskInsert {
    pub task_code: String,
    pub task_name: String,
    pub task_type: TaskType,
    pub description: Option<String>,
    pub cron_expression: String,
    pub enabled: bool,
    pub platform_code: Option<String>,
    pub config_category: Option<String>,
}

/// Replaceable part of a task definition. Counters are deliberately absent.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskUpdate {
    pub task_name: String,
    pub task_type: TaskType,
    #[serde(default)]
    pub description: Option<String>,
    pub cron_expression: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub platform_code: Option<String>,
    #[serde(default)]
    pub config_category: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub task_type: Option<TaskType>,
    pub platform_code: Option<String>,
}

/// Structured payload stored with every outcome log.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogContent {
    pub api_key_masked: String,
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// One immutable execution attempt.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionLog {
    pub id: Option<i64>,
    pub log_type: String,
    pub log_category: String,
    pub platform_code: String,
    pub task_code: String,
    pub title: String,
    pub model: Option<String>,
    pub status: ExecutionStatus,
    pub error_message: Option<String>,
    pub content: LogContent,
    pub duration_ms: u64,
    pub created_at: DateTime<Utc>,
}

impl ExecutionLog {
    pub fn is_success(&self) -> bool {
        self.status == ExecutionStatus::Success
    }
}

/// Predicate over the outcome log. Unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct LogFilter {
    pub log_type: Option<String>,
    pub platform_code: Option<String>,
    pub task_code: Option<String>,
    pub status: Option<ExecutionStatus>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigRecord {
    pub config_key: String,
    pub config_value: String,
    pub category: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub updated_at: DateTime<Utc>,
}

pub(crate) fn millis_to_datetime(ms: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(ms).unwrap_or_default()
}
