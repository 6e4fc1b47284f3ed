mod config;
mod logs;
mod tasks;
pub mod types;

use anyhow::Result;
use async_trait::async_trait;
use rusqlite::Connection;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use crate::platform::{NativePlatform, Platform};
use types::{
    ExecutionLog, ExecutionStatus, LogFilter, ScheduledTask, TaskFilter, TaskInsert, TaskUpdate,
};

/// Durable task definitions and their counters.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Looks up a live (not soft-deleted) task.
    async fn find_task(&self, task_code: &str) -> Result<Option<ScheduledTask>>;
    async fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<ScheduledTask>>;
    /// Returns `false` when the code is already taken, deleted rows included.
    async fn insert_task(&self, task: &TaskInsert) -> Result<bool>;
    async fn replace_task(&self, task_code: &str, update: &TaskUpdate) -> Result<bool>;
    async fn set_task_enabled(&self, task_code: &str, enabled: bool) -> Result<bool>;
    async fn soft_delete_task(&self, task_code: &str) -> Result<bool>;
    /// Bumps the total and the matching outcome counter in one statement.
    async fn record_execution(&self, task_code: &str, status: ExecutionStatus) -> Result<bool>;
}

/// Append-only outcome log.
#[async_trait]
pub trait LogSink: Send + Sync {
    async fn append(&self, log: &ExecutionLog) -> Result<i64>;
    async fn query_logs(
        &self,
        filter: &LogFilter,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<ExecutionLog>>;
    async fn count_logs(&self, filter: &LogFilter) -> Result<u64>;
}

/// SQLite-backed persistence for tasks, outcome logs and runtime config rows.
pub struct Store {
    db: Arc<Mutex<Connection>>,
}

impl Store {
    pub async fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            tokio::fs::create_dir_all(parent).await?;
            NativePlatform::restrict_dir_permissions(parent);
        }

        let db = Connection::open(db_path)?;
        NativePlatform::restrict_file_permissions(db_path);
        info!("Opened keepalive database at {}", db_path.display());
        Self::from_connection(db)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(db: Connection) -> Result<Self> {
        init_schema(&db)?;
        seed_defaults(&db)?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
        })
    }
}

fn init_schema(db: &Connection) -> Result<()> {
    db.execute_batch(
        "CREATE TABLE IF NOT EXISTS scheduled_task (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            task_code TEXT NOT NULL UNIQUE,
            task_name TEXT NOT NULL,
            task_type TEXT NOT NULL,
            description TEXT,
            cron_expression TEXT NOT NULL,
            enabled INTEGER NOT NULL DEFAULT 0,
            platform_code TEXT,
            config_category TEXT,
            total_executions INTEGER NOT NULL DEFAULT 0,
            success_executions INTEGER NOT NULL DEFAULT 0,
            failed_executions INTEGER NOT NULL DEFAULT 0,
            last_execution_ms INTEGER,
            last_execution_status TEXT,
            deleted INTEGER NOT NULL DEFAULT 0,
            created_at_ms INTEGER NOT NULL,
            updated_at_ms INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS system_log (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            log_type TEXT NOT NULL,
            log_category TEXT NOT NULL,
            platform_code TEXT NOT NULL,
            task_code TEXT NOT NULL,
            title TEXT NOT NULL,
            model TEXT,
            status TEXT NOT NULL,
            error_message TEXT,
            content TEXT NOT NULL,
            duration_ms INTEGER NOT NULL,
            created_at_ms INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_system_log_created ON system_log(created_at_ms);
        CREATE INDEX IF NOT EXISTS idx_system_log_platform ON system_log(platform_code, created_at_ms);
        CREATE INDEX IF NOT EXISTS idx_system_log_task ON system_log(task_code, created_at_ms);

        CREATE TABLE IF NOT EXISTS system_config (
            config_key TEXT PRIMARY KEY,
            config_value TEXT NOT NULL,
            category TEXT NOT NULL,
            description TEXT,
            is_active INTEGER NOT NULL DEFAULT 1,
            updated_at_ms INTEGER NOT NULL
        );",
    )?;
    Ok(())
}

const SEED_TASKS: &[(&str, &str, &str, &str)] = &[
    (
        "zhipu_keepalive",
        "智谱AI保活",
        "zhipu",
        "Periodic low-token call that keeps Zhipu API keys active",
    ),
    (
        "doubao_keepalive",
        "豆包AI保活",
        "doubao",
        "Periodic low-token call that keeps Doubao API keys active",
    ),
];

pub const DEFAULT_KEEPALIVE_CRON: &str = "0 */10 * * * *";

fn seed_defaults(db: &Connection) -> Result<()> {
    let now = chrono::Utc::now().timestamp_millis();
    for (code, name, platform, description) in SEED_TASKS {
        db.execute(
            "INSERT OR IGNORE INTO scheduled_task
                (task_code, task_name, task_type, description, cron_expression, enabled,
                 platform_code, config_category, created_at_ms, updated_at_ms)
             VALUES (?1, ?2, 'keepalive', ?3, ?4, 0, ?5, 'ai', ?6, ?6)",
            rusqlite::params![code, name, description, DEFAULT_KEEPALIVE_CRON, platform, now],
        )?;
        db.execute(
            "INSERT OR IGNORE INTO system_config
                (config_key, config_value, category, description, is_active, updated_at_ms)
             VALUES (?1, '[]', 'ai', ?2, 1, ?3)",
            rusqlite::params![
                format!("ai.{}.keys", platform),
                format!("API keys rotated by {}", code),
                now
            ],
        )?;
    }
    Ok(())
}
