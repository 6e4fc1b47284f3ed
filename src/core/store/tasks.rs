use anyhow::Result;
use async_trait::async_trait;
use rusqlite::{OptionalExtension, Row, params};

use super::types::{
    ExecutionStatus, ScheduledTask, TaskFilter, TaskInsert, TaskType, TaskUpdate,
    millis_to_datetime,
};
use super::{Store, TaskStore};

const TASK_COLUMNS: &str = "id, task_code, task_name, task_type, description, cron_expression, \
    enabled, platform_code, config_category, total_executions, success_executions, \
    failed_executions, last_execution_ms, last_execution_status, created_at_ms, updated_at_ms";

fn task_from_row(row: &Row<'_>) -> rusqlite::Result<ScheduledTask> {
    let task_type: String = row.get(3)?;
    let last_status: Option<String> = row.get(13)?;
    let last_ms: Option<i64> = row.get(12)?;
    Ok(ScheduledTask {
        id: row.get(0)?,
        task_code: row.get(1)?,
        task_name: row.get(2)?,
        task_type: TaskType::parse(&task_type).unwrap_or(TaskType::Custom),
        description: row.get(4)?,
        cron_expression: row.get(5)?,
        enabled: row.get::<_, i64>(6)? != 0,
        platform_code: row.get(7)?,
        config_category: row.get(8)?,
        total_executions: row.get(9)?,
        success_executions: row.get(10)?,
        failed_executions: row.get(11)?,
        last_execution_time: last_ms.map(millis_to_datetime),
        last_execution_status: last_status.as_deref().and_then(ExecutionStatus::parse),
        created_at: millis_to_datetime(row.get(14)?),
        updated_at: millis_to_datetime(row.get(15)?),
    })
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[async_trait]
impl TaskStore for Store {
    async fn find_task(&self, task_code: &str) -> Result<Option<ScheduledTask>> {
        let db = self.db.lock().await;
        let sql = format!(
            "SELECT {} FROM scheduled_task WHERE task_code = ?1 AND deleted = 0",
            TASK_COLUMNS
        );
        let task = db
            .query_row(&sql, params![task_code], task_from_row)
            .optional()?;
        Ok(task)
    }

    async fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<ScheduledTask>> {
        let db = self.db.lock().await;
        let sql = format!(
            "SELECT {} FROM scheduled_task
             WHERE deleted = 0
               AND (?1 IS NULL OR task_type = ?1)
               AND (?2 IS NULL OR platform_code = ?2)
             ORDER BY id ASC",
            TASK_COLUMNS
        );
        let mut stmt = db.prepare(&sql)?;
        let rows = stmt.query_map(
            params![
                filter.task_type.map(TaskType::as_str),
                filter.platform_code.as_deref()
            ],
            task_from_row,
        )?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    async fn insert_task(&self, task: &TaskInsert) -> Result<bool> {
        let db = self.db.lock().await;
        let now = now_ms();
        let inserted = db.execute(
            "INSERT OR IGNORE INTO scheduled_task
                (task_code, task_name, task_type, description, cron_expression, enabled,
                 platform_code, config_category, created_at_ms, updated_at_ms)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
            params![
                task.task_code,
                task.task_name,
                task.task_type.as_str(),
                task.description,
                task.cron_expression,
                task.enabled as i64,
                task.platform_code,
                task.config_category,
                now
            ],
        )?;
        Ok(inserted == 1)
    }

    async fn replace_task(&self, task_code: &str, update: &TaskUpdate) -> Result<bool> {
        let db = self.db.lock().await;
        let updated = db.execute(
            "UPDATE scheduled_task
             SET task_name = ?2, task_type = ?3, description = ?4, cron_expression = ?5,
                 enabled = ?6, platform_code = ?7, config_category = ?8, updated_at_ms = ?9
             WHERE task_code = ?1 AND deleted = 0",
            params![
                task_code,
                update.task_name,
                update.task_type.as_str(),
                update.description,
                update.cron_expression,
                update.enabled as i64,
                update.platform_code,
                update.config_category,
                now_ms()
            ],
        )?;
        Ok(updated > 0)
    }

    async fn set_task_enabled(&self, task_code: &str, enabled: bool) -> Result<bool> {
        let db = self.db.lock().await;
        let updated = db.execute(
            "UPDATE scheduled_task SET enabled = ?2, updated_at_ms = ?3
             WHERE task_code = ?1 AND deleted = 0",
            params![task_code, enabled as i64, now_ms()],
        )?;
        Ok(updated > 0)
    }

    async fn soft_delete_task(&self, task_code: &str) -> Result<bool> {
        let db = self.db.lock().await;
        let updated = db.execute(
            "UPDATE scheduled_task SET deleted = 1, enabled = 0, updated_at_ms = ?2
             WHERE task_code = ?1 AND deleted = 0",
            params![task_code, now_ms()],
        )?;
        Ok(updated > 0)
    }

    async fn record_execution(&self, task_code: &str, status: ExecutionStatus) -> Result<bool> {
        let (success, failed) = match status {
            ExecutionStatus::Success => (1i64, 0i64),
            ExecutionStatus::Failed => (0, 1),
        };
        let db = self.db.lock().await;
        let updated = db.execute(
            "UPDATE scheduled_task
             SET total_executions = total_executions + 1,
                 success_executions = success_executions + ?2,
                 failed_executions = failed_executions + ?3,
                 last_execution_ms = ?4,
                 last_execution_status = ?5
             WHERE task_code = ?1 AND deleted = 0",
            params![task_code, success, failed, now_ms(), status.as_str()],
        )?;
        Ok(updated > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn custom_task(code: &str) -> TaskInsert {
        TaskInsert {
            task_code: code.to_string(),
            task_name: "Nightly cleanup".to_string(),
            task_type: TaskType::Cleanup,
            description: None,
            cron_expression: "0 0 3 * * *".to_string(),
            enabled: false,
            platform_code: None,
            config_category: None,
        }
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_code() {
        let store = Store::open_in_memory().unwrap();
        assert!(store.insert_task(&custom_task("cleanup_logs")).await.unwrap());
        assert!(!store.insert_task(&custom_task("cleanup_logs")).await.unwrap());
    }

    #[tokio::test]
    async fn list_filters_by_type_and_platform() {
        let store = Store::open_in_memory().unwrap();
        store.insert_task(&custom_task("cleanup_logs")).await.unwrap();

        let cleanup = store
            .list_tasks(&TaskFilter {
                task_type: Some(TaskType::Cleanup),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(cleanup.len(), 1);
        assert_eq!(cleanup[0].task_code, "cleanup_logs");

        let doubao = store
            .list_tasks(&TaskFilter {
                platform_code: Some("doubao".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(doubao.len(), 1);
        assert_eq!(doubao[0].task_code, "doubao_keepalive");
    }

    #[tokio::test]
    async fn record_execution_keeps_counters_consistent() {
        let store = Store::open_in_memory().unwrap();
        store
            .record_execution("zhipu_keepalive", ExecutionStatus::Success)
            .await
            .unwrap();
        store
            .record_execution("zhipu_keepalive", ExecutionStatus::Failed)
            .await
            .unwrap();
        store
            .record_execution("zhipu_keepalive", ExecutionStatus::Success)
            .await
            .unwrap();

        let task = store.find_task("zhipu_keepalive").await.unwrap().unwrap();
        assert_eq!(task.total_executions, 3);
        assert_eq!(task.success_executions, 2);
        assert_eq!(task.failed_executions, 1);
        assert_eq!(task.last_execution_status, Some(ExecutionStatus::Success));
        assert!(task.last_execution_time.is_some());
    }

    #[tokio::test]
    async fn soft_deleted_task_is_hidden_but_code_stays_reserved() {
        let store = Store::open_in_memory().unwrap();
        store
            .record_execution("doubao_keepalive", ExecutionStatus::Failed)
            .await
            .unwrap();
        assert!(store.soft_delete_task("doubao_keepalive").await.unwrap());
        assert!(store.find_task("doubao_keepalive").await.unwrap().is_none());
        assert!(!store.soft_delete_task("doubao_keepalive").await.unwrap());
        assert!(
            !store
                .set_task_enabled("doubao_keepalive", true)
                .await
                .unwrap()
        );
        assert!(!store.insert_task(&custom_task("doubao_keepalive")).await.unwrap());
    }

    #[tokio::test]
    async fn record_execution_on_unknown_task_reports_false() {
        let store = Store::open_in_memory().unwrap();
        assert!(
            !store
                .record_execution("ghost_task", ExecutionStatus::Success)
                .await
                .unwrap()
        );
    }
}
