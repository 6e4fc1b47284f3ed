use anyhow::Result;
use async_trait::async_trait;
use rusqlite::types::Value;
use rusqlite::{Row, params, params_from_iter};

use super::types::{ExecutionLog, ExecutionStatus, LogContent, LogFilter, millis_to_datetime};
use super::{LogSink, Store};

const LOG_COLUMNS: &str = "id, log_type, log_category, platform_code, task_code, title, model, \
    status, error_message, content, duration_ms, created_at_ms";

fn log_from_row(row: &Row<'_>) -> rusqlite::Result<ExecutionLog> {
    let status: String = row.get(7)?;
    let content: String = row.get(9)?;
    let duration: i64 = row.get(10)?;
    Ok(ExecutionLog {
        id: Some(row.get(0)?),
        log_type: row.get(1)?,
        log_category: row.get(2)?,
        platform_code: row.get(3)?,
        task_code: row.get(4)?,
        title: row.get(5)?,
        model: row.get(6)?,
        status: ExecutionStatus::parse(&status).unwrap_or(ExecutionStatus::Failed),
        error_message: row.get(8)?,
        content: serde_json::from_str(&content).unwrap_or_else(|_| LogContent::default()),
        duration_ms: duration.max(0) as u64,
        created_at: millis_to_datetime(row.get(11)?),
    })
}

/// Builds the WHERE clause for a filter; every predicate is bound, never interpolated.
fn where_clause(filter: &LogFilter) -> (String, Vec<Value>) {
    let mut clauses: Vec<&str> = Vec::new();
    let mut values = Vec::new();

    if let Some(log_type) = &filter.log_type {
        clauses.push("log_type = ?");
        values.push(Value::Text(log_type.clone()));
    }
    if let Some(platform) = &filter.platform_code {
        clauses.push("platform_code = ?");
        values.push(Value::Text(platform.clone()));
    }
    if let Some(task) = &filter.task_code {
        clauses.push("task_code = ?");
        values.push(Value::Text(task.clone()));
    }
    if let Some(status) = filter.status {
        clauses.push("status = ?");
        values.push(Value::Text(status.as_str().to_string()));
    }
    if let Some(since) = filter.since {
        clauses.push("created_at_ms >= ?");
        values.push(Value::Integer(since.timestamp_millis()));
    }
    if let Some(until) = filter.until {
        clauses.push("created_at_ms < ?");
        values.push(Value::Integer(until.timestamp_millis()));
    }

    if clauses.is_empty() {
        (String::new(), values)
    } else {
        (format!(" WHERE {}", clauses.join(" AND ")), values)
    }
}

#[async_trait]
impl LogSink for Store {
    async fn append(&self, log: &ExecutionLog) -> Result<i64> {
        let content = serde_json::to_string(&log.content)?;
        let db = self.db.lock().await;
        db.execute(
            "INSERT INTO system_log
                (log_type, log_category, platform_code, task_code, title, model, status,
                 error_message, content, duration_ms, created_at_ms)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                log.log_type,
                log.log_category,
                log.platform_code,
                log.task_code,
                log.title,
                log.model,
                log.status.as_str(),
                log.error_message,
                content,
                i64::try_from(log.duration_ms).unwrap_or(i64::MAX),
                log.created_at.timestamp_millis()
            ],
        )?;
        Ok(db.last_insert_rowid())
    }

    async fn query_logs(
        &self,
        filter: &LogFilter,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<ExecutionLog>> {
        let (where_sql, mut values) = where_clause(filter);
        let sql = format!(
            "SELECT {} FROM system_log{} ORDER BY created_at_ms DESC, id DESC LIMIT ? OFFSET ?",
            LOG_COLUMNS, where_sql
        );
        values.push(Value::Integer(limit as i64));
        values.push(Value::Integer(offset as i64));

        let db = self.db.lock().await;
        let mut stmt = db.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values), log_from_row)?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    async fn count_logs(&self, filter: &LogFilter) -> Result<u64> {
        let (where_sql, values) = where_clause(filter);
        let sql = format!("SELECT COUNT(*) FROM system_log{}", where_sql);
        let db = self.db.lock().await;
        let count: i64 = db.query_row(&sql, params_from_iter(values), |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn log(platform: &str, status: ExecutionStatus, age: Duration) -> ExecutionLog {
        ExecutionLog {
            id: None,
            log_type: "keepalive".to_string(),
            log_category: "ai".to_string(),
            platform_code: platform.to_string(),
            task_code: format!("{}_keepalive", platform),
            title: "probe".to_string(),
            model: Some("m".to_string()),
            status,
            error_message: None,
            content: LogContent {
                api_key_masked: "sk-****".to_string(),
                prompt: "Hello".to_string(),
                ..Default::default()
            },
            duration_ms: 12,
            created_at: Utc::now() - age,
        }
    }

    #[tokio::test]
    async fn query_orders_newest_first_and_paginates() {
        let store = Store::open_in_memory().unwrap();
        for minutes in [30, 10, 20] {
            store
                .append(&log("zhipu", ExecutionStatus::Success, Duration::minutes(minutes)))
                .await
                .unwrap();
        }

        let page = store.query_logs(&LogFilter::default(), 2, 0).await.unwrap();
        assert_eq!(page.len(), 2);
        assert!(page[0].created_at > page[1].created_at);

        let rest = store.query_logs(&LogFilter::default(), 2, 2).await.unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].content.prompt, "Hello");
    }

    #[tokio::test]
    async fn counts_respect_platform_status_and_time_range() {
        let store = Store::open_in_memory().unwrap();
        store
            .append(&log("zhipu", ExecutionStatus::Success, Duration::minutes(1)))
            .await
            .unwrap();
        store
            .append(&log("zhipu", ExecutionStatus::Failed, Duration::minutes(2)))
            .await
            .unwrap();
        store
            .append(&log("doubao", ExecutionStatus::Success, Duration::days(3)))
            .await
            .unwrap();

        let zhipu = LogFilter {
            platform_code: Some("zhipu".to_string()),
            ..Default::default()
        };
        assert_eq!(store.count_logs(&zhipu).await.unwrap(), 2);

        let failed = LogFilter {
            status: Some(ExecutionStatus::Failed),
            ..Default::default()
        };
        assert_eq!(store.count_logs(&failed).await.unwrap(), 1);

        let recent = LogFilter {
            since: Some(Utc::now() - Duration::hours(1)),
            ..Default::default()
        };
        assert_eq!(store.count_logs(&recent).await.unwrap(), 2);

        let by_task = LogFilter {
            task_code: Some("doubao_keepalive".to_string()),
            ..Default::default()
        };
        let logs = store.query_logs(&by_task, 10, 0).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].platform_code, "doubao");
    }
}
