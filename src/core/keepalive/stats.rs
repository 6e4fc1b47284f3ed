use chrono::{DateTime, Duration, Local, Utc};
use std::collections::BTreeMap;

use super::KeepaliveOrchestrator;
use crate::core::adapters::LOG_TYPE_KEEPALIVE;
use crate::core::error::KeepaliveResult;
use crate::core::store::types::{ExecutionStatus, LogFilter};
use crate::core::tasks::TaskStats;

/// Start of the local calendar day containing `now`, in UTC.
pub fn local_day_start(now: DateTime<Local>) -> DateTime<Utc> {
    now.date_naive()
        .and_hms_opt(0, 0, 0)
        .and_then(|midnight| midnight.and_local_timezone(Local).earliest())
        .map(|start| start.with_timezone(&Utc))
        .unwrap_or_else(|| now.with_timezone(&Utc) - Duration::hours(24))
}

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatsReport {
    #[serde(flatten)]
    pub tasks: TaskStats,
    /// Outcome logs written since local midnight.
    pub today_total: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformTodayStats {
    pub count: u64,
    pub success: u64,
    pub failed: u64,
    pub enabled: bool,
}

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeepaliveStats {
    pub today_total: u64,
    pub today_success: u64,
    pub today_failed: u64,
    pub platforms: BTreeMap<String, PlatformTodayStats>,
}

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformSnapshot {
    pub code: String,
    pub name: String,
    pub model: String,
    pub task_code: String,
    pub task_enabled: bool,
    pub today_count: u64,
    pub has_keys: bool,
    pub key_count: usize,
}

impl KeepaliveOrchestrator {
    pub async fn task_stats(&self, now: DateTime<Local>) -> KeepaliveResult<TaskStatsReport> {
        let since = local_day_start(now);
        let tasks = self.tasks.stats(since).await?;
        let today_total = self
            .logs
            .count_logs(&LogFilter {
                since: Some(since),
                ..Default::default()
            })
            .await?;
        Ok(TaskStatsReport { tasks, today_total })
    }

    pub async fn keepalive_stats(&self, now: DateTime<Local>) -> KeepaliveResult<KeepaliveStats> {
        let since = local_day_start(now);
        let today = |platform: Option<&str>, status: Option<ExecutionStatus>| LogFilter {
            log_type: Some(LOG_TYPE_KEEPALIVE.to_string()),
            platform_code: platform.map(str::to_string),
            status,
            since: Some(since),
            ..Default::default()
        };

        let mut platforms = BTreeMap::new();
        for info in self.adapters.platforms() {
            let code = info.code.as_str();
            let enabled = match self.tasks.find(&info.task_code).await? {
                Some(task) => self.is_enabled(&task).await,
                None => false,
            };
            let stats = PlatformTodayStats {
                count: self.logs.count_logs(&today(Some(code), None)).await?,
                success: self
                    .logs
                    .count_logs(&today(Some(code), Some(ExecutionStatus::Success)))
                    .await?,
                failed: self
                    .logs
                    .count_logs(&today(Some(code), Some(ExecutionStatus::Failed)))
                    .await?,
                enabled,
            };
            platforms.insert(info.code, stats);
        }

        Ok(KeepaliveStats {
            today_total: self.logs.count_logs(&today(None, None)).await?,
            today_success: self
                .logs
                .count_logs(&today(None, Some(ExecutionStatus::Success)))
                .await?,
            today_failed: self
                .logs
                .count_logs(&today(None, Some(ExecutionStatus::Failed)))
                .await?,
            platforms,
        })
    }

    pub async fn platform_snapshots(
        &self,
        now: DateTime<Local>,
    ) -> KeepaliveResult<Vec<PlatformSnapshot>> {
        let since = local_day_start(now);
        let mut snapshots = Vec::new();
        for info in self.adapters.platforms() {
            let task_enabled = match self.tasks.find(&info.task_code).await? {
                Some(task) => self.is_enabled(&task).await,
                None => false,
            };
            let today_count = self
                .logs
                .count_logs(&LogFilter {
                    log_type: Some(LOG_TYPE_KEEPALIVE.to_string()),
                    platform_code: Some(info.code.clone()),
                    since: Some(since),
                    ..Default::default()
                })
                .await?;
            let key_count = self.credential_pool(&info.code).await.len();
            snapshots.push(PlatformSnapshot {
                code: info.code,
                name: info.name,
                model: info.model,
                task_code: info.task_code,
                task_enabled,
                today_count,
                has_keys: key_count > 0,
                key_count,
            });
        }
        Ok(snapshots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    #[test]
    fn day_start_is_local_midnight() {
        let now = Local.with_ymd_and_hms(2026, 3, 14, 15, 9, 26).unwrap();
        let start = local_day_start(now).with_timezone(&Local);
        assert_eq!(start.date_naive(), now.date_naive());
        assert_eq!((start.hour(), start.minute(), start.second()), (0, 0, 0));
    }
}
