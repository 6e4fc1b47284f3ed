use axum::extract::{Path, Query, State};
use chrono::Local;
use std::collections::BTreeMap;

use super::super::AppState;
use super::super::response::{ApiError, ApiResult, ok};
use crate::core::adapters::LOG_TYPE_KEEPALIVE;
use crate::core::keepalive::stats::PlatformSnapshot;
use crate::core::store::types::{ExecutionLog, ExecutionStatus, LogFilter};

pub const DEFAULT_LOG_LIMIT: usize = 100;
pub const MAX_LOG_LIMIT: usize = 500;

pub async fn list_platforms(State(state): State<AppState>) -> ApiResult {
    Ok(ok(state.orchestrator.adapters().platforms()))
}

pub async fn trigger_platform(
    Path(platform): Path<String>,
    State(state): State<AppState>,
) -> ApiResult {
    Ok(ok(state.orchestrator.trigger_platform(&platform).await?))
}

pub async fn trigger_all(State(state): State<AppState>) -> ApiResult {
    Ok(ok(state.orchestrator.trigger_all().await?))
}

#[derive(Debug, Default, serde::Deserialize)]
pub struct LogsQuery {
    limit: Option<usize>,
    offset: Option<usize>,
    platform: Option<String>,
    task: Option<String>,
    status: Option<String>,
}

#[derive(Debug, serde::Serialize)]
pub struct LogPage {
    items: Vec<ExecutionLog>,
    total: u64,
    limit: usize,
    offset: usize,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

pub async fn list_logs(
    State(state): State<AppState>,
    Query(query): Query<LogsQuery>,
) -> ApiResult {
    let limit = query.limit.unwrap_or(DEFAULT_LOG_LIMIT).clamp(1, MAX_LOG_LIMIT);
    let offset = query.offset.unwrap_or(0);
    let status = match non_blank(query.status) {
        Some(raw) => Some(
            ExecutionStatus::parse(&raw)
                .ok_or_else(|| ApiError::bad_request(format!("unknown status: {}", raw)))?,
        ),
        None => None,
    };
    let filter = LogFilter {
        log_type: Some(LOG_TYPE_KEEPALIVE.to_string()),
        platform_code: non_blank(query.platform),
        task_code: non_blank(query.task),
        status,
        ..Default::default()
    };

    let logs = state.orchestrator.logs();
    let items = logs.query_logs(&filter, limit, offset).await?;
    let total = logs.count_logs(&filter).await?;
    Ok(ok(LogPage {
        items,
        total,
        limit,
        offset,
    }))
}

pub async fn keepalive_stats(State(state): State<AppState>) -> ApiResult {
    Ok(ok(state.orchestrator.keepalive_stats(Local::now()).await?))
}

#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformOverview {
    #[serde(flatten)]
    snapshot: PlatformSnapshot,
    /// Active `ai.<platform>.*` rows except the credential pool.
    config: BTreeMap<String, String>,
}

pub async fn overview(State(state): State<AppState>) -> ApiResult {
    let snapshots = state.orchestrator.platform_snapshots(Local::now()).await?;
    let mut entries = Vec::with_capacity(snapshots.len());
    for snapshot in snapshots {
        let prefix = format!("ai.{}.", snapshot.code);
        let config = state
            .store
            .list_configs_with_prefix(&prefix)
            .await?
            .into_iter()
            .filter(|record| record.is_active)
            .filter_map(|record| {
                let name = record.config_key.strip_prefix(&prefix)?.to_string();
                (name != "keys").then_some((name, record.config_value))
            })
            .collect();
        entries.push(PlatformOverview { snapshot, config });
    }
    Ok(ok(entries))
}
