use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
};
use chrono::Local;
use tracing::warn;

use super::super::AppState;
use super::super::response::{ApiError, ApiResult, ok, ok_message};
use crate::core::keepalive::scheduler::validate_cron;
use crate::core::store::types::{ScheduledTask, TaskType, TaskUpdate};
use crate::core::tasks::NewTask;

/// Keeps the cron job in step with the stored definition; the row is already committed.
async fn resync(state: &AppState, task: &ScheduledTask) {
    if let Err(e) = state.scheduler.sync_task(task).await {
        warn!("Could not reschedule {}: {}", task.task_code, e);
    }
}

pub async fn list_tasks(State(state): State<AppState>) -> ApiResult {
    Ok(ok(state.orchestrator.tasks().list_all().await?))
}

pub async fn create_task(
    State(state): State<AppState>,
    payload: Result<Json<NewTask>, JsonRejection>,
) -> ApiResult {
    let Json(new) = payload?;
    if let Some(cron) = new.cron_expression.as_deref().filter(|c| !c.trim().is_empty()) {
        validate_cron(cron.trim())?;
    }
    let task = state.orchestrator.tasks().create(new).await?;
    resync(&state, &task).await;
    Ok(ok(task))
}

pub async fn task_stats(State(state): State<AppState>) -> ApiResult {
    Ok(ok(state.orchestrator.task_stats(Local::now()).await?))
}

pub async fn get_task(Path(code): Path<String>, State(state): State<AppState>) -> ApiResult {
    Ok(ok(state.orchestrator.tasks().get_by_code(&code).await?))
}

pub async fn update_task(
    Path(code): Path<String>,
    State(state): State<AppState>,
    payload: Result<Json<TaskUpdate>, JsonRejection>,
) -> ApiResult {
    let Json(update) = payload?;
    validate_cron(update.cron_expression.trim())?;
    let task = state.orchestrator.tasks().update(&code, update).await?;
    resync(&state, &task).await;
    Ok(ok(task))
}

pub async fn delete_task(Path(code): Path<String>, State(state): State<AppState>) -> ApiResult {
    state.orchestrator.tasks().soft_delete(&code).await?;
    if let Err(e) = state.scheduler.unschedule(&code).await {
        warn!("Could not unschedule {}: {}", code, e);
    }
    Ok(ok_message(format!("task {} deleted", code)))
}

pub async fn list_by_type(
    Path(task_type): Path<String>,
    State(state): State<AppState>,
) -> ApiResult {
    let parsed = TaskType::parse(&task_type)
        .ok_or_else(|| ApiError::bad_request(format!("unknown task type: {}", task_type)))?;
    Ok(ok(state.orchestrator.tasks().list_by_type(parsed).await?))
}

pub async fn list_by_platform(
    Path(platform): Path<String>,
    State(state): State<AppState>,
) -> ApiResult {
    Ok(ok(state.orchestrator.tasks().list_by_platform(&platform).await?))
}

#[derive(Debug, serde::Deserialize)]
pub struct ToggleRequest {
    enabled: bool,
}

pub async fn toggle_task(
    Path(code): Path<String>,
    State(state): State<AppState>,
    payload: Result<Json<ToggleRequest>, JsonRejection>,
) -> ApiResult {
    let Json(request) = payload?;
    let tasks = state.orchestrator.tasks();
    tasks.set_enabled(&code, request.enabled).await?;
    Ok(ok(tasks.get_by_code(&code).await?))
}

pub async fn trigger_task(Path(code): Path<String>, State(state): State<AppState>) -> ApiResult {
    Ok(ok(state.orchestrator.trigger_task(&code).await?))
}
