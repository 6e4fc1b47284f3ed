use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
};
use tracing::info;

use super::super::AppState;
use super::super::response::{ApiError, ApiResult, ok};
use crate::core::adapters::{LOG_CATEGORY_AI, mask_credential};
use crate::core::config::{credential_pool_key, parse_string_list};
use crate::core::store::types::ConfigRecord;

#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigEntry {
    key: String,
    value: String,
    description: Option<String>,
    is_active: bool,
    /// True when an environment overlay hides the stored value.
    shadowed: bool,
}

fn masked_value(record: &ConfigRecord) -> String {
    if !record.config_key.ends_with(".keys") {
        return record.config_value.clone();
    }
    match parse_string_list(&record.config_value) {
        Some(keys) => {
            let masked: Vec<String> = keys.iter().map(|k| mask_credential("", k)).collect();
            serde_json::to_string(&masked).unwrap_or_else(|_| "[]".to_string())
        }
        None => "<unparsable>".to_string(),
    }
}

pub async fn get_platform_config(
    Path(platform): Path<String>,
    State(state): State<AppState>,
) -> ApiResult {
    state.orchestrator.adapters().resolve(&platform)?;
    let records = state
        .store
        .list_configs_with_prefix(&format!("ai.{}.", platform))
        .await?;
    let entries: Vec<ConfigEntry> = records
        .iter()
        .map(|record| ConfigEntry {
            key: record.config_key.clone(),
            value: masked_value(record),
            description: record.description.clone(),
            is_active: record.is_active,
            shadowed: state.config.has_override(&record.config_key),
        })
        .collect();
    Ok(ok(entries))
}

#[derive(Debug, serde::Deserialize)]
pub struct ConfigUpdate {
    key: String,
    value: String,
}

pub async fn put_platform_config(
    Path(platform): Path<String>,
    State(state): State<AppState>,
    payload: Result<Json<ConfigUpdate>, JsonRejection>,
) -> ApiResult {
    let Json(update) = payload?;
    state.orchestrator.adapters().resolve(&platform)?;
    let key = update.key.trim();
    if key.is_empty() || key.contains(char::is_whitespace) {
        return Err(ApiError::bad_request("key must be a non-empty identifier"));
    }
    if matches!(key, "keys" | "prompts") && parse_string_list(&update.value).is_none() {
        return Err(ApiError::bad_request(format!(
            "{} must be a JSON array of strings",
            key
        )));
    }
    let full_key = format!("ai.{}.{}", platform, key);
    state
        .store
        .upsert_config(&full_key, &update.value, LOG_CATEGORY_AI, None)
        .await?;
    info!("Updated config {}", full_key);
    Ok(ok(serde_json::json!({ "key": full_key })))
}

#[derive(Debug, serde::Deserialize)]
pub struct KeysUpdate {
    keys: Vec<String>,
}

#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeysUpdated {
    platform: String,
    key_count: usize,
}

pub async fn put_platform_keys(
    Path(platform): Path<String>,
    State(state): State<AppState>,
    payload: Result<Json<KeysUpdate>, JsonRejection>,
) -> ApiResult {
    let Json(update) = payload?;
    state.orchestrator.adapters().resolve(&platform)?;
    let keys: Vec<String> = update
        .keys
        .into_iter()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .collect();
    if keys.is_empty() {
        return Err(ApiError::bad_request("keys must contain at least one non-blank key"));
    }
    let raw = serde_json::to_string(&keys)
        .map_err(|e| ApiError::internal(format!("could not encode keys: {}", e)))?;
    state
        .store
        .upsert_config(
            &credential_pool_key(&platform),
            &raw,
            LOG_CATEGORY_AI,
            Some("API key pool"),
        )
        .await?;
    info!("Replaced {} API key(s) for {}", keys.len(), platform);
    Ok(ok(KeysUpdated {
        platform,
        key_count: keys.len(),
    }))
}
