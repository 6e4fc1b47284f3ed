use anyhow::Result;
use async_trait::async_trait;
use rusqlite::{OptionalExtension, params};

use super::Store;
use super::types::{ConfigRecord, millis_to_datetime};
use crate::core::config::ConfigSource;

impl Store {
    pub async fn upsert_config(
        &self,
        key: &str,
        value: &str,
        category: &str,
        description: Option<&str>,
    ) -> Result<()> {
        let db = self.db.lock().await;
        db.execute(
            "INSERT INTO system_config
                (config_key, config_value, category, description, is_active, updated_at_ms)
             VALUES (?1, ?2, ?3, ?4, 1, ?5)
             ON CONFLICT(config_key) DO UPDATE SET
                config_value = excluded.config_value,
                description = COALESCE(excluded.description, system_config.description),
                updated_at_ms = excluded.updated_at_ms",
            params![
                key,
                value,
                category,
                description,
                chrono::Utc::now().timestamp_millis()
            ],
        )?;
        Ok(())
    }

    #[cfg(test)]
    pub async fn set_config_active(&self, key: &str, active: bool) -> Result<bool> {
        let db = self.db.lock().await;
        let updated = db.execute(
            "UPDATE system_config SET is_active = ?2, updated_at_ms = ?3 WHERE config_key = ?1",
            params![key, active as i64, chrono::Utc::now().timestamp_millis()],
        )?;
        Ok(updated > 0)
    }

    pub async fn list_configs_with_prefix(&self, prefix: &str) -> Result<Vec<ConfigRecord>> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(
            "SELECT config_key, config_value, category, description, is_active, updated_at_ms
             FROM system_config
             WHERE substr(config_key, 1, length(?1)) = ?1
             ORDER BY config_key ASC",
        )?;
        let rows = stmt.query_map(params![prefix], |row| {
            Ok(ConfigRecord {
                config_key: row.get(0)?,
                config_value: row.get(1)?,
                category: row.get(2)?,
                description: row.get(3)?,
                is_active: row.get::<_, i64>(4)? != 0,
                updated_at: millis_to_datetime(row.get(5)?),
            })
        })?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }
}

#[async_trait]
impl ConfigSource for Store {
    async fn lookup(&self, key: &str) -> Result<Option<String>> {
        let db = self.db.lock().await;
        let value = db
            .query_row(
                "SELECT config_value FROM system_config WHERE config_key = ?1 AND is_active = 1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }
}
