//! TTL-cached key-value settings provider over the `app_settings` table.
//!
//! Replaces ambient static access to settings with an injected handle: the
//! gate (and anything else needing company/semester configuration) receives
//! an `AppSettings` and reads through its cache. Entries expire after the
//! configured TTL; writes go through and invalidate the cached value.

use service_core::error::AppError;
use sqlx::PgConnection;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::instrument;

/// Key holding the currently active semester period code.
pub const ACTIVE_PERIOD_KEY: &str = "accounting.active_period";

#[derive(Debug, Clone)]
struct CachedValue {
    value: Option<String>,
    fetched_at: Instant,
}

#[derive(Debug, Clone)]
pub struct AppSettings {
    ttl: Duration,
    cache: Arc<RwLock<HashMap<String, CachedValue>>>,
}

impl AppSettings {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Read a setting, hitting the database only when the cached value is
    /// missing or stale. Absent keys are cached too.
    #[instrument(skip(self, conn))]
    pub async fn get(
        &self,
        conn: &mut PgConnection,
        key: &str,
    ) -> Result<Option<String>, AppError> {
        if let Some(cached) = self.fresh(key) {
            return Ok(cached);
        }

        let value: Option<String> =
            sqlx::query_scalar("SELECT value FROM app_settings WHERE key = $1")
                .bind(key)
                .fetch_optional(&mut *conn)
                .await
                .map_err(|e| {
                    AppError::DatabaseError(anyhow::anyhow!("Failed to read setting: {}", e))
                })?;

        let mut cache = self.cache.write().expect("settings cache poisoned");
        cache.insert(
            key.to_string(),
            CachedValue {
                value: value.clone(),
                fetched_at: Instant::now(),
            },
        );

        Ok(value)
    }

    /// Read a setting, falling back to `default` when absent.
    pub async fn get_or(
        &self,
        conn: &mut PgConnection,
        key: &str,
        default: &str,
    ) -> Result<String, AppError> {
        Ok(self.get(conn, key).await?.unwrap_or_else(|| default.to_string()))
    }

    /// Upsert a setting and invalidate its cached value.
    #[instrument(skip(self, conn, value))]
    pub async fn set(
        &self,
        conn: &mut PgConnection,
        key: &str,
        value: &str,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO app_settings (key, value)
            VALUES ($1, $2)
            ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&mut *conn)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to write setting: {}", e)))?;

        self.invalidate(key);
        Ok(())
    }

    /// Drop a key from the cache so the next read goes to the database.
    pub fn invalidate(&self, key: &str) {
        let mut cache = self.cache.write().expect("settings cache poisoned");
        cache.remove(key);
    }

    fn fresh(&self, key: &str) -> Option<Option<String>> {
        let cache = self.cache.read().expect("settings cache poisoned");
        let cached = cache.get(key)?;
        if cached.fetched_at.elapsed() < self.ttl {
            Some(cached.value.clone())
        } else {
            None
        }
    }
}
