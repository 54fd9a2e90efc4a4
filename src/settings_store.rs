//! Versioned school settings behind a swappable store.
//!
//! Every successful update bumps the version by one. Writers must send the
//! version they read; a stale version is rejected with 409 and nothing changes.

use std::fmt::Debug;

use anyhow::{Context, anyhow};
use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::types::Json;
use tokio::sync::RwLock;
use tracing::instrument;

use schoolbase_core::AppError;
use schoolbase_models::settings::SettingsPatch;
use schoolbase_models::{SchoolSettings, Versioned};

#[async_trait]
pub trait SettingsStore: Send + Sync + Debug {
    async fn current(&self) -> Result<Versioned<SchoolSettings>, AppError>;

    async fn update(
        &self,
        expected_version: i64,
        patch: &SettingsPatch,
    ) -> Result<Versioned<SchoolSettings>, AppError>;
}

fn stale_version(current: i64) -> AppError {
    AppError::conflict(anyhow!(
        "Settings were changed by someone else (current version {})",
        current
    ))
}

/// Single-row store in `app_settings`.
///
/// Until the first write the store reports version 0 with `seed` as its value.
#[derive(Debug, Clone)]
pub struct PgSettingsStore {
    db: PgPool,
    seed: SchoolSettings,
}

impl PgSettingsStore {
    pub fn new(db: PgPool, seed: SchoolSettings) -> Self {
        Self { db, seed }
    }
}

#[async_trait]
impl SettingsStore for PgSettingsStore {
    #[instrument(skip(self))]
    async fn current(&self) -> Result<Versioned<SchoolSettings>, AppError> {
        let row = sqlx::query_as::<_, (i64, Json<SchoolSettings>)>(
            "SELECT version, value FROM app_settings WHERE id = 1",
        )
        .fetch_optional(&self.db)
        .await
        .context("Failed to load settings")
        .map_err(AppError::database)?;

        Ok(match row {
            Some((version, Json(value))) => Versioned { version, value },
            None => Versioned {
                version: 0,
                value: self.seed.clone(),
            },
        })
    }

    #[instrument(skip(self, patch))]
    async fn update(
        &self,
        expected_version: i64,
        patch: &SettingsPatch,
    ) -> Result<Versioned<SchoolSettings>, AppError> {
        let mut tx = self.db.begin().await?;

        let row = sqlx::query_as::<_, (i64, Json<SchoolSettings>)>(
            "SELECT version, value FROM app_settings WHERE id = 1 FOR UPDATE",
        )
        .fetch_optional(&mut *tx)
        .await?;

        let (version, mut value) = match row {
            Some((version, Json(value))) => (version, value),
            None => (0, self.seed.clone()),
        };

        if version != expected_version {
            return Err(stale_version(version));
        }

        patch.apply(&mut value);
        let next = version + 1;

        let written = if version == 0 {
            // First write races on the insert itself
            sqlx::query(
                r#"
                INSERT INTO app_settings (id, version, value)
                VALUES (1, $1, $2)
                ON CONFLICT (id) DO NOTHING
                "#,
            )
            .bind(next)
            .bind(Json(&value))
            .execute(&mut *tx)
            .await?
        } else {
            sqlx::query(
                r#"
                UPDATE app_settings
                SET version = $1, value = $2, updated_at = NOW()
                WHERE id = 1 AND version = $3
                "#,
            )
            .bind(next)
            .bind(Json(&value))
            .bind(version)
            .execute(&mut *tx)
            .await?
        };

        if written.rows_affected() != 1 {
            return Err(stale_version(version));
        }

        tx.commit().await?;

        tracing::info!(version = next, "Settings updated");
        Ok(Versioned {
            version: next,
            value,
        })
    }
}

/// Process-local store for tests and tooling.
#[derive(Debug)]
pub struct InMemorySettingsStore {
    state: RwLock<Versioned<SchoolSettings>>,
}

impl InMemorySettingsStore {
    pub fn new(seed: SchoolSettings) -> Self {
        Self {
            state: RwLock::new(Versioned {
                version: 0,
                value: seed,
            }),
        }
    }
}

impl Default for InMemorySettingsStore {
    fn default() -> Self {
        Self::new(SchoolSettings::default())
    }
}

#[async_trait]
impl SettingsStore for InMemorySettingsStore {
    async fn current(&self) -> Result<Versioned<SchoolSettings>, AppError> {
        Ok(self.state.read().await.clone())
    }

    async fn update(
        &self,
        expected_version: i64,
        patch: &SettingsPatch,
    ) -> Result<Versioned<SchoolSettings>, AppError> {
        let mut state = self.state.write().await;
        if state.version != expected_version {
            return Err(stale_version(state.version));
        }
        patch.apply(&mut state.value);
        state.version += 1;
        Ok(state.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn test_in_memory_starts_at_version_zero() {
        let store = InMemorySettingsStore::new(SchoolSettings::default());
        let current = store.current().await.unwrap();
        assert_eq!(current.version, 0);
        assert_eq!(current.value.currency, "KES");
    }

    #[tokio::test]
    async fn test_update_bumps_version() {
        let store = InMemorySettingsStore::new(SchoolSettings::default());
        let patch = SettingsPatch {
            currency: Some("usd".into()),
            ..Default::default()
        };
        let updated = store.update(0, &patch).await.unwrap();
        assert_eq!(updated.version, 1);
        assert_eq!(updated.value.currency, "USD");
        assert_eq!(store.current().await.unwrap().version, 1);
    }

    #[tokio::test]
    async fn test_stale_version_conflicts_and_keeps_state() {
        let store = InMemorySettingsStore::new(SchoolSettings::default());
        store.update(0, &SettingsPatch::default()).await.unwrap();

        let patch = SettingsPatch {
            school_name: Some("Other".into()),
            ..Default::default()
        };
        let err = store.update(0, &patch).await.unwrap_err();
        assert_eq!(err.status, StatusCode::CONFLICT);

        let current = store.current().await.unwrap();
        assert_eq!(current.version, 1);
        assert_eq!(current.value.school_name, "Schoolbase Academy");
    }
}
