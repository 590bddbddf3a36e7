use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::any::AnyPoolOptions;
use sqlx::{AnyPool, Row};
use std::marker::PhantomData;
use tracing::debug;

use crate::domain::entity::Entity;
use crate::domain::ports::DraftStore;
use crate::domain::value_objects::EntityId;
use crate::infrastructure::config::{default_draft_path, DraftConfig};

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS drafts (
    id TEXT PRIMARY KEY,
    body TEXT NOT NULL,
    updated_at TEXT NOT NULL
)";

/// [`DraftStore`] persisted in a SQL table, one JSON document per draft.
pub struct SqlDraftStore<E> {
    pool: AnyPool,
    _entity: PhantomData<fn() -> E>,
}

/// Open the draft database described in `cfg`, creating the table (and the
/// default data directory) when missing.
pub async fn connect<E: Entity>(cfg: &DraftConfig) -> Result<SqlDraftStore<E>> {
    sqlx::any::install_default_drivers();

    if cfg.url.is_none() {
        if let Some(dir) = default_draft_path().parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
    }

    let url = cfg.url();
    // Every connection to an in-memory SQLite database sees its own database.
    let max_connections = if url.contains(":memory:") { 1 } else { 5 };

    let pool = AnyPoolOptions::new()
        .max_connections(max_connections)
        .connect(&url)
        .await
        .with_context(|| format!("Failed to open draft database {}", url))?;

    sqlx::query(CREATE_TABLE)
        .execute(&pool)
        .await
        .context("Failed to create drafts table")?;

    debug!("Draft store ready at {}", url);

    Ok(SqlDraftStore {
        pool,
        _entity: PhantomData,
    })
}

#[async_trait]
impl<E: Entity> DraftStore<E> for SqlDraftStore<E> {
    async fn get(&self, id: &EntityId) -> Result<Option<E>> {
        let row = sqlx::query("SELECT body FROM drafts WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Failed to load draft {}", id))?;

        match row {
            Some(row) => {
                let body: String = row.try_get("body")?;
                let draft = serde_json::from_str(&body)
                    .with_context(|| format!("Draft {} is not valid JSON", id))?;
                Ok(Some(draft))
            }
            None => Ok(None),
        }
    }

    async fn put(&self, id: &EntityId, entity: &E) -> Result<()> {
        let body = serde_json::to_string(entity)?;
        sqlx::query(
            "INSERT INTO drafts (id, body, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at",
        )
        .bind(id.as_str())
        .bind(body)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to save draft {}", id))?;
        Ok(())
    }

    async fn remove(&self, id: &EntityId) -> Result<()> {
        sqlx::query("DELETE FROM drafts WHERE id = ?")
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to remove draft {}", id))?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<EntityId>> {
        let rows = sqlx::query("SELECT id FROM drafts ORDER BY updated_at DESC")
            .fetch_all(&self.pool)
            .await
            .context("Failed to list drafts")?;

        rows.iter()
            .map(|row| Ok(EntityId(row.try_get::<String, _>("id")?)))
            .collect()
    }
}
