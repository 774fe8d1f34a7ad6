//! Database repository for draft operations.
//!
//! Every write bumps the global revision inside the same transaction.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};

use crate::errors::{AppError, DraftError};
use crate::models::{Draft, DraftSummary, FormSnapshot, FormType, RevisionInfo};
use crate::session::DraftStore;

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get the current revision ID.
    pub async fn get_revision_id(&self) -> Result<i64, AppError> {
        let row = sqlx::query("SELECT revision_id FROM meta WHERE id = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("revision_id"))
    }

    /// Get revision info.
    pub async fn get_revision_info(&self) -> Result<RevisionInfo, AppError> {
        let row = sqlx::query("SELECT revision_id, generated_at FROM meta WHERE id = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(RevisionInfo {
            revision_id: row.get("revision_id"),
            generated_at: row.get("generated_at"),
        })
    }

    /// List a user's drafts, most recently saved first.
    pub async fn list_drafts(&self, user_id: &str) -> Result<Vec<DraftSummary>, AppError> {
        let rows = sqlx::query(
            "SELECT id, form_type, updated_at, version FROM drafts WHERE user_id = ? ORDER BY updated_at DESC, form_type",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(summary_from_row).collect()
    }

    /// Get a user's draft for one form type.
    pub async fn get_draft(
        &self,
        user_id: &str,
        form_type: FormType,
    ) -> Result<Option<Draft>, AppError> {
        let row = sqlx::query(
            "SELECT id, user_id, form_type, data, updated_at, version FROM drafts WHERE user_id = ? AND form_type = ?",
        )
        .bind(user_id)
        .bind(form_type.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(draft_from_row).transpose()
    }

    /// Create or replace a user's draft for one form type.
    pub async fn save_draft(
        &self,
        user_id: &str,
        form_type: FormType,
        data: &FormSnapshot,
    ) -> Result<Draft, AppError> {
        let now = Utc::now().to_rfc3339();
        let data_json = serde_json::to_string(data)?;

        let mut tx = self.pool.begin().await?;

        // Upsert first so the transaction takes the write lock up front.
        let row = sqlx::query(
            r#"
            INSERT INTO drafts (id, user_id, form_type, data, updated_at, version)
            VALUES (?, ?, ?, ?, ?, 1)
            ON CONFLICT (user_id, form_type) DO UPDATE SET
                data = excluded.data,
                updated_at = excluded.updated_at,
                version = drafts.version + 1
            RETURNING id, version
            "#,
        )
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(user_id)
        .bind(form_type.as_str())
        .bind(&data_json)
        .bind(&now)
        .fetch_one(&mut *tx)
        .await?;

        let id: String = row.get("id");
        let version: i64 = row.get("version");

        sqlx::query("UPDATE meta SET revision_id = revision_id + 1, generated_at = ? WHERE id = 1")
            .bind(&now)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::debug!(%form_type, user_id, version, "draft stored");

        Ok(Draft {
            id,
            user_id: user_id.to_string(),
            form_type,
            data: data.clone(),
            updated_at: now,
            version,
        })
    }

    /// Delete a user's draft for one form type.
    pub async fn delete_draft(&self, user_id: &str, form_type: FormType) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("DELETE FROM drafts WHERE user_id = ? AND form_type = ?")
            .bind(user_id)
            .bind(form_type.as_str())
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Draft {} not found", form_type)));
        }

        let now = Utc::now().to_rfc3339();
        sqlx::query("UPDATE meta SET revision_id = revision_id + 1, generated_at = ? WHERE id = 1")
            .bind(&now)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(())
    }

    /// A draft store that writes straight into this repository on behalf of one user.
    pub fn draft_store_for(self: &Arc<Self>, user_id: impl Into<String>) -> RepositoryDraftStore {
        RepositoryDraftStore {
            repo: Arc::clone(self),
            user_id: user_id.into(),
        }
    }
}

/// In-process [`DraftStore`] backed by the SQLite repository.
#[derive(Clone)]
pub struct RepositoryDraftStore {
    repo: Arc<Repository>,
    user_id: String,
}

#[async_trait]
impl DraftStore for RepositoryDraftStore {
    async fn save_draft(&self, form_type: FormType, data: &FormSnapshot) -> Result<(), DraftError> {
        self.repo
            .save_draft(&self.user_id, form_type, data)
            .await
            .map(|_| ())
            .map_err(DraftError::from)
    }
}

// Helper functions for row conversion

fn parse_form_type(raw: &str) -> Result<FormType, AppError> {
    FormType::from_str(raw)
        .ok_or_else(|| AppError::Internal(format!("Unknown form type in database: {}", raw)))
}

fn draft_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Draft, AppError> {
    let form_type: String = row.get("form_type");
    let data: String = row.get("data");
    Ok(Draft {
        id: row.get("id"),
        user_id: row.get("user_id"),
        form_type: parse_form_type(&form_type)?,
        data: serde_json::from_str(&data)?,
        updated_at: row.get("updated_at"),
        version: row.get("version"),
    })
}

fn summary_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<DraftSummary, AppError> {
    let form_type: String = row.get("form_type");
    Ok(DraftSummary {
        id: row.get("id"),
        form_type: parse_form_type(&form_type)?,
        updated_at: row.get("updated_at"),
        version: row.get("version"),
    })
}
