//! Configuration entry repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sf_core::traits::Id;
use sf_models::{ConfigEntry, NewConfigEntry, UpdateConfigEntry};
use sf_queries::{QueryModel, QueryResponse};
use sqlx::{FromRow, PgPool};

use crate::query_executor::{ColumnKind, ColumnSpec, QueryExecutor, Resource};
use crate::repository::{Repository, RepositoryError, RepositoryResult};

const CONFIG_COLUMNS: &str = "id, key, value, description, created_at, updated_at";

#[derive(Debug, Clone, FromRow)]
pub struct ConfigEntryRow {
    pub id: i64,
    pub key: String,
    pub value: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ConfigEntryRow> for ConfigEntry {
    fn from(row: ConfigEntryRow) -> Self {
        ConfigEntry {
            id: row.id,
            key: row.key,
            value: row.value,
            description: row.description,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl Resource for ConfigEntryRow {
    const TABLE: &'static str = "configurations";
    const SELECT: &'static str = CONFIG_COLUMNS;
    const COLUMNS: &'static [ColumnSpec] = &[
        ColumnSpec::new("id", "id", ColumnKind::Integer),
        ColumnSpec::new("key", "key", ColumnKind::Text),
        ColumnSpec::new("value", "value", ColumnKind::Text),
        ColumnSpec::new("createdAt", "created_at", ColumnKind::Timestamp),
        ColumnSpec::new("updatedAt", "updated_at", ColumnKind::Timestamp),
    ];
    const DEFAULT_SORT: &'static str = "key ASC";
}

pub struct ConfigEntryRepository {
    pool: PgPool,
}

impl ConfigEntryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, model: &QueryModel, default_limit: u64) -> RepositoryResult<QueryResponse<ConfigEntryRow>> {
        QueryExecutor::new(&self.pool, default_limit)
            .execute::<ConfigEntryRow>(model)
            .await
    }

    pub async fn find_by_key(&self, key: &str) -> RepositoryResult<Option<ConfigEntryRow>> {
        let row = sqlx::query_as::<_, ConfigEntryRow>(&format!(
            "SELECT {} FROM configurations WHERE key = $1",
            CONFIG_COLUMNS
        ))
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }
}

#[async_trait]
impl Repository<ConfigEntryRow, NewConfigEntry, UpdateConfigEntry> for ConfigEntryRepository {
    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<ConfigEntryRow>> {
        QueryExecutor::new(&self.pool, 1).find_one::<ConfigEntryRow>(id).await
    }

    async fn create(&self, dto: NewConfigEntry) -> RepositoryResult<ConfigEntryRow> {
        sqlx::query_as::<_, ConfigEntryRow>(&format!(
            r#"
            INSERT INTO configurations (key, value, description, created_at, updated_at)
            VALUES ($1, $2, $3, NOW(), NOW())
            RETURNING {}
            "#,
            CONFIG_COLUMNS
        ))
        .bind(&dto.key)
        .bind(&dto.value)
        .bind(&dto.description)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            RepositoryError::on_unique_violation(e, format!("Configuration key '{}' already exists", dto.key))
        })
    }

    async fn update(&self, id: Id, dto: UpdateConfigEntry) -> RepositoryResult<ConfigEntryRow> {
        sqlx::query_as::<_, ConfigEntryRow>(&format!(
            r#"
            UPDATE configurations SET
                value = COALESCE($1, value),
                description = COALESCE($2, description),
                updated_at = NOW()
            WHERE id = $3
            RETURNING {}
            "#,
            CONFIG_COLUMNS
        ))
        .bind(&dto.value)
        .bind(&dto.description)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| RepositoryError::NotFound(format!("Configuration with id {} not found", id)))
    }

    async fn delete(&self, id: Id) -> RepositoryResult<()> {
        let result = sqlx::query("DELETE FROM configurations WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!(
                "Configuration with id {} not found",
                id
            )));
        }

        Ok(())
    }

    async fn exists(&self, id: Id) -> RepositoryResult<bool> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM configurations WHERE id = $1)")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }
}
