//! Role repository
//!
//! Permissions are stored as a `TEXT[]` on the role row.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sf_core::traits::Id;
use sf_models::{NewRole, Role, UpdateRole};
use sf_queries::{QueryModel, QueryResponse};
use sqlx::{FromRow, PgPool};

use crate::query_executor::{ColumnKind, ColumnSpec, QueryExecutor, Resource};
use crate::repository::{Repository, RepositoryError, RepositoryResult};

const ROLE_COLUMNS: &str = "id, name, description, permissions, created_at, updated_at";

#[derive(Debug, Clone, FromRow)]
pub struct RoleRow {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub permissions: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<RoleRow> for Role {
    fn from(row: RoleRow) -> Self {
        Role {
            id: row.id,
            name: row.name,
            description: row.description,
            permissions: row.permissions,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl Resource for RoleRow {
    const TABLE: &'static str = "roles";
    const SELECT: &'static str = ROLE_COLUMNS;
    const COLUMNS: &'static [ColumnSpec] = &[
        ColumnSpec::new("id", "id", ColumnKind::Integer),
        ColumnSpec::new("name", "name", ColumnKind::Text),
        ColumnSpec::new("description", "description", ColumnKind::Text),
        ColumnSpec::new("createdAt", "created_at", ColumnKind::Timestamp),
        ColumnSpec::new("updatedAt", "updated_at", ColumnKind::Timestamp),
    ];
    const DEFAULT_SORT: &'static str = "name ASC";
}

pub struct RoleRepository {
    pool: PgPool,
}

impl RoleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, model: &QueryModel, default_limit: u64) -> RepositoryResult<QueryResponse<RoleRow>> {
        QueryExecutor::new(&self.pool, default_limit)
            .execute::<RoleRow>(model)
            .await
    }
}

#[async_trait]
impl Repository<RoleRow, NewRole, UpdateRole> for RoleRepository {
    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<RoleRow>> {
        QueryExecutor::new(&self.pool, 1).find_one::<RoleRow>(id).await
    }

    async fn create(&self, dto: NewRole) -> RepositoryResult<RoleRow> {
        sqlx::query_as::<_, RoleRow>(&format!(
            r#"
            INSERT INTO roles (name, description, permissions, created_at, updated_at)
            VALUES ($1, $2, $3, NOW(), NOW())
            RETURNING {}
            "#,
            ROLE_COLUMNS
        ))
        .bind(&dto.name)
        .bind(&dto.description)
        .bind(&dto.permissions)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::on_unique_violation(e, "Role name has already been taken"))
    }

    async fn update(&self, id: Id, dto: UpdateRole) -> RepositoryResult<RoleRow> {
        sqlx::query_as::<_, RoleRow>(&format!(
            r#"
            UPDATE roles SET
                name = COALESCE($1, name),
                description = COALESCE($2, description),
                permissions = COALESCE($3, permissions),
                updated_at = NOW()
            WHERE id = $4
            RETURNING {}
            "#,
            ROLE_COLUMNS
        ))
        .bind(&dto.name)
        .bind(&dto.description)
        .bind(&dto.permissions)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::on_unique_violation(e, "Role name has already been taken"))?
        .ok_or_else(|| RepositoryError::NotFound(format!("Role with id {} not found", id)))
    }

    async fn delete(&self, id: Id) -> RepositoryResult<()> {
        let result = sqlx::query("DELETE FROM roles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("Role with id {} not found", id)));
        }

        Ok(())
    }

    async fn exists(&self, id: Id) -> RepositoryResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM roles WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        Ok(exists)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_to_model() {
        let role: Role = RoleRow {
            id: 2,
            name: "catalog".to_string(),
            description: Some("Catalog editors".to_string()),
            permissions: vec!["products.write".to_string()],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
        .into();

        assert!(role.grants("products.write"));
        assert_eq!(role.description.as_deref(), Some("Catalog editors"));
    }

    #[test]
    fn test_permissions_not_filterable() {
        assert!(RoleRow::column("permissions").is_none());
        assert_eq!(RoleRow::DEFAULT_SORT, "name ASC");
    }
}
