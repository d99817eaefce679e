//! User repository
//!
//! Database operations for users and their role assignments.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sf_core::traits::Id;
use sf_core::types::UserStatus;
use sf_models::{UpdateUser, User};
use sf_queries::{QueryModel, QueryResponse};
use sqlx::{FromRow, PgPool};

use crate::query_executor::{ColumnKind, ColumnSpec, QueryExecutor, Resource};
use crate::repository::{Repository, RepositoryError, RepositoryResult};
use crate::roles::RoleRow;

const USER_COLUMNS: &str =
    "id, email, first_name, last_name, password_hash, status, is_admin, created_at, updated_at";

/// User database entity
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub status: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRow {
    /// Unknown status strings read as locked
    pub fn status(&self) -> UserStatus {
        UserStatus::parse(&self.status).unwrap_or(UserStatus::Locked)
    }

    pub fn is_active(&self) -> bool {
        self.status().can_login()
    }

    pub fn into_model(self) -> User {
        User {
            status: self.status(),
            id: self.id,
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
            is_admin: self.is_admin,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        row.into_model()
    }
}

impl Resource for UserRow {
    const TABLE: &'static str = "users";
    const SELECT: &'static str = USER_COLUMNS;
    const COLUMNS: &'static [ColumnSpec] = &[
        ColumnSpec::new("id", "id", ColumnKind::Integer),
        ColumnSpec::new("email", "email", ColumnKind::Text),
        ColumnSpec::new("firstName", "first_name", ColumnKind::Text),
        ColumnSpec::new("lastName", "last_name", ColumnKind::Text),
        ColumnSpec::new("status", "status", ColumnKind::Text),
        ColumnSpec::new("isAdmin", "is_admin", ColumnKind::Boolean),
        ColumnSpec::new("createdAt", "created_at", ColumnKind::Timestamp),
        ColumnSpec::new("updatedAt", "updated_at", ColumnKind::Timestamp),
    ];
}

/// Insert payload; the password arrives already hashed
#[derive(Debug, Clone)]
pub struct NewUserRecord {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub status: UserStatus,
    pub is_admin: bool,
}

/// User repository implementation
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Filtered, sorted, paged listing
    pub async fn list(&self, model: &QueryModel, default_limit: u64) -> RepositoryResult<QueryResponse<UserRow>> {
        QueryExecutor::new(&self.pool, default_limit)
            .execute::<UserRow>(model)
            .await
    }

    /// Find a user by email (stored lowercased)
    pub async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<UserRow>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE email = $1",
            USER_COLUMNS
        ))
        .bind(email.trim().to_lowercase())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn update_password(&self, id: Id, password_hash: &str) -> RepositoryResult<()> {
        let result = sqlx::query("UPDATE users SET password_hash = $1, updated_at = NOW() WHERE id = $2")
            .bind(password_hash)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("User with id {} not found", id)));
        }
        Ok(())
    }

    /// Roles currently held by a user
    pub async fn roles(&self, user_id: Id) -> RepositoryResult<Vec<RoleRow>> {
        let rows = sqlx::query_as::<_, RoleRow>(
            r#"
            SELECT r.id, r.name, r.description, r.permissions, r.created_at, r.updated_at
            FROM roles r
            INNER JOIN user_roles ur ON ur.role_id = r.id
            WHERE ur.user_id = $1
            ORDER BY r.name ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Union of the permissions granted by every role the user holds
    pub async fn permissions(&self, user_id: Id) -> RepositoryResult<Vec<String>> {
        let permissions = sqlx::query_scalar::<_, String>(
            r#"
            SELECT DISTINCT p.permission
            FROM user_roles ur
            INNER JOIN roles r ON r.id = ur.role_id
            CROSS JOIN LATERAL unnest(r.permissions) AS p(permission)
            WHERE ur.user_id = $1
            ORDER BY p.permission
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(permissions)
    }

    /// Replace the user's role set
    pub async fn set_roles(&self, user_id: Id, role_ids: &[Id]) -> RepositoryResult<Vec<RoleRow>> {
        let mut tx = self.pool.begin().await?;

        let known = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM roles WHERE id = ANY($1)")
            .bind(role_ids)
            .fetch_one(&mut *tx)
            .await?;
        if known != role_ids.len() as i64 {
            return Err(RepositoryError::NotFound("One or more roles do not exist".to_string()));
        }

        sqlx::query("DELETE FROM user_roles WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("INSERT INTO user_roles (user_id, role_id) SELECT $1, unnest($2::BIGINT[])")
            .bind(user_id)
            .bind(role_ids)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::info!(user_id, roles = ?role_ids, "User roles replaced");

        self.roles(user_id).await
    }

    /// Grant a role by name; returns false when no such role exists
    pub async fn assign_role_by_name(&self, user_id: Id, role_name: &str) -> RepositoryResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO user_roles (user_id, role_id)
            SELECT $1, id FROM roles WHERE name = $2
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(role_name)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl Repository<UserRow, NewUserRecord, UpdateUser> for UserRepository {
    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<UserRow>> {
        QueryExecutor::new(&self.pool, 1).find_one::<UserRow>(id).await
    }

    async fn create(&self, dto: NewUserRecord) -> RepositoryResult<UserRow> {
        sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO users (
                email, first_name, last_name, password_hash, status, is_admin, created_at, updated_at
            ) VALUES (
                $1, $2, $3, $4, $5, $6, NOW(), NOW()
            )
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(dto.email.trim().to_lowercase())
        .bind(&dto.first_name)
        .bind(&dto.last_name)
        .bind(&dto.password_hash)
        .bind(dto.status.as_str())
        .bind(dto.is_admin)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::on_unique_violation(e, "Email has already been taken"))
    }

    async fn update(&self, id: Id, dto: UpdateUser) -> RepositoryResult<UserRow> {
        sqlx::query_as::<_, UserRow>(&format!(
            r#"
            UPDATE users SET
                email = COALESCE($1, email),
                first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                status = COALESCE($4, status),
                is_admin = COALESCE($5, is_admin),
                updated_at = NOW()
            WHERE id = $6
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(dto.email.map(|e| e.trim().to_lowercase()))
        .bind(&dto.first_name)
        .bind(&dto.last_name)
        .bind(dto.status.map(|s| s.as_str()))
        .bind(dto.is_admin)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::on_unique_violation(e, "Email has already been taken"))?
        .ok_or_else(|| RepositoryError::NotFound(format!("User with id {} not found", id)))
    }

    async fn delete(&self, id: Id) -> RepositoryResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("User with id {} not found", id)));
        }

        Ok(())
    }

    async fn exists(&self, id: Id) -> RepositoryResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        Ok(exists)
    }
}
