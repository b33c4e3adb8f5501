use chrono::Utc;
use sqlx::Row;

use wapprove_core::domain::department::DepartmentId;
use wapprove_core::domain::user::{NewUser, User, UserId, UserRole};

use super::{decode_err, parse_datetime, RepositoryError, UserRepository};
use crate::DbPool;

pub struct SqlUserRepository {
    pool: DbPool,
}

impl SqlUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const SELECT_COLUMNS: &str =
    "id, role, name, email, phone_number, department_id, is_active, created_at, updated_at";

fn row_to_user(row: &sqlx::sqlite::SqliteRow) -> Result<User, RepositoryError> {
    let id: i64 = row.try_get("id").map_err(decode_err)?;
    let role_str: String = row.try_get("role").map_err(decode_err)?;
    let role = UserRole::parse(&role_str)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown user role `{role_str}`")))?;
    let name: String = row.try_get("name").map_err(decode_err)?;
    let email: String = row.try_get("email").map_err(decode_err)?;
    let phone_number: Option<String> = row.try_get("phone_number").map_err(decode_err)?;
    let department_id: Option<i64> = row.try_get("department_id").map_err(decode_err)?;
    let is_active: bool = row.try_get("is_active").map_err(decode_err)?;
    let created_at: String = row.try_get("created_at").map_err(decode_err)?;
    let updated_at: String = row.try_get("updated_at").map_err(decode_err)?;

    Ok(User {
        id: UserId(id),
        role,
        name,
        email,
        phone_number,
        department_id: department_id.map(DepartmentId),
        is_active,
        created_at: parse_datetime(&created_at),
        updated_at: parse_datetime(&updated_at),
    })
}

#[async_trait::async_trait]
impl UserRepository for SqlUserRepository {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {SELECT_COLUMNS} FROM users WHERE id = ?"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref row) => Ok(Some(row_to_user(row)?)),
            None => Ok(None),
        }
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {SELECT_COLUMNS} FROM users WHERE email = ?"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref row) => Ok(Some(row_to_user(row)?)),
            None => Ok(None),
        }
    }

    async fn find_by_phone(&self, phone_number: &str) -> Result<Option<User>, RepositoryError> {
        let row =
            sqlx::query(&format!("SELECT {SELECT_COLUMNS} FROM users WHERE phone_number = ?"))
                .bind(phone_number)
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some(ref row) => Ok(Some(row_to_user(row)?)),
            None => Ok(None),
        }
    }

    async fn insert(&self, new_user: NewUser) -> Result<User, RepositoryError> {
        let now = Utc::now().to_rfc3339();
        let row = sqlx::query(&format!(
            "INSERT INTO users (role, name, email, phone_number, department_id, is_active,
                                created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, 1, ?, ?)
             RETURNING {SELECT_COLUMNS}"
        ))
        .bind(new_user.role.as_str())
        .bind(&new_user.name)
        .bind(&new_user.email)
        .bind(&new_user.phone_number)
        .bind(new_user.department_id.map(|id| id.0))
        .bind(&now)
        .bind(&now)
        .fetch_one(&self.pool)
        .await
        .map_err(RepositoryError::from_sqlx)?;

        row_to_user(&row)
    }
}
