use chrono::Utc;
use sqlx::Row;

use wapprove_core::domain::department::{Department, DepartmentId, NewDepartment};

use super::{decode_err, parse_datetime, DepartmentRepository, RepositoryError};
use crate::DbPool;

pub struct SqlDepartmentRepository {
    pool: DbPool,
}

impl SqlDepartmentRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const SELECT_COLUMNS: &str = "id, name, code, is_active, approval_layers, created_at, updated_at";

fn row_to_department(row: &sqlx::sqlite::SqliteRow) -> Result<Department, RepositoryError> {
    let id: i64 = row.try_get("id").map_err(decode_err)?;
    let name: String = row.try_get("name").map_err(decode_err)?;
    let code: String = row.try_get("code").map_err(decode_err)?;
    let is_active: bool = row.try_get("is_active").map_err(decode_err)?;
    let approval_layers: Option<i64> = row.try_get("approval_layers").map_err(decode_err)?;
    let created_at: String = row.try_get("created_at").map_err(decode_err)?;
    let updated_at: String = row.try_get("updated_at").map_err(decode_err)?;

    Ok(Department {
        id: DepartmentId(id),
        name,
        code,
        is_active,
        approval_layers,
        created_at: parse_datetime(&created_at),
        updated_at: parse_datetime(&updated_at),
    })
}

#[async_trait::async_trait]
impl DepartmentRepository for SqlDepartmentRepository {
    async fn find_by_id(&self, id: DepartmentId) -> Result<Option<Department>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {SELECT_COLUMNS} FROM departments WHERE id = ?"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref row) => Ok(Some(row_to_department(row)?)),
            None => Ok(None),
        }
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Department>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {SELECT_COLUMNS} FROM departments WHERE code = ?"))
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref row) => Ok(Some(row_to_department(row)?)),
            None => Ok(None),
        }
    }

    async fn insert(&self, new_department: NewDepartment) -> Result<Department, RepositoryError> {
        let now = Utc::now().to_rfc3339();
        let row = sqlx::query(&format!(
            "INSERT INTO departments (name, code, is_active, approval_layers, created_at,
                                      updated_at)
             VALUES (?, ?, 1, ?, ?, ?)
             RETURNING {SELECT_COLUMNS}"
        ))
        .bind(&new_department.name)
        .bind(&new_department.code)
        .bind(new_department.approval_layers)
        .bind(&now)
        .bind(&now)
        .fetch_one(&self.pool)
        .await
        .map_err(RepositoryError::from_sqlx)?;

        row_to_department(&row)
    }
}
