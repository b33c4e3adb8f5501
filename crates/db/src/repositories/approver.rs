use chrono::Utc;
use sqlx::Row;

use wapprove_core::domain::approver::{Approver, ApproverId, ApproverType, NewApprover};
use wapprove_core::domain::department::DepartmentId;
use wapprove_core::domain::user::UserId;

use super::{decode_err, parse_datetime, ApproverRepository, RepositoryError};
use crate::DbPool;

pub struct SqlApproverRepository {
    pool: DbPool,
}

impl SqlApproverRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const SELECT_COLUMNS: &str =
    "id, user_id, department_id, approver_type, approval_level, created_at, updated_at";

fn row_to_approver(row: &sqlx::sqlite::SqliteRow) -> Result<Approver, RepositoryError> {
    let id: i64 = row.try_get("id").map_err(decode_err)?;
    let user_id: i64 = row.try_get("user_id").map_err(decode_err)?;
    let department_id: i64 = row.try_get("department_id").map_err(decode_err)?;
    let type_str: String = row.try_get("approver_type").map_err(decode_err)?;
    let approver_type = ApproverType::parse(&type_str)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown approver type `{type_str}`")))?;
    let approval_level: i64 = row.try_get("approval_level").map_err(decode_err)?;
    let created_at: String = row.try_get("created_at").map_err(decode_err)?;
    let updated_at: String = row.try_get("updated_at").map_err(decode_err)?;

    Ok(Approver {
        id: ApproverId(id),
        user_id: UserId(user_id),
        department_id: DepartmentId(department_id),
        approver_type,
        approval_level,
        created_at: parse_datetime(&created_at),
        updated_at: parse_datetime(&updated_at),
    })
}

#[async_trait::async_trait]
impl ApproverRepository for SqlApproverRepository {
    async fn list_for_department(
        &self,
        department_id: DepartmentId,
    ) -> Result<Vec<Approver>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM approvers
             WHERE department_id = ?
             ORDER BY approval_level ASC, id ASC"
        ))
        .bind(department_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_approver).collect()
    }

    async fn list_at_level(
        &self,
        department_id: DepartmentId,
        approval_level: i64,
    ) -> Result<Vec<Approver>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM approvers
             WHERE department_id = ? AND approval_level = ?
             ORDER BY id ASC"
        ))
        .bind(department_id.0)
        .bind(approval_level)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_approver).collect()
    }

    async fn find_for_user_in_department(
        &self,
        user_id: UserId,
        department_id: DepartmentId,
    ) -> Result<Option<Approver>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM approvers
             WHERE user_id = ? AND department_id = ?
             ORDER BY approval_level ASC
             LIMIT 1"
        ))
        .bind(user_id.0)
        .bind(department_id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref row) => Ok(Some(row_to_approver(row)?)),
            None => Ok(None),
        }
    }

    async fn department_ids_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<DepartmentId>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(
            "SELECT DISTINCT department_id FROM approvers WHERE user_id = ? ORDER BY department_id",
        )
        .bind(user_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let id: i64 = row.try_get("department_id").map_err(decode_err)?;
                Ok(DepartmentId(id))
            })
            .collect()
    }

    async fn insert(&self, new_approver: NewApprover) -> Result<Approver, RepositoryError> {
        let now = Utc::now().to_rfc3339();
        let row = sqlx::query(&format!(
            "INSERT INTO approvers (user_id, department_id, approver_type, approval_level,
                                    created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)
             RETURNING {SELECT_COLUMNS}"
        ))
        .bind(new_approver.user_id.0)
        .bind(new_approver.department_id.0)
        .bind(new_approver.approver_type.as_str())
        .bind(new_approver.approval_level)
        .bind(&now)
        .bind(&now)
        .fetch_one(&self.pool)
        .await
        .map_err(RepositoryError::from_sqlx)?;

        row_to_approver(&row)
    }
}
