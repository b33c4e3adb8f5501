use chrono::Utc;
use sqlx::Row;

use wapprove_core::domain::approval_log::{
    ApprovalLog, ApprovalLogId, ApprovalStatus, NewApprovalLog,
};
use wapprove_core::domain::approver::ApproverId;
use wapprove_core::domain::request::RequestId;
use wapprove_core::domain::user::UserId;

use super::{decode_err, parse_datetime, ApprovalLogRepository, RepositoryError};
use crate::DbPool;

pub struct SqlApprovalLogRepository {
    pool: DbPool,
}

impl SqlApprovalLogRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const SELECT_COLUMNS: &str =
    "id, request_id, approver_user_id, approver_id, approval_status, notes, created_at";

fn row_to_log(row: &sqlx::sqlite::SqliteRow) -> Result<ApprovalLog, RepositoryError> {
    let id: i64 = row.try_get("id").map_err(decode_err)?;
    let request_id: i64 = row.try_get("request_id").map_err(decode_err)?;
    let approver_user_id: i64 = row.try_get("approver_user_id").map_err(decode_err)?;
    let approver_id: Option<i64> = row.try_get("approver_id").map_err(decode_err)?;
    let status_str: String = row.try_get("approval_status").map_err(decode_err)?;
    let approval_status = ApprovalStatus::parse(&status_str).ok_or_else(|| {
        RepositoryError::Decode(format!("unknown approval status `{status_str}`"))
    })?;
    let notes: Option<String> = row.try_get("notes").map_err(decode_err)?;
    let created_at: String = row.try_get("created_at").map_err(decode_err)?;

    Ok(ApprovalLog {
        id: ApprovalLogId(id),
        request_id: RequestId(request_id),
        approver_user_id: UserId(approver_user_id),
        approver_id: approver_id.map(ApproverId),
        approval_status,
        notes,
        created_at: parse_datetime(&created_at),
    })
}

#[async_trait::async_trait]
impl ApprovalLogRepository for SqlApprovalLogRepository {
    async fn has_approved(
        &self,
        request_id: RequestId,
        approver_user_id: UserId,
    ) -> Result<bool, RepositoryError> {
        let count: i64 = sqlx::query(
            "SELECT COUNT(*) AS count FROM approval_logs
             WHERE request_id = ? AND approver_user_id = ? AND approval_status = 'APPROVED'",
        )
        .bind(request_id.0)
        .bind(approver_user_id.0)
        .fetch_one(&self.pool)
        .await?
        .try_get("count")
        .map_err(decode_err)?;

        Ok(count > 0)
    }

    async fn record(&self, decision: NewApprovalLog) -> Result<ApprovalLog, RepositoryError> {
        let now = Utc::now().to_rfc3339();
        let row = sqlx::query(&format!(
            "INSERT INTO approval_logs (request_id, approver_user_id, approver_id,
                                        approval_status, notes, created_at)
             VALUES (?, ?, ?, ?, ?, ?)
             RETURNING {SELECT_COLUMNS}"
        ))
        .bind(decision.request_id.0)
        .bind(decision.approver_user_id.0)
        .bind(decision.approver_id.map(|id| id.0))
        .bind(decision.approval_status.as_str())
        .bind(&decision.notes)
        .bind(&now)
        .fetch_one(&self.pool)
        .await
        .map_err(RepositoryError::from_sqlx)?;

        row_to_log(&row)
    }

    async fn list_for_request(
        &self,
        request_id: RequestId,
    ) -> Result<Vec<ApprovalLog>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM approval_logs WHERE request_id = ? ORDER BY id ASC"
        ))
        .bind(request_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_log).collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    use wapprove_core::domain::approval_log::{ApprovalStatus, NewApprovalLog};
    use wapprove_core::domain::department::NewDepartment;
    use wapprove_core::domain::request::{NewRequest, RequestStatus, UrgencyLevel};
    use wapprove_core::domain::user::{NewUser, UserRole};
    use wapprove_core::{RequestId, UserId};

    use super::SqlApprovalLogRepository;
    use crate::repositories::{
        ApprovalLogRepository, DepartmentRepository, RepositoryError, RequestRepository,
        SqlDepartmentRepository, SqlRequestRepository, SqlUserRepository, UserRepository,
    };
    use crate::{connect_with_settings, migrations};

    async fn setup() -> (sqlx::SqlitePool, RequestId, UserId) {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");

        let department = SqlDepartmentRepository::new(pool.clone())
            .insert(NewDepartment {
                name: "Finance".to_string(),
                code: "FIN".to_string(),
                approval_layers: None,
            })
            .await
            .expect("insert department");
        let requester = SqlUserRepository::new(pool.clone())
            .insert(NewUser {
                role: UserRole::Staff,
                name: "Sari".to_string(),
                email: "sari@example.com".to_string(),
                phone_number: None,
                department_id: Some(department.id),
            })
            .await
            .expect("insert requester");
        let manager = SqlUserRepository::new(pool.clone())
            .insert(NewUser {
                role: UserRole::Manager,
                name: "Mia".to_string(),
                email: "mia@example.com".to_string(),
                phone_number: None,
                department_id: Some(department.id),
            })
            .await
            .expect("insert manager");

        let request = SqlRequestRepository::new(pool.clone())
            .create(
                &NewRequest {
                    user_id: requester.id,
                    department_id: department.id,
                    description: "toner".to_string(),
                    status_note: None,
                    urgency_level: UrgencyLevel::Medium,
                    request_date: NaiveDate::from_ymd_opt(2026, 8, 6).expect("valid date"),
                    draft: false,
                    items: Vec::new(),
                },
                "REQ-20260806-0001",
                RequestStatus::PendingManagerApproval,
                1,
                Decimal::ZERO,
            )
            .await
            .expect("create request");

        (pool, request.id, manager.id)
    }

    #[tokio::test]
    async fn record_and_query_decisions() {
        let (pool, request_id, manager_id) = setup().await;
        let repo = SqlApprovalLogRepository::new(pool);

        assert!(!repo.has_approved(request_id, manager_id).await.expect("query"));

        let log = repo
            .record(NewApprovalLog {
                request_id,
                approver_user_id: manager_id,
                approver_id: None,
                approval_status: ApprovalStatus::Approved,
                notes: Some("looks good".to_string()),
            })
            .await
            .expect("record");
        assert_eq!(log.approval_status, ApprovalStatus::Approved);
        assert_eq!(log.notes.as_deref(), Some("looks good"));

        assert!(repo.has_approved(request_id, manager_id).await.expect("query"));

        let listed = repo.list_for_request(request_id).await.expect("list");
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test]
    async fn second_approval_by_the_same_user_is_a_unique_violation() {
        let (pool, request_id, manager_id) = setup().await;
        let repo = SqlApprovalLogRepository::new(pool);

        let decision = NewApprovalLog {
            request_id,
            approver_user_id: manager_id,
            approver_id: None,
            approval_status: ApprovalStatus::Approved,
            notes: None,
        };
        repo.record(decision.clone()).await.expect("first decision");

        let error = repo.record(decision).await.expect_err("duplicate must fail");
        assert!(matches!(error, RepositoryError::UniqueViolation(_)));
    }

    #[tokio::test]
    async fn rejections_are_always_recorded() {
        let (pool, request_id, manager_id) = setup().await;
        let repo = SqlApprovalLogRepository::new(pool);

        repo.record(NewApprovalLog {
            request_id,
            approver_user_id: manager_id,
            approver_id: None,
            approval_status: ApprovalStatus::Approved,
            notes: None,
        })
        .await
        .expect("approval");

        // A rejection row for the same user is not blocked by the partial
        // unique index.
        repo.record(NewApprovalLog {
            request_id,
            approver_user_id: manager_id,
            approver_id: None,
            approval_status: ApprovalStatus::Rejected,
            notes: Some("changed my mind".to_string()),
        })
        .await
        .expect("rejection");

        let listed = repo.list_for_request(request_id).await.expect("list");
        assert_eq!(listed.len(), 2);
    }
}
