use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use wapprove_core::domain::approval_log::{ApprovalLog, NewApprovalLog};
use wapprove_core::domain::approver::{Approver, NewApprover};
use wapprove_core::domain::department::{Department, DepartmentId, NewDepartment};
use wapprove_core::domain::notification::{NewNotification, Notification, NotificationId};
use wapprove_core::domain::request::{
    DraftUpdate, NewRequest, Request, RequestId, RequestItem, RequestStatus, UrgencyLevel,
};
use wapprove_core::domain::user::{NewUser, User, UserId};
use wapprove_core::visibility::VisibilityFilter;

pub mod approval_log;
pub mod approver;
pub mod department;
pub mod notification;
pub mod request;
pub mod user;

pub use approval_log::SqlApprovalLogRepository;
pub use approver::SqlApproverRepository;
pub use department::SqlDepartmentRepository;
pub use notification::SqlNotificationRepository;
pub use request::{ListMeta, Page, RequestListFilter, RequestSortBy, SortOrder, SqlRequestRepository};
pub use user::SqlUserRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),
}

impl RepositoryError {
    /// Folds sqlx unique-constraint failures into `UniqueViolation` so
    /// callers can branch on them without inspecting driver messages.
    pub(crate) fn from_sqlx(error: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_error) = error {
            if db_error.message().contains("UNIQUE constraint failed") {
                return Self::UniqueViolation(db_error.message().to_string());
            }
        }
        Self::Database(error)
    }
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError>;
    async fn find_by_phone(&self, phone_number: &str) -> Result<Option<User>, RepositoryError>;
    async fn insert(&self, new_user: NewUser) -> Result<User, RepositoryError>;
}

#[async_trait]
pub trait DepartmentRepository: Send + Sync {
    async fn find_by_id(&self, id: DepartmentId) -> Result<Option<Department>, RepositoryError>;
    async fn find_by_code(&self, code: &str) -> Result<Option<Department>, RepositoryError>;
    async fn insert(&self, new_department: NewDepartment) -> Result<Department, RepositoryError>;
}

#[async_trait]
pub trait ApproverRepository: Send + Sync {
    /// All approver rows of a department, ordered by (level, id). The chain
    /// is re-derived from this on every decision.
    async fn list_for_department(
        &self,
        department_id: DepartmentId,
    ) -> Result<Vec<Approver>, RepositoryError>;

    async fn list_at_level(
        &self,
        department_id: DepartmentId,
        approval_level: i64,
    ) -> Result<Vec<Approver>, RepositoryError>;

    async fn find_for_user_in_department(
        &self,
        user_id: UserId,
        department_id: DepartmentId,
    ) -> Result<Option<Approver>, RepositoryError>;

    /// Departments where the user holds any approver record (director
    /// visibility scope).
    async fn department_ids_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<DepartmentId>, RepositoryError>;

    async fn insert(&self, new_approver: NewApprover) -> Result<Approver, RepositoryError>;
}

#[async_trait]
pub trait RequestRepository: Send + Sync {
    async fn find_by_id(&self, id: RequestId) -> Result<Option<Request>, RepositoryError>;
    async fn find_by_code(&self, request_code: &str) -> Result<Option<Request>, RepositoryError>;

    /// Highest request code issued under `prefix` (lexicographic max; codes
    /// are zero-padded so this is the numeric max for four-digit sequences).
    async fn latest_code_with_prefix(
        &self,
        prefix: &str,
    ) -> Result<Option<String>, RepositoryError>;

    /// Inserts the request and its items in one transaction.
    async fn create(
        &self,
        new_request: &NewRequest,
        request_code: &str,
        status: RequestStatus,
        current_approval_level: i64,
        total_amount: Decimal,
    ) -> Result<Request, RepositoryError>;

    async fn items_for(&self, request_id: RequestId) -> Result<Vec<RequestItem>, RepositoryError>;

    /// Applies a draft update (field patches plus optional full item
    /// replacement with total recomputation) in one transaction.
    async fn update_draft(
        &self,
        request_id: RequestId,
        update: &DraftUpdate,
    ) -> Result<(), RepositoryError>;

    async fn delete(&self, request_id: RequestId) -> Result<(), RepositoryError>;

    /// Unconditional status write, used after the permission gate for
    /// transitions that cannot race (reject, cancel, hold, process,
    /// complete).
    async fn set_status(
        &self,
        request_id: RequestId,
        status: RequestStatus,
        current_approval_level: i64,
        status_note: Option<&str>,
    ) -> Result<(), RepositoryError>;

    /// Conditional advance keyed on the expected (status, level) pair.
    /// Returns whether a row changed; under concurrent quorum completion
    /// exactly one caller observes `true`.
    async fn transition_status(
        &self,
        request_id: RequestId,
        expected_status: RequestStatus,
        expected_level: i64,
        new_status: RequestStatus,
        new_level: i64,
    ) -> Result<bool, RepositoryError>;

    async fn list(
        &self,
        filter: &RequestListFilter,
        visibility: &VisibilityFilter,
        page: Page,
    ) -> Result<(Vec<Request>, ListMeta), RepositoryError>;
}

#[async_trait]
pub trait ApprovalLogRepository: Send + Sync {
    async fn has_approved(
        &self,
        request_id: RequestId,
        approver_user_id: UserId,
    ) -> Result<bool, RepositoryError>;

    /// Appends one decision row. A duplicate APPROVED decision surfaces as
    /// `RepositoryError::UniqueViolation` from the partial unique index.
    async fn record(&self, decision: NewApprovalLog) -> Result<ApprovalLog, RepositoryError>;

    async fn list_for_request(
        &self,
        request_id: RequestId,
    ) -> Result<Vec<ApprovalLog>, RepositoryError>;
}

#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn record(&self, notification: NewNotification) -> Result<Notification, RepositoryError>;

    async fn find_by_message_sid(
        &self,
        message_sid: &str,
    ) -> Result<Option<Notification>, RepositoryError>;

    async fn mark_sent(&self, id: NotificationId, sent: bool) -> Result<(), RepositoryError>;
    async fn mark_read(&self, id: NotificationId) -> Result<(), RepositoryError>;

    async fn history(
        &self,
        user_id: Option<UserId>,
        request_id: Option<RequestId>,
    ) -> Result<Vec<Notification>, RepositoryError>;
}

pub(crate) fn decode_err(error: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::Decode(error.to_string())
}

pub(crate) fn parse_datetime(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

pub(crate) fn parse_date(value: &str) -> Result<NaiveDate, RepositoryError> {
    value
        .parse::<NaiveDate>()
        .map_err(|_| RepositoryError::Decode(format!("invalid date `{value}`")))
}

pub(crate) fn parse_decimal(value: &str) -> Result<Decimal, RepositoryError> {
    value
        .parse::<Decimal>()
        .map_err(|_| RepositoryError::Decode(format!("invalid decimal `{value}`")))
}

pub(crate) fn parse_status(value: &str) -> Result<RequestStatus, RepositoryError> {
    RequestStatus::parse(value)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown request status `{value}`")))
}

pub(crate) fn parse_urgency(value: &str) -> Result<UrgencyLevel, RepositoryError> {
    UrgencyLevel::parse(value)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown urgency level `{value}`")))
}
