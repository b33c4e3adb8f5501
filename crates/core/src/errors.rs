use thiserror::Error;

use crate::domain::department::DepartmentId;
use crate::domain::request::{RequestId, RequestStatus};
use crate::domain::user::UserId;
use crate::workflow::gate::DenialReason;

/// Workflow error taxonomy. Every variant is recoverable at the API
/// boundary and carries a human-readable message callers surface verbatim.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum WorkflowError {
    #[error("{entity} not found")]
    NotFound { entity: &'static str },
    #[error(transparent)]
    PermissionDenied(#[from] DenialReason),
    #[error("request {request_code} is in terminal status {status} and accepts no further actions")]
    TerminalState { request_code: String, status: RequestStatus },
    #[error("request {request_code} is {status}: {detail}")]
    InvalidState { request_code: String, status: RequestStatus, detail: String },
    #[error("user {approver_user_id} has already approved request {request_id}")]
    DuplicateDecision { request_id: RequestId, approver_user_id: UserId },
    #[error("approval level {approval_level} of department {department_id} has no configured approvers")]
    ChainMisconfigured { department_id: DepartmentId, approval_level: i64 },
}

impl WorkflowError {
    /// Stable machine-readable kind, used by the HTTP layer for mapping and
    /// by clients for branching.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::PermissionDenied(_) => "permission_denied",
            Self::TerminalState { .. } | Self::InvalidState { .. } => "invalid_state",
            Self::DuplicateDecision { .. } => "duplicate_decision",
            Self::ChainMisconfigured { .. } => "chain_misconfigured",
        }
    }
}
