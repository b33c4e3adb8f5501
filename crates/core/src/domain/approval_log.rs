use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::approver::ApproverId;
use crate::domain::request::RequestId;
use crate::domain::user::UserId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApprovalLogId(pub i64);

impl fmt::Display for ApprovalLogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalStatus {
    Approved,
    Rejected,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "APPROVED" => Some(Self::Approved),
            "REJECTED" => Some(Self::Rejected),
            _ => None,
        }
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded decision. Rows are append-only; a retry never mutates an
/// existing row. Decisions are keyed by the deciding user, so terminal
/// admin/purchasing decisions need no configured approver record;
/// `approver_id` is populated only when the decision came from a layer of
/// the department's configured chain.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ApprovalLog {
    pub id: ApprovalLogId,
    pub request_id: RequestId,
    pub approver_user_id: UserId,
    pub approver_id: Option<ApproverId>,
    pub approval_status: ApprovalStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewApprovalLog {
    pub request_id: RequestId,
    pub approver_user_id: UserId,
    pub approver_id: Option<ApproverId>,
    pub approval_status: ApprovalStatus,
    pub notes: Option<String>,
}
