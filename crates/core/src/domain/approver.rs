use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::department::DepartmentId;
use crate::domain::user::UserId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApproverId(pub i64);

impl fmt::Display for ApproverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApproverType {
    Manager,
    Director,
    Purchasing,
}

impl ApproverType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manager => "MANAGER",
            Self::Director => "DIRECTOR",
            Self::Purchasing => "PURCHASING",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "MANAGER" => Some(Self::Manager),
            "DIRECTOR" => Some(Self::Director),
            "PURCHASING" => Some(Self::Purchasing),
            _ => None,
        }
    }
}

impl fmt::Display for ApproverType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Grants one user the right to decide at one level of one department's
/// chain. Several approvers may share a (department, level) pair; together
/// they form that layer's quorum group.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Approver {
    pub id: ApproverId,
    pub user_id: UserId,
    pub department_id: DepartmentId,
    pub approver_type: ApproverType,
    pub approval_level: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewApprover {
    pub user_id: UserId,
    pub department_id: DepartmentId,
    pub approver_type: ApproverType,
    pub approval_level: i64,
}
