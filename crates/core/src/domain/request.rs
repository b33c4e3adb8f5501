use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::department::DepartmentId;
use crate::domain::user::UserId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub i64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    Draft,
    PendingManagerApproval,
    ManagerApproved,
    PendingDirectorApproval,
    DirectorApproved,
    PendingPurchasingApproval,
    PurchasingApproved,
    FullyApproved,
    Rejected,
    InProcess,
    Completed,
    Cancelled,
    OnHold,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::PendingManagerApproval => "PENDING_MANAGER_APPROVAL",
            Self::ManagerApproved => "MANAGER_APPROVED",
            Self::PendingDirectorApproval => "PENDING_DIRECTOR_APPROVAL",
            Self::DirectorApproved => "DIRECTOR_APPROVED",
            Self::PendingPurchasingApproval => "PENDING_PURCHASING_APPROVAL",
            Self::PurchasingApproved => "PURCHASING_APPROVED",
            Self::FullyApproved => "FULLY_APPROVED",
            Self::Rejected => "REJECTED",
            Self::InProcess => "IN_PROCESS",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
            Self::OnHold => "ON_HOLD",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "DRAFT" => Some(Self::Draft),
            "PENDING_MANAGER_APPROVAL" => Some(Self::PendingManagerApproval),
            "MANAGER_APPROVED" => Some(Self::ManagerApproved),
            "PENDING_DIRECTOR_APPROVAL" => Some(Self::PendingDirectorApproval),
            "DIRECTOR_APPROVED" => Some(Self::DirectorApproved),
            "PENDING_PURCHASING_APPROVAL" => Some(Self::PendingPurchasingApproval),
            "PURCHASING_APPROVED" => Some(Self::PurchasingApproved),
            "FULLY_APPROVED" => Some(Self::FullyApproved),
            "REJECTED" => Some(Self::Rejected),
            "IN_PROCESS" => Some(Self::InProcess),
            "COMPLETED" => Some(Self::Completed),
            "CANCELLED" => Some(Self::Cancelled),
            "ON_HOLD" => Some(Self::OnHold),
            _ => None,
        }
    }

    /// No workflow action is accepted against a terminal request.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Cancelled | Self::Completed)
    }

    pub fn is_pending_approval(&self) -> bool {
        matches!(
            self,
            Self::PendingManagerApproval
                | Self::PendingDirectorApproval
                | Self::PendingPurchasingApproval
        )
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UrgencyLevel {
    Low,
    #[default]
    Medium,
    High,
}

impl UrgencyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "LOW" => Some(Self::Low),
            "MEDIUM" => Some(Self::Medium),
            "HIGH" => Some(Self::High),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub id: RequestId,
    pub user_id: UserId,
    pub department_id: DepartmentId,
    pub request_code: String,
    pub description: String,
    pub status_note: Option<String>,
    pub total_amount: Decimal,
    pub current_approval_level: i64,
    pub status: RequestStatus,
    pub urgency_level: UrgencyLevel,
    pub request_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RequestItem {
    pub id: i64,
    pub request_id: RequestId,
    pub item_name: String,
    pub quantity: i64,
    pub unit_price: Decimal,
    pub total_price: Decimal,
    pub category: String,
    pub requested_delivery_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct NewRequestItem {
    pub item_name: String,
    pub quantity: i64,
    pub unit_price: Decimal,
    pub total_price: Decimal,
    pub category: String,
    pub requested_delivery_date: Option<NaiveDate>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewRequest {
    pub user_id: UserId,
    pub department_id: DepartmentId,
    pub description: String,
    pub status_note: Option<String>,
    pub urgency_level: UrgencyLevel,
    pub request_date: NaiveDate,
    pub draft: bool,
    pub items: Vec<NewRequestItem>,
}

impl NewRequest {
    /// Request totals are derived from the caller-supplied item totals; item
    /// totals themselves are not recomputed from quantity and unit price.
    pub fn total_amount(&self) -> Decimal {
        self.items.iter().map(|item| item.total_price).sum()
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct DraftUpdate {
    pub description: Option<String>,
    pub status_note: Option<String>,
    pub urgency_level: Option<UrgencyLevel>,
    pub request_date: Option<NaiveDate>,
    pub items: Option<Vec<NewRequestItem>>,
}
