use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::request::RequestId;
use crate::domain::user::UserId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NotificationId(pub i64);

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    PendingApproval,
    StatusUpdate,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PendingApproval => "PENDING_APPROVAL",
            Self::StatusUpdate => "STATUS_UPDATE",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "PENDING_APPROVAL" => Some(Self::PendingApproval),
            "STATUS_UPDATE" => Some(Self::StatusUpdate),
            _ => None,
        }
    }
}

/// Audit record of one outbound notification attempt. Delivery callbacks
/// from the messaging provider update `is_sent`/`is_read` after the fact,
/// matched by `message_sid`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: UserId,
    pub request_id: RequestId,
    pub notification_type: NotificationType,
    pub message: String,
    pub message_sid: Option<String>,
    pub is_sent: bool,
    pub sent_at: Option<DateTime<Utc>>,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewNotification {
    pub user_id: UserId,
    pub request_id: RequestId,
    pub notification_type: NotificationType,
    pub message: String,
    pub message_sid: Option<String>,
    pub is_sent: bool,
}
