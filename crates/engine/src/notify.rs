//! Notification seam of the workflow engine. The engine builds alerts,
//! hands them to a [`Notifier`], and records the attempt; delivery results
//! are logged but never influence workflow decisions.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rust_decimal::Decimal;

use wapprove_core::domain::request::{RequestId, RequestItem, RequestStatus};
use wapprove_core::domain::user::UserId;

/// Ask a newly responsible approver to act on a request.
#[derive(Clone, Debug, PartialEq)]
pub struct ApproverAlert {
    pub phone_number: String,
    pub approver_user_id: UserId,
    pub request_id: RequestId,
    pub request_code: String,
    pub requester_name: String,
    pub description: String,
    pub total_amount: Decimal,
    pub level_label: String,
    pub items: Vec<RequestItem>,
}

/// Tell the requester that their request changed state.
#[derive(Clone, Debug, PartialEq)]
pub struct StatusAlert {
    pub phone_number: String,
    pub requester_user_id: UserId,
    pub request_id: RequestId,
    pub request_code: String,
    pub status: RequestStatus,
    pub actor_name: String,
    pub notes: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeliveryReceipt {
    pub success: bool,
    pub message_sid: Option<String>,
    pub error: Option<String>,
}

impl DeliveryReceipt {
    pub fn delivered(message_sid: impl Into<String>) -> Self {
        Self { success: true, message_sid: Some(message_sid.into()), error: None }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self { success: false, message_sid: None, error: Some(error.into()) }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_approver(&self, alert: &ApproverAlert) -> DeliveryReceipt;
    async fn notify_status_change(&self, alert: &StatusAlert) -> DeliveryReceipt;
}

/// Notifier used when no messaging channel is configured. Alerts are
/// treated as sent so local runs stay quiet; the notification rows still
/// record what would have gone out.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify_approver(&self, _alert: &ApproverAlert) -> DeliveryReceipt {
        DeliveryReceipt { success: true, message_sid: None, error: None }
    }

    async fn notify_status_change(&self, _alert: &StatusAlert) -> DeliveryReceipt {
        DeliveryReceipt { success: true, message_sid: None, error: None }
    }
}

/// Captures alerts for assertions in tests.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    approver_alerts: Arc<Mutex<Vec<ApproverAlert>>>,
    status_alerts: Arc<Mutex<Vec<StatusAlert>>>,
}

impl RecordingNotifier {
    pub fn approver_alerts(&self) -> Vec<ApproverAlert> {
        match self.approver_alerts.lock() {
            Ok(alerts) => alerts.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn status_alerts(&self) -> Vec<StatusAlert> {
        match self.status_alerts.lock() {
            Ok(alerts) => alerts.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify_approver(&self, alert: &ApproverAlert) -> DeliveryReceipt {
        match self.approver_alerts.lock() {
            Ok(mut alerts) => alerts.push(alert.clone()),
            Err(poisoned) => poisoned.into_inner().push(alert.clone()),
        }
        DeliveryReceipt::delivered(format!("SM-test-{}", alert.request_code))
    }

    async fn notify_status_change(&self, alert: &StatusAlert) -> DeliveryReceipt {
        match self.status_alerts.lock() {
            Ok(mut alerts) => alerts.push(alert.clone()),
            Err(poisoned) => poisoned.into_inner().push(alert.clone()),
        }
        DeliveryReceipt::delivered(format!("SM-test-{}", alert.request_code))
    }
}
