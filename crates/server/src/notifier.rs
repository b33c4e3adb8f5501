//! Adapter between the engine's notification seam and the WhatsApp
//! channel: formats alert bodies and hands them to the Twilio client.

use std::sync::Arc;

use async_trait::async_trait;

use wapprove_engine::notify::{ApproverAlert, DeliveryReceipt, Notifier, StatusAlert};
use wapprove_whatsapp::messages::{self, ApprovalRequestMessage};
use wapprove_whatsapp::twilio::TwilioClient;

pub struct WhatsAppNotifier {
    client: Arc<TwilioClient>,
}

impl WhatsAppNotifier {
    pub fn new(client: Arc<TwilioClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Notifier for WhatsAppNotifier {
    async fn notify_approver(&self, alert: &ApproverAlert) -> DeliveryReceipt {
        let body = messages::approval_request_body(&ApprovalRequestMessage {
            request_code: &alert.request_code,
            requester_name: &alert.requester_name,
            description: &alert.description,
            total_amount: alert.total_amount,
            level_label: &alert.level_label,
            items: &alert.items,
        });
        let outcome = self.client.send_message(&alert.phone_number, &body).await;
        DeliveryReceipt {
            success: outcome.success,
            message_sid: outcome.message_sid,
            error: outcome.error,
        }
    }

    async fn notify_status_change(&self, alert: &StatusAlert) -> DeliveryReceipt {
        let body = messages::status_update_body(
            &alert.request_code,
            alert.status,
            &alert.actor_name,
            alert.notes.as_deref(),
        );
        let outcome = self.client.send_message(&alert.phone_number, &body).await;
        DeliveryReceipt {
            success: outcome.success,
            message_sid: outcome.message_sid,
            error: outcome.error,
        }
    }
}
