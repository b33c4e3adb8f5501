//! Inbound webhook handling: payload types and the dispatch from parsed
//! commands onto the application's [`ApprovalCommandService`]. Every inbound
//! message gets a reply; failures never escape the dispatcher.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::{error, info};

use crate::commands::{parse_inbound_command, InboundCommand};
use crate::messages;

/// Form payload Twilio posts for both incoming messages and delivery
/// status callbacks.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct TwilioWebhookPayload {
    #[serde(rename = "MessageSid", default)]
    pub message_sid: String,
    #[serde(rename = "From", default)]
    pub from: String,
    #[serde(rename = "Body", default)]
    pub body: String,
    #[serde(rename = "MessageStatus")]
    pub message_status: Option<String>,
}

impl TwilioWebhookPayload {
    /// Delivery callbacks carry a status and no message body.
    pub fn is_status_callback(&self) -> bool {
        self.message_status.is_some() && self.body.trim().is_empty()
    }

    pub fn sender_phone(&self) -> &str {
        self.from.strip_prefix("whatsapp:").unwrap_or(&self.from)
    }
}

#[derive(Debug, Error)]
pub enum CommandServiceError {
    #[error("unknown sender")]
    UnknownSender,
    /// A workflow denial with a human-readable message the sender should
    /// see verbatim.
    #[error("{0}")]
    Denied(String),
    #[error("command service failed: {0}")]
    Internal(String),
}

/// Implemented by the application; maps phone-resolved users onto the
/// workflow's approve/reject entry points and returns the reply body.
#[async_trait]
pub trait ApprovalCommandService: Send + Sync {
    async fn approve_by_code(
        &self,
        phone_number: &str,
        request_code: &str,
    ) -> Result<String, CommandServiceError>;

    async fn reject_by_code(
        &self,
        phone_number: &str,
        request_code: &str,
        reason: &str,
    ) -> Result<String, CommandServiceError>;
}

pub struct WebhookDispatcher<S> {
    service: S,
}

impl<S> WebhookDispatcher<S>
where
    S: ApprovalCommandService,
{
    pub fn new(service: S) -> Self {
        Self { service }
    }

    /// Handles one incoming message and returns the reply body to send
    /// back to the sender.
    pub async fn handle_incoming(&self, payload: &TwilioWebhookPayload) -> String {
        let phone_number = payload.sender_phone();

        let Some(command) = parse_inbound_command(&payload.body) else {
            return messages::help_body();
        };
        info!(
            event_name = "whatsapp.webhook.command",
            command = match &command {
                InboundCommand::Approve { .. } => "approve",
                InboundCommand::Reject { .. } => "reject",
            },
            "inbound command received"
        );

        let result = match &command {
            InboundCommand::Approve { request_code } => {
                self.service.approve_by_code(phone_number, request_code).await
            }
            InboundCommand::Reject { request_code, reason } => {
                self.service.reject_by_code(phone_number, request_code, reason).await
            }
        };

        match result {
            Ok(reply) => reply,
            Err(CommandServiceError::UnknownSender) => {
                messages::error_body("User not found. Please contact administrator.")
            }
            Err(CommandServiceError::Denied(reason)) => messages::error_body(&reason),
            Err(CommandServiceError::Internal(detail)) => {
                error!(
                    event_name = "whatsapp.webhook.command_failed",
                    error = %detail,
                    "inbound command processing failed"
                );
                messages::error_body("An error occurred while processing your request.")
            }
        }
    }
}
