//! Implements the WhatsApp channel's command trait on top of the workflow
//! orchestrator: inbound commands resolve the acting user by phone number
//! and map 1:1 onto approve/reject.

use std::sync::Arc;

use async_trait::async_trait;

use wapprove_core::errors::WorkflowError;
use wapprove_db::repositories::UserRepository;
use wapprove_engine::{ApprovalWorkflow, ServiceError};
use wapprove_whatsapp::messages;
use wapprove_whatsapp::webhook::{ApprovalCommandService, CommandServiceError};

pub struct WorkflowCommandService {
    workflow: Arc<ApprovalWorkflow>,
    users: Arc<dyn UserRepository>,
}

impl WorkflowCommandService {
    pub fn new(workflow: Arc<ApprovalWorkflow>, users: Arc<dyn UserRepository>) -> Self {
        Self { workflow, users }
    }

    async fn resolve_sender(
        &self,
        phone_number: &str,
    ) -> Result<wapprove_core::UserId, CommandServiceError> {
        let user = self
            .users
            .find_by_phone(phone_number)
            .await
            .map_err(|error| CommandServiceError::Internal(error.to_string()))?
            .ok_or(CommandServiceError::UnknownSender)?;
        Ok(user.id)
    }
}

fn map_service_error(error: ServiceError) -> CommandServiceError {
    match error {
        // Workflow denials carry the specific rule violated; the sender
        // sees the message verbatim.
        ServiceError::Workflow(WorkflowError::NotFound { .. }) => {
            CommandServiceError::Denied("Request not found.".to_string())
        }
        ServiceError::Workflow(workflow) => CommandServiceError::Denied(workflow.to_string()),
        ServiceError::Persistence(detail) => CommandServiceError::Internal(detail),
    }
}

#[async_trait]
impl ApprovalCommandService for WorkflowCommandService {
    async fn approve_by_code(
        &self,
        phone_number: &str,
        request_code: &str,
    ) -> Result<String, CommandServiceError> {
        let actor_id = self.resolve_sender(phone_number).await?;
        let request = self
            .workflow
            .get_by_code(request_code)
            .await
            .map_err(map_service_error)?;
        self.workflow
            .approve(request.id, actor_id, Some("Approved via WhatsApp".to_string()))
            .await
            .map_err(map_service_error)?;
        Ok(messages::approved_reply(request_code))
    }

    async fn reject_by_code(
        &self,
        phone_number: &str,
        request_code: &str,
        reason: &str,
    ) -> Result<String, CommandServiceError> {
        let actor_id = self.resolve_sender(phone_number).await?;
        let request = self
            .workflow
            .get_by_code(request_code)
            .await
            .map_err(map_service_error)?;
        self.workflow
            .reject(request.id, actor_id, Some(reason.to_string()))
            .await
            .map_err(map_service_error)?;
        Ok(messages::rejected_reply(request_code))
    }
}
