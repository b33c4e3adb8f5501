//! Workflow orchestrator: the façade the rest of the application calls.
//! Every action sequences permission gate → decision recording → quorum →
//! transition → conditional persistence → notification intents. The chain
//! is re-resolved from the store on every decision.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use wapprove_core::codes;
use wapprove_core::domain::approval_log::{ApprovalLog, ApprovalStatus, NewApprovalLog};
use wapprove_core::domain::approver::ApproverType;
use wapprove_core::domain::department::DepartmentId;
use wapprove_core::domain::notification::{NewNotification, NotificationType};
use wapprove_core::domain::request::{
    DraftUpdate, NewRequest, Request, RequestId, RequestItem, RequestStatus,
};
use wapprove_core::domain::user::{User, UserId, UserRole};
use wapprove_core::errors::WorkflowError;
use wapprove_core::visibility::{visibility_filter, VisibilityFilter};
use wapprove_core::workflow::actor::{ActorContext, RoleClass};
use wapprove_core::workflow::chain::{ApprovalChain, ApprovalLayer};
use wapprove_core::workflow::gate::{self, DenialReason, WorkflowAction};
use wapprove_core::workflow::quorum;
use wapprove_core::workflow::transition::{self, TransitionError};
use wapprove_db::repositories::{
    ApprovalLogRepository, ApproverRepository, DepartmentRepository, ListMeta,
    NotificationRepository, Page, RepositoryError, RequestListFilter, RequestRepository,
    SqlApprovalLogRepository, SqlApproverRepository, SqlDepartmentRepository,
    SqlNotificationRepository, SqlRequestRepository, SqlUserRepository, UserRepository,
};
use wapprove_db::DbPool;

use crate::notify::{ApproverAlert, DeliveryReceipt, Notifier, StatusAlert};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
    #[error("persistence failure: {0}")]
    Persistence(String),
}

impl From<RepositoryError> for ServiceError {
    fn from(error: RepositoryError) -> Self {
        Self::Persistence(error.to_string())
    }
}

impl From<DenialReason> for ServiceError {
    fn from(reason: DenialReason) -> Self {
        Self::Workflow(WorkflowError::PermissionDenied(reason))
    }
}

pub struct ApprovalWorkflow {
    users: Arc<dyn UserRepository>,
    departments: Arc<dyn DepartmentRepository>,
    approvers: Arc<dyn ApproverRepository>,
    requests: Arc<dyn RequestRepository>,
    approval_logs: Arc<dyn ApprovalLogRepository>,
    notifications: Arc<dyn NotificationRepository>,
    notifier: Arc<dyn Notifier>,
}

impl ApprovalWorkflow {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        users: Arc<dyn UserRepository>,
        departments: Arc<dyn DepartmentRepository>,
        approvers: Arc<dyn ApproverRepository>,
        requests: Arc<dyn RequestRepository>,
        approval_logs: Arc<dyn ApprovalLogRepository>,
        notifications: Arc<dyn NotificationRepository>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self { users, departments, approvers, requests, approval_logs, notifications, notifier }
    }

    /// Wires the SQL repositories over one pool.
    pub fn from_pool(pool: DbPool, notifier: Arc<dyn Notifier>) -> Self {
        Self::new(
            Arc::new(SqlUserRepository::new(pool.clone())),
            Arc::new(SqlDepartmentRepository::new(pool.clone())),
            Arc::new(SqlApproverRepository::new(pool.clone())),
            Arc::new(SqlRequestRepository::new(pool.clone())),
            Arc::new(SqlApprovalLogRepository::new(pool.clone())),
            Arc::new(SqlNotificationRepository::new(pool)),
            notifier,
        )
    }

    pub async fn create(&self, new_request: NewRequest) -> Result<Request, ServiceError> {
        let requester = self.load_user(new_request.user_id).await?;
        if self.departments.find_by_id(new_request.department_id).await?.is_none() {
            return Err(WorkflowError::NotFound { entity: "department" }.into());
        }

        let chain = self.resolve_chain(new_request.department_id).await?;
        let today = Utc::now().date_naive();
        let latest = self.requests.latest_code_with_prefix(&codes::daily_prefix(today)).await?;
        let request_code = codes::next_request_code(today, latest.as_deref());

        let (status, level) = if new_request.draft {
            (RequestStatus::Draft, 1)
        } else {
            transition::initial_route(&chain)
        };
        let total_amount = new_request.total_amount();

        let request = self
            .requests
            .create(&new_request, &request_code, status, level, total_amount)
            .await?;

        info!(
            event_name = "workflow.request.created",
            request_code = %request.request_code,
            department_id = %request.department_id,
            status = %request.status,
            "request created"
        );

        if !new_request.draft {
            self.notify_layer_approvers(&request, &chain, &requester).await;
        }

        Ok(request)
    }

    pub async fn approve(
        &self,
        request_id: RequestId,
        actor_id: UserId,
        notes: Option<String>,
    ) -> Result<Request, ServiceError> {
        let request = self.load_request(request_id).await?;
        let actor = self.actor_context(actor_id, request.department_id).await?;
        gate::authorize(WorkflowAction::Approve, &request, &actor)?;

        if self.approval_logs.has_approved(request_id, actor_id).await? {
            return Err(WorkflowError::DuplicateDecision {
                request_id,
                approver_user_id: actor_id,
            }
            .into());
        }

        let decision = NewApprovalLog {
            request_id,
            approver_user_id: actor_id,
            approver_id: actor.approver.as_ref().map(|approver| approver.id),
            approval_status: ApprovalStatus::Approved,
            notes: notes.clone(),
        };
        match self.approval_logs.record(decision).await {
            Ok(_) => {}
            // Concurrent duplicate caught by the partial unique index.
            Err(RepositoryError::UniqueViolation(_)) => {
                return Err(WorkflowError::DuplicateDecision {
                    request_id,
                    approver_user_id: actor_id,
                }
                .into());
            }
            Err(other) => return Err(other.into()),
        }

        if actor.role_class == RoleClass::AdminOrPurchasing {
            // One-shot authoritative approval; no quorum at the terminal
            // layer.
            self.requests
                .transition_status(
                    request_id,
                    RequestStatus::PendingPurchasingApproval,
                    request.current_approval_level,
                    RequestStatus::FullyApproved,
                    request.current_approval_level,
                )
                .await?;
        } else {
            self.advance_if_quorum_satisfied(&request).await?;
        }

        let updated = self.load_request(request_id).await?;
        info!(
            event_name = "workflow.request.approved",
            request_code = %updated.request_code,
            actor_id = %actor_id,
            status = %updated.status,
            approval_level = updated.current_approval_level,
            "approval recorded"
        );

        if updated.status != request.status
            || updated.current_approval_level != request.current_approval_level
        {
            self.notify_requester(&updated, &actor.user, notes.as_deref()).await;
        }

        Ok(updated)
    }

    pub async fn reject(
        &self,
        request_id: RequestId,
        actor_id: UserId,
        notes: Option<String>,
    ) -> Result<Request, ServiceError> {
        let request = self.load_request(request_id).await?;
        let actor = self.actor_context(actor_id, request.department_id).await?;
        gate::authorize(WorkflowAction::Reject, &request, &actor)?;

        self.approval_logs
            .record(NewApprovalLog {
                request_id,
                approver_user_id: actor_id,
                approver_id: actor.approver.as_ref().map(|approver| approver.id),
                approval_status: ApprovalStatus::Rejected,
                notes: notes.clone(),
            })
            .await?;

        self.requests
            .set_status(
                request_id,
                RequestStatus::Rejected,
                request.current_approval_level,
                notes.as_deref(),
            )
            .await?;

        let updated = self.load_request(request_id).await?;
        info!(
            event_name = "workflow.request.rejected",
            request_code = %updated.request_code,
            actor_id = %actor_id,
            "rejection recorded"
        );
        self.notify_requester(&updated, &actor.user, notes.as_deref()).await;
        Ok(updated)
    }

    pub async fn cancel(
        &self,
        request_id: RequestId,
        actor_id: UserId,
    ) -> Result<Request, ServiceError> {
        let request = self.load_request(request_id).await?;
        let actor = self.actor_context(actor_id, request.department_id).await?;
        gate::authorize(WorkflowAction::Cancel, &request, &actor)?;

        self.requests
            .set_status(
                request_id,
                RequestStatus::Cancelled,
                request.current_approval_level,
                None,
            )
            .await?;

        let updated = self.load_request(request_id).await?;
        info!(
            event_name = "workflow.request.cancelled",
            request_code = %updated.request_code,
            actor_id = %actor_id,
            "request cancelled"
        );
        self.notify_requester(&updated, &actor.user, None).await;
        Ok(updated)
    }

    pub async fn hold(
        &self,
        request_id: RequestId,
        actor_id: UserId,
        notes: Option<String>,
    ) -> Result<Request, ServiceError> {
        let request = self.load_request(request_id).await?;
        let actor = self.actor_context(actor_id, request.department_id).await?;
        gate::authorize(WorkflowAction::Hold, &request, &actor)?;

        self.requests
            .set_status(
                request_id,
                RequestStatus::OnHold,
                request.current_approval_level,
                notes.as_deref(),
            )
            .await?;

        let updated = self.load_request(request_id).await?;
        info!(
            event_name = "workflow.request.held",
            request_code = %updated.request_code,
            actor_id = %actor_id,
            "request put on hold"
        );
        self.notify_requester(&updated, &actor.user, notes.as_deref()).await;
        Ok(updated)
    }

    pub async fn process(
        &self,
        request_id: RequestId,
        actor_id: UserId,
    ) -> Result<Request, ServiceError> {
        let request = self.load_request(request_id).await?;
        let actor = self.actor_context(actor_id, request.department_id).await?;
        gate::authorize(WorkflowAction::Process, &request, &actor)?;

        self.requests
            .set_status(
                request_id,
                RequestStatus::InProcess,
                request.current_approval_level,
                None,
            )
            .await?;

        let updated = self.load_request(request_id).await?;
        info!(
            event_name = "workflow.request.processing",
            request_code = %updated.request_code,
            actor_id = %actor_id,
            "request moved to processing"
        );
        self.notify_requester(&updated, &actor.user, None).await;
        Ok(updated)
    }

    pub async fn complete(
        &self,
        request_id: RequestId,
        actor_id: UserId,
    ) -> Result<Request, ServiceError> {
        let request = self.load_request(request_id).await?;
        let actor = self.actor_context(actor_id, request.department_id).await?;
        gate::authorize(WorkflowAction::Complete, &request, &actor)?;

        self.requests
            .set_status(
                request_id,
                RequestStatus::Completed,
                request.current_approval_level,
                None,
            )
            .await?;

        let updated = self.load_request(request_id).await?;
        info!(
            event_name = "workflow.request.completed",
            request_code = %updated.request_code,
            actor_id = %actor_id,
            "request completed"
        );
        self.notify_requester(&updated, &actor.user, None).await;
        Ok(updated)
    }

    /// Routes a DRAFT into its chain. The initial status is re-derived
    /// from the approver configuration at submission time, not at draft
    /// creation.
    pub async fn submit(
        &self,
        request_id: RequestId,
        actor_id: UserId,
    ) -> Result<Request, ServiceError> {
        let request = self.load_request(request_id).await?;
        if request.status != RequestStatus::Draft {
            return Err(WorkflowError::InvalidState {
                request_code: request.request_code,
                status: request.status,
                detail: "only DRAFT requests can be submitted".to_string(),
            }
            .into());
        }
        self.require_draft_access(&request, actor_id).await?;

        let chain = self.resolve_chain(request.department_id).await?;
        let (status, level) = transition::initial_route(&chain);
        // Conditional on DRAFT so a concurrent double submit routes once.
        self.requests
            .transition_status(
                request_id,
                RequestStatus::Draft,
                request.current_approval_level,
                status,
                level,
            )
            .await?;

        let updated = self.load_request(request_id).await?;
        info!(
            event_name = "workflow.request.submitted",
            request_code = %updated.request_code,
            status = %updated.status,
            "draft submitted into its approval chain"
        );
        let requester = self.load_user(updated.user_id).await?;
        self.notify_layer_approvers(&updated, &chain, &requester).await;
        Ok(updated)
    }

    pub async fn update_draft(
        &self,
        request_id: RequestId,
        actor_id: UserId,
        update: DraftUpdate,
    ) -> Result<Request, ServiceError> {
        let request = self.load_request(request_id).await?;
        if request.status != RequestStatus::Draft {
            return Err(WorkflowError::InvalidState {
                request_code: request.request_code,
                status: request.status,
                detail: "only DRAFT requests can be updated".to_string(),
            }
            .into());
        }
        self.require_draft_access(&request, actor_id).await?;

        self.requests.update_draft(request_id, &update).await?;
        self.load_request(request_id).await
    }

    pub async fn delete_draft(
        &self,
        request_id: RequestId,
        actor_id: UserId,
    ) -> Result<(), ServiceError> {
        let request = self.load_request(request_id).await?;
        if request.status != RequestStatus::Draft {
            return Err(WorkflowError::InvalidState {
                request_code: request.request_code,
                status: request.status,
                detail: "only DRAFT requests can be deleted".to_string(),
            }
            .into());
        }
        self.require_draft_access(&request, actor_id).await?;

        self.requests.delete(request_id).await?;
        Ok(())
    }

    /// Ordered chain of a department, as currently configured.
    pub async fn chain(
        &self,
        department_id: DepartmentId,
    ) -> Result<Vec<ApprovalLayer>, ServiceError> {
        if self.departments.find_by_id(department_id).await?.is_none() {
            return Err(WorkflowError::NotFound { entity: "department" }.into());
        }
        let chain = self.resolve_chain(department_id).await?;
        Ok(chain.layers().to_vec())
    }

    /// Visibility-checked fetch. Requests outside the actor's scope are
    /// reported as missing rather than forbidden.
    pub async fn get(
        &self,
        request_id: RequestId,
        actor_id: UserId,
    ) -> Result<Request, ServiceError> {
        let request = self.load_request(request_id).await?;
        let filter = self.visibility_for(actor_id).await?;
        if !filter.allows(&request) {
            return Err(WorkflowError::NotFound { entity: "request" }.into());
        }
        Ok(request)
    }

    pub async fn get_by_code(
        &self,
        request_code: &str,
    ) -> Result<Request, ServiceError> {
        self.requests
            .find_by_code(request_code)
            .await?
            .ok_or_else(|| WorkflowError::NotFound { entity: "request" }.into())
    }

    pub async fn list(
        &self,
        actor_id: UserId,
        filter: RequestListFilter,
        page: Page,
    ) -> Result<(Vec<Request>, ListMeta), ServiceError> {
        let visibility = self.visibility_for(actor_id).await?;
        Ok(self.requests.list(&filter, &visibility, page).await?)
    }

    pub async fn items(&self, request_id: RequestId) -> Result<Vec<RequestItem>, ServiceError> {
        Ok(self.requests.items_for(request_id).await?)
    }

    /// The request's decision trail, oldest first.
    pub async fn decision_trail(
        &self,
        request_id: RequestId,
    ) -> Result<Vec<ApprovalLog>, ServiceError> {
        Ok(self.approval_logs.list_for_request(request_id).await?)
    }

    /// Applies a provider delivery callback to the matching notification
    /// record. Unknown sids and statuses are ignored.
    pub async fn delivery_callback(
        &self,
        message_sid: &str,
        message_status: &str,
    ) -> Result<(), ServiceError> {
        let Some(notification) = self.notifications.find_by_message_sid(message_sid).await? else {
            debug!(
                event_name = "workflow.notification.unknown_sid",
                message_sid, "delivery callback for unknown message sid"
            );
            return Ok(());
        };

        match message_status {
            "delivered" => self.notifications.mark_sent(notification.id, true).await?,
            "read" => self.notifications.mark_read(notification.id).await?,
            "failed" | "undelivered" => {
                self.notifications.mark_sent(notification.id, false).await?
            }
            _ => {}
        }
        Ok(())
    }

    async fn advance_if_quorum_satisfied(&self, request: &Request) -> Result<(), ServiceError> {
        let chain = self.resolve_chain(request.department_id).await?;
        let approvers_at_level = self
            .approvers
            .list_at_level(request.department_id, request.current_approval_level)
            .await?;
        let logs = self.approval_logs.list_for_request(request.id).await?;

        let satisfied = quorum::layer_satisfied(
            request.department_id,
            request.current_approval_level,
            &approvers_at_level,
            &logs,
        )?;
        if !satisfied {
            return Ok(());
        }

        let advance = transition::advance_after_quorum(&chain, request.current_approval_level)
            .map_err(|TransitionError::MissingLayer { approval_level }| {
                WorkflowError::ChainMisconfigured {
                    department_id: request.department_id,
                    approval_level,
                }
            })?;

        let advanced = self
            .requests
            .transition_status(
                request.id,
                request.status,
                request.current_approval_level,
                advance.status,
                advance.approval_level,
            )
            .await?;

        if !advanced {
            // A concurrent quorum-completing approval already moved the
            // request; the recorded decision stands and nothing is retried.
            debug!(
                event_name = "workflow.request.concurrent_advance",
                request_code = %request.request_code,
                "request already advanced by a concurrent approval"
            );
            return Ok(());
        }

        if advance.entered_layer.is_some() {
            let updated = self.load_request(request.id).await?;
            let requester = self.load_user(updated.user_id).await?;
            self.notify_layer_approvers(&updated, &chain, &requester).await;
        }

        Ok(())
    }

    async fn require_draft_access(
        &self,
        request: &Request,
        actor_id: UserId,
    ) -> Result<(), ServiceError> {
        let actor = self.load_user(actor_id).await?;
        if actor.id == request.user_id || actor.role.is_admin_or_purchasing() {
            Ok(())
        } else {
            Err(DenialReason::NotDraftOwner.into())
        }
    }

    async fn visibility_for(&self, actor_id: UserId) -> Result<VisibilityFilter, ServiceError> {
        let user = self.load_user(actor_id).await?;
        let approver_departments = if user.role == UserRole::Director {
            self.approvers.department_ids_for_user(user.id).await?
        } else {
            Vec::new()
        };
        Ok(visibility_filter(&user, &approver_departments))
    }

    async fn resolve_chain(
        &self,
        department_id: DepartmentId,
    ) -> Result<ApprovalChain, ServiceError> {
        let approver_rows = self.approvers.list_for_department(department_id).await?;
        Ok(ApprovalChain::from_approvers(&approver_rows))
    }

    async fn actor_context(
        &self,
        actor_id: UserId,
        department_id: DepartmentId,
    ) -> Result<ActorContext, ServiceError> {
        let user = self.load_user(actor_id).await?;
        let approver =
            self.approvers.find_for_user_in_department(actor_id, department_id).await?;
        Ok(ActorContext::new(user, approver))
    }

    async fn load_request(&self, request_id: RequestId) -> Result<Request, ServiceError> {
        self.requests
            .find_by_id(request_id)
            .await?
            .ok_or_else(|| WorkflowError::NotFound { entity: "request" }.into())
    }

    async fn load_user(&self, user_id: UserId) -> Result<User, ServiceError> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| WorkflowError::NotFound { entity: "user" }.into())
    }

    /// Notifies the approvers of the layer the request currently awaits.
    /// Only MANAGER and DIRECTOR layers are notified over the external
    /// channel — purchasing and admin act through the primary interface.
    async fn notify_layer_approvers(
        &self,
        request: &Request,
        chain: &ApprovalChain,
        requester: &User,
    ) {
        let Some(layer) = chain.layer_at(request.current_approval_level) else {
            debug!(
                event_name = "workflow.notify.purchasing_level",
                request_code = %request.request_code,
                approval_level = request.current_approval_level,
                "purchasing level reached; no channel notification"
            );
            return;
        };
        if !matches!(layer.approver_type, ApproverType::Manager | ApproverType::Director) {
            return;
        }

        let approver_rows = match self
            .approvers
            .list_at_level(request.department_id, layer.approval_level)
            .await
        {
            Ok(rows) => rows,
            Err(load_error) => {
                warn!(
                    event_name = "workflow.notify.load_failed",
                    request_code = %request.request_code,
                    error = %load_error,
                    "could not load layer approvers for notification"
                );
                return;
            }
        };
        let items = self.requests.items_for(request.id).await.unwrap_or_default();

        for row in approver_rows {
            let user = match self.users.find_by_id(row.user_id).await {
                Ok(Some(user)) => user,
                Ok(None) | Err(_) => continue,
            };
            let Some(phone_number) = user.phone_number.clone() else {
                debug!(
                    event_name = "workflow.notify.no_phone",
                    request_code = %request.request_code,
                    approver_user_id = %user.id,
                    "approver has no phone number; skipping"
                );
                continue;
            };

            let alert = ApproverAlert {
                phone_number,
                approver_user_id: user.id,
                request_id: request.id,
                request_code: request.request_code.clone(),
                requester_name: requester.name.clone(),
                description: request.description.clone(),
                total_amount: request.total_amount,
                level_label: layer.label(),
                items: items.clone(),
            };
            let receipt = self.notifier.notify_approver(&alert).await;
            self.record_notification(
                user.id,
                request,
                NotificationType::PendingApproval,
                format!("Approval request for {}", request.request_code),
                receipt,
            )
            .await;
        }
    }

    async fn notify_requester(&self, request: &Request, actor: &User, notes: Option<&str>) {
        let requester = match self.users.find_by_id(request.user_id).await {
            Ok(Some(user)) => user,
            Ok(None) | Err(_) => return,
        };
        let Some(phone_number) = requester.phone_number.clone() else {
            return;
        };

        let alert = StatusAlert {
            phone_number,
            requester_user_id: requester.id,
            request_id: request.id,
            request_code: request.request_code.clone(),
            status: request.status,
            actor_name: actor.name.clone(),
            notes: notes.map(ToOwned::to_owned),
        };
        let receipt = self.notifier.notify_status_change(&alert).await;
        self.record_notification(
            requester.id,
            request,
            NotificationType::StatusUpdate,
            format!("Status update: {}", request.status),
            receipt,
        )
        .await;
    }

    /// Records the attempt; a failed send is logged and swallowed — the
    /// workflow decision already committed.
    async fn record_notification(
        &self,
        user_id: UserId,
        request: &Request,
        notification_type: NotificationType,
        message: String,
        receipt: DeliveryReceipt,
    ) {
        if !receipt.success {
            error!(
                event_name = "workflow.notify.delivery_failed",
                request_code = %request.request_code,
                user_id = %user_id,
                error = receipt.error.as_deref().unwrap_or("unknown"),
                "notification delivery failed"
            );
        }

        let record = NewNotification {
            user_id,
            request_id: request.id,
            notification_type,
            message,
            message_sid: receipt.message_sid,
            is_sent: receipt.success,
        };
        if let Err(record_error) = self.notifications.record(record).await {
            warn!(
                event_name = "workflow.notify.record_failed",
                request_code = %request.request_code,
                error = %record_error,
                "could not persist notification record"
            );
        }
    }
}
