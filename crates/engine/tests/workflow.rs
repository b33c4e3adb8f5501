//! End-to-end workflow scenarios against an in-memory store.

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use wapprove_core::domain::approver::{ApproverType, NewApprover};
use wapprove_core::domain::department::{DepartmentId, NewDepartment};
use wapprove_core::domain::request::{
    DraftUpdate, NewRequest, NewRequestItem, RequestStatus, UrgencyLevel,
};
use wapprove_core::domain::user::{NewUser, UserId, UserRole};
use wapprove_core::errors::WorkflowError;
use wapprove_core::workflow::gate::DenialReason;
use wapprove_db::repositories::{
    ApproverRepository, DepartmentRepository, NotificationRepository, SqlApproverRepository,
    SqlDepartmentRepository, SqlNotificationRepository, SqlUserRepository, UserRepository,
};
use wapprove_db::{connect_with_settings, migrations, DbPool};
use wapprove_engine::{ApprovalWorkflow, RecordingNotifier, ServiceError};

struct Harness {
    pool: DbPool,
    workflow: ApprovalWorkflow,
    notifier: RecordingNotifier,
}

async fn harness() -> Harness {
    let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
    migrations::run_pending(&pool).await.expect("migrations");
    let notifier = RecordingNotifier::default();
    let workflow = ApprovalWorkflow::from_pool(pool.clone(), Arc::new(notifier.clone()));
    Harness { pool, workflow, notifier }
}

impl Harness {
    async fn department(&self, code: &str) -> DepartmentId {
        SqlDepartmentRepository::new(self.pool.clone())
            .insert(NewDepartment {
                name: code.to_string(),
                code: code.to_string(),
                approval_layers: None,
            })
            .await
            .expect("insert department")
            .id
    }

    async fn user(
        &self,
        email: &str,
        role: UserRole,
        department_id: Option<DepartmentId>,
        phone_number: Option<&str>,
    ) -> UserId {
        SqlUserRepository::new(self.pool.clone())
            .insert(NewUser {
                role,
                name: email.split('@').next().unwrap_or(email).to_string(),
                email: email.to_string(),
                phone_number: phone_number.map(ToOwned::to_owned),
                department_id,
            })
            .await
            .expect("insert user")
            .id
    }

    async fn approver(
        &self,
        user_id: UserId,
        department_id: DepartmentId,
        approver_type: ApproverType,
        approval_level: i64,
    ) {
        SqlApproverRepository::new(self.pool.clone())
            .insert(NewApprover { user_id, department_id, approver_type, approval_level })
            .await
            .expect("insert approver");
    }

    /// The FIN shape of the scenario suite: manager at level 1, director at
    /// level 2, plus a requester with a phone number.
    async fn fin_setup(&self) -> (DepartmentId, UserId, UserId, UserId) {
        let fin = self.department("FIN").await;
        let requester = self
            .user("staff@example.com", UserRole::Staff, Some(fin), Some("+628110000001"))
            .await;
        let manager = self
            .user("manager@example.com", UserRole::Manager, Some(fin), Some("+628110000002"))
            .await;
        let director = self
            .user("director@example.com", UserRole::Director, None, Some("+628110000003"))
            .await;
        self.approver(manager, fin, ApproverType::Manager, 1).await;
        self.approver(director, fin, ApproverType::Director, 2).await;
        (fin, requester, manager, director)
    }
}

fn new_request(user_id: UserId, department_id: DepartmentId) -> NewRequest {
    NewRequest {
        user_id,
        department_id,
        description: "office chairs".to_string(),
        status_note: None,
        urgency_level: UrgencyLevel::Medium,
        request_date: NaiveDate::from_ymd_opt(2026, 8, 6).expect("valid date"),
        draft: false,
        items: vec![NewRequestItem {
            item_name: "chair".to_string(),
            quantity: 4,
            unit_price: Decimal::new(250_000, 0),
            total_price: Decimal::new(1_000_000, 0),
            category: "furniture".to_string(),
            requested_delivery_date: None,
        }],
    }
}

fn workflow_error(error: ServiceError) -> WorkflowError {
    match error {
        ServiceError::Workflow(workflow) => workflow,
        ServiceError::Persistence(message) => panic!("unexpected persistence error: {message}"),
    }
}

#[tokio::test]
async fn empty_chain_routes_straight_to_purchasing() {
    let harness = harness().await;
    let department = harness.department("GA").await;
    let requester = harness.user("staff@example.com", UserRole::Staff, None, None).await;

    let request = harness
        .workflow
        .create(new_request(requester, department))
        .await
        .expect("create");

    assert_eq!(request.status, RequestStatus::PendingPurchasingApproval);
    assert_eq!(request.current_approval_level, 1);
    assert!(
        harness.notifier.approver_alerts().is_empty(),
        "purchasing is never notified over the channel"
    );
}

#[tokio::test]
async fn chain_walk_manager_director_purchasing_admin() {
    let harness = harness().await;
    let (fin, requester, manager, director) = harness.fin_setup().await;
    let admin = harness.user("admin@example.com", UserRole::Admin, None, None).await;

    // Creation routes to the first layer and alerts its approver.
    let request = harness
        .workflow
        .create(new_request(requester, fin))
        .await
        .expect("create");
    assert_eq!(request.status, RequestStatus::PendingManagerApproval);
    assert_eq!(request.current_approval_level, 1);
    let alerts = harness.notifier.approver_alerts();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].approver_user_id, manager);
    assert_eq!(alerts[0].level_label, "Manager Approval (Level 1)");
    assert_eq!(alerts[0].total_amount, Decimal::new(1_000_000, 0));
    assert_eq!(alerts[0].items.len(), 1);

    // Sole manager satisfies the level-1 quorum.
    let request = harness
        .workflow
        .approve(request.id, manager, Some("within budget".to_string()))
        .await
        .expect("manager approves");
    assert_eq!(request.status, RequestStatus::PendingDirectorApproval);
    assert_eq!(request.current_approval_level, 2);
    let alerts = harness.notifier.approver_alerts();
    assert_eq!(alerts.len(), 2);
    assert_eq!(alerts[1].approver_user_id, director);

    // Director exhausts the configured chain; the synthetic purchasing
    // layer sits one past the last configured level.
    let request = harness
        .workflow
        .approve(request.id, director, None)
        .await
        .expect("director approves");
    assert_eq!(request.status, RequestStatus::PendingPurchasingApproval);
    assert_eq!(request.current_approval_level, 3);
    assert_eq!(
        harness.notifier.approver_alerts().len(),
        2,
        "purchasing is never notified over the channel"
    );

    // Admin decision is one-shot; no quorum at the terminal layer.
    let request = harness
        .workflow
        .approve(request.id, admin, None)
        .await
        .expect("admin approves");
    assert_eq!(request.status, RequestStatus::FullyApproved);

    // The requester heard about each advance.
    let status_alerts = harness.notifier.status_alerts();
    assert_eq!(status_alerts.len(), 3);
    assert!(status_alerts.iter().all(|alert| alert.requester_user_id == requester));
    assert_eq!(status_alerts[2].status, RequestStatus::FullyApproved);
}

#[tokio::test]
async fn quorum_requires_every_approver_at_the_level() {
    let harness = harness().await;
    let ops = harness.department("OPS").await;
    let requester = harness.user("staff@example.com", UserRole::Staff, Some(ops), None).await;
    let first = harness
        .user("manager.1@example.com", UserRole::Manager, Some(ops), None)
        .await;
    let second = harness
        .user("manager.2@example.com", UserRole::Manager, Some(ops), None)
        .await;
    harness.approver(first, ops, ApproverType::Manager, 1).await;
    harness.approver(second, ops, ApproverType::Manager, 1).await;

    let request = harness
        .workflow
        .create(new_request(requester, ops))
        .await
        .expect("create");
    assert_eq!(request.status, RequestStatus::PendingManagerApproval);

    // N-1 approvals leave the status untouched.
    let request = harness
        .workflow
        .approve(request.id, first, None)
        .await
        .expect("first manager approves");
    assert_eq!(request.status, RequestStatus::PendingManagerApproval);
    assert_eq!(request.current_approval_level, 1);

    let request = harness
        .workflow
        .approve(request.id, second, None)
        .await
        .expect("second manager approves");
    assert_eq!(request.status, RequestStatus::PendingPurchasingApproval);
    assert_eq!(request.current_approval_level, 2);
}

#[tokio::test]
async fn approving_twice_is_a_duplicate_decision() {
    let harness = harness().await;
    let ops = harness.department("OPS").await;
    let requester = harness.user("staff@example.com", UserRole::Staff, Some(ops), None).await;
    let first = harness
        .user("manager.1@example.com", UserRole::Manager, Some(ops), None)
        .await;
    let second = harness
        .user("manager.2@example.com", UserRole::Manager, Some(ops), None)
        .await;
    harness.approver(first, ops, ApproverType::Manager, 1).await;
    harness.approver(second, ops, ApproverType::Manager, 1).await;

    let request = harness
        .workflow
        .create(new_request(requester, ops))
        .await
        .expect("create");
    harness.workflow.approve(request.id, first, None).await.expect("first approval");

    let error = harness
        .workflow
        .approve(request.id, first, None)
        .await
        .expect_err("second approval by the same user must fail");
    assert!(matches!(
        workflow_error(error),
        WorkflowError::DuplicateDecision { .. }
    ));

    // No state change happened.
    let reloaded = harness.workflow.get(request.id, requester).await.expect("get");
    assert_eq!(reloaded.status, RequestStatus::PendingManagerApproval);
    assert_eq!(reloaded.current_approval_level, 1);
}

#[tokio::test]
async fn manager_cannot_act_outside_their_turn() {
    let harness = harness().await;
    let (fin, requester, manager, _director) = harness.fin_setup().await;

    let request = harness
        .workflow
        .create(new_request(requester, fin))
        .await
        .expect("create");
    harness
        .workflow
        .approve(request.id, manager, None)
        .await
        .expect("manager approves at level 1");

    // Request is now awaiting the director; the manager is out of turn.
    let error = harness
        .workflow
        .approve(request.id, manager, None)
        .await
        .expect_err("manager must be denied at director stage");
    assert!(matches!(
        workflow_error(error),
        WorkflowError::PermissionDenied(DenialReason::WrongStatus {
            status: RequestStatus::PendingDirectorApproval,
            ..
        })
    ));
}

#[tokio::test]
async fn staff_never_approve_and_cancel_only_their_own() {
    let harness = harness().await;
    let (fin, requester, _manager, _director) = harness.fin_setup().await;
    let other_staff = harness
        .user("other.staff@example.com", UserRole::Staff, Some(fin), None)
        .await;

    let request = harness
        .workflow
        .create(new_request(requester, fin))
        .await
        .expect("create");

    let error = harness
        .workflow
        .approve(request.id, requester, None)
        .await
        .expect_err("staff approval must be denied");
    assert!(matches!(
        workflow_error(error),
        WorkflowError::PermissionDenied(DenialReason::RoleForbidden { .. })
    ));

    let error = harness
        .workflow
        .cancel(request.id, other_staff)
        .await
        .expect_err("foreign staff cancel must be denied");
    assert!(matches!(
        workflow_error(error),
        WorkflowError::PermissionDenied(DenialReason::NotRequestOwner)
    ));

    let cancelled = harness
        .workflow
        .cancel(request.id, requester)
        .await
        .expect("author cancels own request");
    assert_eq!(cancelled.status, RequestStatus::Cancelled);
}

#[tokio::test]
async fn rejection_terminates_and_records_the_note() {
    let harness = harness().await;
    let (fin, requester, manager, _director) = harness.fin_setup().await;

    let request = harness
        .workflow
        .create(new_request(requester, fin))
        .await
        .expect("create");
    let rejected = harness
        .workflow
        .reject(request.id, manager, Some("budget exceeded".to_string()))
        .await
        .expect("manager rejects");

    assert_eq!(rejected.status, RequestStatus::Rejected);
    assert_eq!(rejected.status_note.as_deref(), Some("budget exceeded"));

    let trail = harness.workflow.decision_trail(request.id).await.expect("trail");
    assert_eq!(trail.len(), 1);
    assert_eq!(trail[0].notes.as_deref(), Some("budget exceeded"));

    // Terminal: every further action fails.
    let error = harness
        .workflow
        .approve(request.id, manager, None)
        .await
        .expect_err("terminal request refuses approval");
    assert!(matches!(workflow_error(error), WorkflowError::TerminalState { .. }));
}

#[tokio::test]
async fn fulfillment_runs_process_then_complete() {
    let harness = harness().await;
    let department = harness.department("GA").await;
    let requester = harness.user("staff@example.com", UserRole::Staff, None, None).await;
    let purchasing =
        harness.user("purchasing@example.com", UserRole::Purchasing, None, None).await;

    let request = harness
        .workflow
        .create(new_request(requester, department))
        .await
        .expect("create");
    let request = harness
        .workflow
        .approve(request.id, purchasing, None)
        .await
        .expect("purchasing approves");
    assert_eq!(request.status, RequestStatus::FullyApproved);

    // Completion requires processing first.
    let error = harness
        .workflow
        .complete(request.id, purchasing)
        .await
        .expect_err("complete before process must fail");
    assert!(matches!(
        workflow_error(error),
        WorkflowError::PermissionDenied(DenialReason::WrongStatus { .. })
    ));

    let request = harness
        .workflow
        .process(request.id, purchasing)
        .await
        .expect("process");
    assert_eq!(request.status, RequestStatus::InProcess);

    let request = harness
        .workflow
        .complete(request.id, purchasing)
        .await
        .expect("complete");
    assert_eq!(request.status, RequestStatus::Completed);
}

#[tokio::test]
async fn hold_freezes_the_chain_until_reject_or_cancel() {
    let harness = harness().await;
    let (fin, requester, manager, _director) = harness.fin_setup().await;
    let admin = harness.user("admin@example.com", UserRole::Admin, None, None).await;

    let request = harness
        .workflow
        .create(new_request(requester, fin))
        .await
        .expect("create");

    let error = harness
        .workflow
        .hold(request.id, manager, None)
        .await
        .expect_err("managers may not hold");
    assert!(matches!(
        workflow_error(error),
        WorkflowError::PermissionDenied(DenialReason::RoleForbidden { .. })
    ));

    let held = harness
        .workflow
        .hold(request.id, admin, Some("waiting for budget review".to_string()))
        .await
        .expect("admin holds");
    assert_eq!(held.status, RequestStatus::OnHold);
    assert_eq!(held.status_note.as_deref(), Some("waiting for budget review"));

    // Hold is not resumable into the chain; the manager stays locked out.
    let error = harness
        .workflow
        .approve(request.id, manager, None)
        .await
        .expect_err("chain approver cannot act on a held request");
    assert!(matches!(
        workflow_error(error),
        WorkflowError::PermissionDenied(DenialReason::WrongStatus { .. })
    ));

    let rejected = harness
        .workflow
        .reject(request.id, admin, Some("shelved".to_string()))
        .await
        .expect("admin rejects from hold");
    assert_eq!(rejected.status, RequestStatus::Rejected);
}

#[tokio::test]
async fn draft_lifecycle_update_and_delete() {
    let harness = harness().await;
    let (fin, requester, _manager, _director) = harness.fin_setup().await;
    let other_staff = harness
        .user("other.staff@example.com", UserRole::Staff, Some(fin), None)
        .await;

    let mut draft_input = new_request(requester, fin);
    draft_input.draft = true;
    let draft = harness.workflow.create(draft_input).await.expect("create draft");
    assert_eq!(draft.status, RequestStatus::Draft);
    assert!(
        harness.notifier.approver_alerts().is_empty(),
        "drafts are not routed or announced"
    );

    let error = harness
        .workflow
        .update_draft(draft.id, other_staff, DraftUpdate::default())
        .await
        .expect_err("foreign staff may not edit the draft");
    assert!(matches!(
        workflow_error(error),
        WorkflowError::PermissionDenied(DenialReason::NotDraftOwner)
    ));

    let updated = harness
        .workflow
        .update_draft(
            draft.id,
            requester,
            DraftUpdate {
                description: Some("ergonomic chairs".to_string()),
                items: Some(vec![NewRequestItem {
                    item_name: "ergonomic chair".to_string(),
                    quantity: 2,
                    unit_price: Decimal::new(900_000, 0),
                    total_price: Decimal::new(1_800_000, 0),
                    category: "furniture".to_string(),
                    requested_delivery_date: None,
                }]),
                ..DraftUpdate::default()
            },
        )
        .await
        .expect("author edits the draft");
    assert_eq!(updated.description, "ergonomic chairs");
    assert_eq!(updated.total_amount, Decimal::new(1_800_000, 0));

    let submitted = harness
        .workflow
        .submit(updated.id, requester)
        .await
        .expect("author submits the draft");
    assert_eq!(submitted.status, RequestStatus::PendingManagerApproval);
    assert_eq!(submitted.current_approval_level, 1);
    assert_eq!(
        harness.notifier.approver_alerts().len(),
        1,
        "submission alerts the first layer"
    );

    // A submitted request is no longer a draft.
    let error = harness
        .workflow
        .submit(submitted.id, requester)
        .await
        .expect_err("double submit must fail");
    assert!(matches!(workflow_error(error), WorkflowError::InvalidState { .. }));

    let mut second_draft_input = new_request(requester, fin);
    second_draft_input.draft = true;
    let draft = harness.workflow.create(second_draft_input).await.expect("create draft");

    harness.workflow.delete_draft(draft.id, requester).await.expect("delete draft");
    let error = harness
        .workflow
        .get(draft.id, requester)
        .await
        .expect_err("deleted draft is gone");
    assert!(matches!(workflow_error(error), WorkflowError::NotFound { .. }));

    // A routed request can no longer be edited or deleted.
    let routed = harness
        .workflow
        .create(new_request(requester, fin))
        .await
        .expect("create routed");
    let error = harness
        .workflow
        .update_draft(routed.id, requester, DraftUpdate::default())
        .await
        .expect_err("routed request is immutable");
    assert!(matches!(workflow_error(error), WorkflowError::InvalidState { .. }));
}

#[tokio::test]
async fn request_codes_increment_within_the_day() {
    let harness = harness().await;
    let department = harness.department("GA").await;
    let requester = harness.user("staff@example.com", UserRole::Staff, None, None).await;

    let first = harness
        .workflow
        .create(new_request(requester, department))
        .await
        .expect("create first");
    let second = harness
        .workflow
        .create(new_request(requester, department))
        .await
        .expect("create second");

    let first_sequence = wapprove_core::codes::sequence_of(&first.request_code)
        .expect("well-formed code");
    let second_sequence = wapprove_core::codes::sequence_of(&second.request_code)
        .expect("well-formed code");
    assert_eq!(second_sequence, first_sequence + 1);
    assert_eq!(&first.request_code[..12], &second.request_code[..12]);
}

#[tokio::test]
async fn visibility_hides_foreign_requests_from_staff() {
    let harness = harness().await;
    let (fin, requester, _manager, _director) = harness.fin_setup().await;
    let other_staff = harness
        .user("other.staff@example.com", UserRole::Staff, Some(fin), None)
        .await;

    let request = harness
        .workflow
        .create(new_request(requester, fin))
        .await
        .expect("create");

    harness.workflow.get(request.id, requester).await.expect("author sees own request");

    let error = harness
        .workflow
        .get(request.id, other_staff)
        .await
        .expect_err("foreign staff must not see the request");
    assert!(matches!(workflow_error(error), WorkflowError::NotFound { .. }));
}

#[tokio::test]
async fn delivery_callbacks_update_the_notification_trail() {
    let harness = harness().await;
    let (fin, requester, _manager, _director) = harness.fin_setup().await;

    let request = harness
        .workflow
        .create(new_request(requester, fin))
        .await
        .expect("create");

    let notifications = SqlNotificationRepository::new(harness.pool.clone());
    let trail = notifications
        .history(None, Some(request.id))
        .await
        .expect("history");
    assert_eq!(trail.len(), 1, "the first-layer approver alert is recorded");
    let message_sid = trail[0].message_sid.clone().expect("recorded sid");
    assert!(trail[0].is_sent);
    assert!(!trail[0].is_read);

    harness
        .workflow
        .delivery_callback(&message_sid, "read")
        .await
        .expect("callback");

    let trail = notifications
        .history(None, Some(request.id))
        .await
        .expect("history");
    assert!(trail[0].is_read);

    // Unknown sids are ignored.
    harness
        .workflow
        .delivery_callback("SM-unknown", "delivered")
        .await
        .expect("unknown sid is a no-op");
}

#[tokio::test]
async fn approver_removed_between_decisions_is_denied() {
    let harness = harness().await;
    let fin = harness.department("FIN").await;
    let requester = harness.user("staff@example.com", UserRole::Staff, Some(fin), None).await;
    let manager = harness
        .user("manager@example.com", UserRole::Manager, Some(fin), None)
        .await;
    harness.approver(manager, fin, ApproverType::Manager, 1).await;

    let request = harness
        .workflow
        .create(new_request(requester, fin))
        .await
        .expect("create");

    // The layer loses its approvers between routing and decision.
    sqlx_delete_approvers(&harness.pool).await;

    let error = harness
        .workflow
        .approve(request.id, manager, None)
        .await
        .expect_err("a layer without approvers cannot be satisfied");
    assert!(matches!(
        workflow_error(error),
        WorkflowError::PermissionDenied(DenialReason::NotAnApprover { .. })
    ));
}

async fn sqlx_delete_approvers(pool: &DbPool) {
    sqlx::query("DELETE FROM approvers")
        .execute(pool)
        .await
        .expect("delete approvers");
}
