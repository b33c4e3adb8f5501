//! Permission gate: decides whether an actor may perform a workflow action
//! on a request, before any mutation happens. Every denial carries the
//! specific rule that failed; callers surface the message verbatim.

use std::fmt;

use thiserror::Error;

use crate::domain::department::DepartmentId;
use crate::domain::request::{Request, RequestStatus};
use crate::domain::user::UserRole;
use crate::errors::WorkflowError;
use crate::workflow::actor::{ActorContext, RoleClass};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WorkflowAction {
    Approve,
    Reject,
    Cancel,
    Hold,
    Process,
    Complete,
}

impl WorkflowAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::Cancel => "cancel",
            Self::Hold => "hold",
            Self::Process => "process",
            Self::Complete => "complete",
        }
    }
}

impl fmt::Display for WorkflowAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DenialReason {
    #[error("role {role} may not {action} requests")]
    RoleForbidden { role: UserRole, action: WorkflowAction },
    #[error("cannot {action} while the request is {status} (requires {required})")]
    WrongStatus { action: WorkflowAction, status: RequestStatus, required: &'static str },
    #[error("managers may only act on requests from their own department (request belongs to department {request_department})")]
    WrongDepartment { request_department: DepartmentId },
    #[error("actor holds no approver record for department {department_id}")]
    NotAnApprover { department_id: DepartmentId },
    #[error("request awaits approval at level {current_level}; this approver decides at level {approver_level}")]
    WrongLevel { current_level: i64, approver_level: i64 },
    #[error("staff may only cancel requests they authored")]
    NotRequestOwner,
    #[error("drafts may only be modified by their author or by admin/purchasing")]
    NotDraftOwner,
}

/// Statuses from which a manager or director may still reject.
const CHAIN_REJECTABLE: &[RequestStatus] = &[
    RequestStatus::PendingManagerApproval,
    RequestStatus::PendingDirectorApproval,
    RequestStatus::DirectorApproved,
];

pub fn authorize(
    action: WorkflowAction,
    request: &Request,
    actor: &ActorContext,
) -> Result<(), WorkflowError> {
    if request.status.is_terminal() {
        return Err(WorkflowError::TerminalState {
            request_code: request.request_code.clone(),
            status: request.status,
        });
    }

    match actor.role_class {
        RoleClass::Staff => authorize_staff(action, request, actor),
        RoleClass::Manager => authorize_manager(action, request, actor),
        RoleClass::Director => authorize_director(action, request, actor),
        RoleClass::AdminOrPurchasing => authorize_admin_or_purchasing(action, request),
    }
}

fn authorize_staff(
    action: WorkflowAction,
    request: &Request,
    actor: &ActorContext,
) -> Result<(), WorkflowError> {
    match action {
        WorkflowAction::Cancel => {
            if request.user_id == actor.user.id {
                Ok(())
            } else {
                Err(DenialReason::NotRequestOwner.into())
            }
        }
        _ => Err(DenialReason::RoleForbidden { role: actor.user.role, action }.into()),
    }
}

fn authorize_manager(
    action: WorkflowAction,
    request: &Request,
    actor: &ActorContext,
) -> Result<(), WorkflowError> {
    match action {
        WorkflowAction::Approve => {
            if request.status != RequestStatus::PendingManagerApproval {
                return Err(DenialReason::WrongStatus {
                    action,
                    status: request.status,
                    required: "PENDING_MANAGER_APPROVAL",
                }
                .into());
            }
            require_same_department(request, actor)?;
            require_level_match(request, actor)
        }
        WorkflowAction::Reject => {
            if !CHAIN_REJECTABLE.contains(&request.status) {
                return Err(DenialReason::WrongStatus {
                    action,
                    status: request.status,
                    required: "a pending-approval or DIRECTOR_APPROVED status",
                }
                .into());
            }
            require_same_department(request, actor)?;
            require_approver_record(request, actor).map(|_| ())
        }
        _ => Err(DenialReason::RoleForbidden { role: actor.user.role, action }.into()),
    }
}

fn authorize_director(
    action: WorkflowAction,
    request: &Request,
    actor: &ActorContext,
) -> Result<(), WorkflowError> {
    match action {
        WorkflowAction::Approve => {
            if request.status != RequestStatus::PendingDirectorApproval {
                return Err(DenialReason::WrongStatus {
                    action,
                    status: request.status,
                    required: "PENDING_DIRECTOR_APPROVAL",
                }
                .into());
            }
            // Directors are not bound to a home department; an approver
            // record in the request's department at any level suffices.
            require_approver_record(request, actor)?;
            require_level_match(request, actor)
        }
        WorkflowAction::Reject => {
            if !CHAIN_REJECTABLE.contains(&request.status) {
                return Err(DenialReason::WrongStatus {
                    action,
                    status: request.status,
                    required: "a pending-approval or DIRECTOR_APPROVED status",
                }
                .into());
            }
            require_approver_record(request, actor).map(|_| ())
        }
        _ => Err(DenialReason::RoleForbidden { role: actor.user.role, action }.into()),
    }
}

fn authorize_admin_or_purchasing(
    action: WorkflowAction,
    request: &Request,
) -> Result<(), WorkflowError> {
    match action {
        WorkflowAction::Approve => {
            if request.status != RequestStatus::PendingPurchasingApproval {
                return Err(DenialReason::WrongStatus {
                    action,
                    status: request.status,
                    required: "PENDING_PURCHASING_APPROVAL",
                }
                .into());
            }
            Ok(())
        }
        // Reject, cancel, and hold are open at any non-terminal status for
        // this class; the terminal guard already ran.
        WorkflowAction::Reject | WorkflowAction::Cancel | WorkflowAction::Hold => Ok(()),
        WorkflowAction::Process => {
            if request.status != RequestStatus::FullyApproved {
                return Err(DenialReason::WrongStatus {
                    action,
                    status: request.status,
                    required: "FULLY_APPROVED",
                }
                .into());
            }
            Ok(())
        }
        WorkflowAction::Complete => {
            if request.status != RequestStatus::InProcess {
                return Err(DenialReason::WrongStatus {
                    action,
                    status: request.status,
                    required: "IN_PROCESS",
                }
                .into());
            }
            Ok(())
        }
    }
}

fn require_same_department(request: &Request, actor: &ActorContext) -> Result<(), WorkflowError> {
    if actor.user.department_id == Some(request.department_id) {
        Ok(())
    } else {
        Err(DenialReason::WrongDepartment { request_department: request.department_id }.into())
    }
}

fn require_approver_record<'a>(
    request: &Request,
    actor: &'a ActorContext,
) -> Result<&'a crate::domain::approver::Approver, WorkflowError> {
    actor
        .approver
        .as_ref()
        .ok_or_else(|| DenialReason::NotAnApprover { department_id: request.department_id }.into())
}

fn require_level_match(request: &Request, actor: &ActorContext) -> Result<(), WorkflowError> {
    let approver = require_approver_record(request, actor)?;
    if approver.approval_level == request.current_approval_level {
        Ok(())
    } else {
        Err(DenialReason::WrongLevel {
            current_level: request.current_approval_level,
            approver_level: approver.approval_level,
        }
        .into())
    }
}
