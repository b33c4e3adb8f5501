//! Quorum check for one chain layer: every configured approver at the layer
//! must have an APPROVED decision before the request may advance.

use std::collections::HashSet;

use crate::domain::approval_log::{ApprovalLog, ApprovalStatus};
use crate::domain::approver::Approver;
use crate::domain::department::DepartmentId;
use crate::domain::user::UserId;
use crate::errors::WorkflowError;

/// `approvers_at_level` are the rows configured for (department, level);
/// `logs` are the request's decision rows (any status, any level — they are
/// filtered here). A layer with zero configured approvers is never
/// satisfied; invoking the check against one is a configuration error, not
/// a silent skip.
pub fn layer_satisfied(
    department_id: DepartmentId,
    approval_level: i64,
    approvers_at_level: &[Approver],
    logs: &[ApprovalLog],
) -> Result<bool, WorkflowError> {
    if approvers_at_level.is_empty() {
        return Err(WorkflowError::ChainMisconfigured { department_id, approval_level });
    }

    let required: HashSet<UserId> =
        approvers_at_level.iter().map(|approver| approver.user_id).collect();
    let approved: HashSet<UserId> = logs
        .iter()
        .filter(|log| log.approval_status == ApprovalStatus::Approved)
        .map(|log| log.approver_user_id)
        .filter(|user_id| required.contains(user_id))
        .collect();

    Ok(approved.len() == required.len())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::layer_satisfied;
    use crate::domain::approval_log::{ApprovalLog, ApprovalLogId, ApprovalStatus};
    use crate::domain::approver::{Approver, ApproverId, ApproverType};
    use crate::domain::department::DepartmentId;
    use crate::domain::request::RequestId;
    use crate::domain::user::UserId;
    use crate::errors::WorkflowError;

    const DEPT: DepartmentId = DepartmentId(1);

    fn approver(user_id: i64) -> Approver {
        let now = Utc::now();
        Approver {
            id: ApproverId(user_id),
            user_id: UserId(user_id),
            department_id: DEPT,
            approver_type: ApproverType::Manager,
            approval_level: 1,
            created_at: now,
            updated_at: now,
        }
    }

    fn log(id: i64, user_id: i64, status: ApprovalStatus) -> ApprovalLog {
        ApprovalLog {
            id: ApprovalLogId(id),
            request_id: RequestId(1),
            approver_user_id: UserId(user_id),
            approver_id: Some(ApproverId(user_id)),
            approval_status: status,
            notes: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn partial_approval_does_not_satisfy_the_layer() {
        let approvers = [approver(10), approver(11)];
        let logs = [log(1, 10, ApprovalStatus::Approved)];

        let satisfied = layer_satisfied(DEPT, 1, &approvers, &logs).expect("valid layer");
        assert!(!satisfied);
    }

    #[test]
    fn all_distinct_approvals_satisfy_the_layer() {
        let approvers = [approver(10), approver(11)];
        let logs = [
            log(1, 10, ApprovalStatus::Approved),
            log(2, 11, ApprovalStatus::Approved),
        ];

        let satisfied = layer_satisfied(DEPT, 1, &approvers, &logs).expect("valid layer");
        assert!(satisfied);
    }

    #[test]
    fn rejections_and_outsiders_do_not_count_toward_quorum() {
        let approvers = [approver(10), approver(11)];
        let logs = [
            log(1, 10, ApprovalStatus::Approved),
            log(2, 11, ApprovalStatus::Rejected),
            // An approval from a user outside the layer's quorum group.
            log(3, 99, ApprovalStatus::Approved),
        ];

        let satisfied = layer_satisfied(DEPT, 1, &approvers, &logs).expect("valid layer");
        assert!(!satisfied);
    }

    #[test]
    fn a_layer_without_approvers_is_a_configuration_error() {
        let error = layer_satisfied(DEPT, 2, &[], &[]).expect_err("empty layer must error");
        assert_eq!(
            error,
            WorkflowError::ChainMisconfigured { department_id: DEPT, approval_level: 2 }
        );
    }
}
