//! Approval chain resolution. A department's chain is always derived from
//! its approver records at decision time — never cached across requests and
//! never taken from the department's advisory layer count.

use serde::{Deserialize, Serialize};

use crate::domain::approver::{Approver, ApproverType};
use crate::domain::request::RequestStatus;

/// One step of a department's chain. A layer may be backed by several
/// approvers at the same level; together they form the quorum group.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalLayer {
    pub approval_level: i64,
    pub approver_type: ApproverType,
}

impl ApprovalLayer {
    pub fn pending_status(&self) -> RequestStatus {
        match self.approver_type {
            ApproverType::Manager => RequestStatus::PendingManagerApproval,
            ApproverType::Director => RequestStatus::PendingDirectorApproval,
            ApproverType::Purchasing => RequestStatus::PendingPurchasingApproval,
        }
    }

    /// Human label used in outbound notifications.
    pub fn label(&self) -> String {
        match self.approver_type {
            ApproverType::Manager => format!("Manager Approval (Level {})", self.approval_level),
            ApproverType::Director => format!("Director Approval (Level {})", self.approval_level),
            ApproverType::Purchasing => "Purchasing Approval".to_string(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ApprovalChain {
    layers: Vec<ApprovalLayer>,
}

impl ApprovalChain {
    /// Collapses approver rows into ordered layers, one per distinct level.
    /// Input order does not matter; within a level the lowest approver id
    /// determines the layer type, matching level-ordered row iteration.
    pub fn from_approvers(approvers: &[Approver]) -> Self {
        let mut rows: Vec<&Approver> = approvers.iter().collect();
        rows.sort_by_key(|approver| (approver.approval_level, approver.id.0));

        let mut layers: Vec<ApprovalLayer> = Vec::new();
        for approver in rows {
            if layers.last().map(|layer| layer.approval_level) == Some(approver.approval_level) {
                continue;
            }
            layers.push(ApprovalLayer {
                approval_level: approver.approval_level,
                approver_type: approver.approver_type,
            });
        }

        Self { layers }
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn layers(&self) -> &[ApprovalLayer] {
        &self.layers
    }

    pub fn layer_at(&self, approval_level: i64) -> Option<&ApprovalLayer> {
        self.layers.iter().find(|layer| layer.approval_level == approval_level)
    }

    pub fn next_after(&self, approval_level: i64) -> Option<&ApprovalLayer> {
        self.layers.iter().find(|layer| layer.approval_level > approval_level)
    }

    pub fn max_level(&self) -> Option<i64> {
        self.layers.last().map(|layer| layer.approval_level)
    }

    /// Level of the synthetic terminal purchasing layer: one past the
    /// highest configured level (1 for an empty chain).
    pub fn purchasing_level(&self) -> i64 {
        self.max_level().unwrap_or(0) + 1
    }

    /// Status a freshly routed request starts in. A department with no
    /// configured approvers requires only purchasing approval.
    pub fn initial_status(&self) -> RequestStatus {
        match self.layers.first() {
            Some(layer) => layer.pending_status(),
            None => RequestStatus::PendingPurchasingApproval,
        }
    }
}
