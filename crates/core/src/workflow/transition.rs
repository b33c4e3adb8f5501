//! Status transition engine. Pure: given the resolved chain and the level
//! whose quorum was just satisfied, computes the request's next status and
//! level. All persistence and concurrency guarding happens in the caller.

use thiserror::Error;

use crate::domain::approver::ApproverType;
use crate::domain::request::RequestStatus;
use crate::workflow::chain::{ApprovalChain, ApprovalLayer};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("no approval layer is configured at level {approval_level}")]
    MissingLayer { approval_level: i64 },
}

/// Outcome of a satisfied layer. `entered_layer` is the configured layer the
/// request moved into, when there is one — the synthetic purchasing layer
/// and terminal approval carry `None`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Advance {
    pub status: RequestStatus,
    pub approval_level: i64,
    pub entered_layer: Option<ApprovalLayer>,
}

/// Route for a freshly submitted request: first layer's pending status, or
/// straight to purchasing when the chain is empty. Level always starts at 1.
pub fn initial_route(chain: &ApprovalChain) -> (RequestStatus, i64) {
    (chain.initial_status(), 1)
}

/// Advance past `current_level` once its quorum is satisfied:
/// - a configured layer above the current one exists → its pending status at
///   its level;
/// - the chain is exhausted and the current layer is not PURCHASING → the
///   synthetic purchasing layer (level `max + 1`);
/// - the current layer is PURCHASING → terminal approval.
pub fn advance_after_quorum(
    chain: &ApprovalChain,
    current_level: i64,
) -> Result<Advance, TransitionError> {
    let current = chain
        .layer_at(current_level)
        .ok_or(TransitionError::MissingLayer { approval_level: current_level })?;

    if let Some(next) = chain.next_after(current_level) {
        return Ok(Advance {
            status: next.pending_status(),
            approval_level: next.approval_level,
            entered_layer: Some(next.clone()),
        });
    }

    if current.approver_type != ApproverType::Purchasing {
        return Ok(Advance {
            status: RequestStatus::PendingPurchasingApproval,
            approval_level: chain.purchasing_level(),
            entered_layer: None,
        });
    }

    Ok(Advance {
        status: RequestStatus::FullyApproved,
        approval_level: current_level,
        entered_layer: None,
    })
}
