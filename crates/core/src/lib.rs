pub mod codes;
pub mod config;
pub mod domain;
pub mod errors;
pub mod visibility;
pub mod workflow;

pub use domain::approval_log::{
    ApprovalLog, ApprovalLogId, ApprovalStatus, NewApprovalLog,
};
pub use domain::approver::{Approver, ApproverId, ApproverType, NewApprover};
pub use domain::department::{Department, DepartmentId, NewDepartment};
pub use domain::notification::{
    NewNotification, Notification, NotificationId, NotificationType,
};
pub use domain::request::{
    DraftUpdate, NewRequest, NewRequestItem, Request, RequestId, RequestItem, RequestStatus,
    UrgencyLevel,
};
pub use domain::user::{NewUser, User, UserId, UserRole};
pub use errors::WorkflowError;
pub use visibility::{visibility_filter, VisibilityFilter};
pub use workflow::actor::{ActorContext, RoleClass};
pub use workflow::chain::{ApprovalChain, ApprovalLayer};
pub use workflow::gate::{authorize, DenialReason, WorkflowAction};
pub use workflow::quorum::layer_satisfied;
pub use workflow::transition::{advance_after_quorum, initial_route, Advance, TransitionError};
