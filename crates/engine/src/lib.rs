pub mod notify;
pub mod service;

pub use notify::{
    ApproverAlert, DeliveryReceipt, NoopNotifier, Notifier, RecordingNotifier, StatusAlert,
};
pub use service::{ApprovalWorkflow, ServiceError};
