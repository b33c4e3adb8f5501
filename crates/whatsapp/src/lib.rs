//! WhatsApp channel for the approval workflow:
//! - **Messages** (`messages`) - outbound message bodies (approval asks,
//!   status updates, help and error replies)
//! - **Commands** (`commands`) - inbound `APPROVE <code>` / `REJECT <code>
//!   <reason>` parsing
//! - **Twilio** (`twilio`) - Messages API client and webhook signature
//!   validation
//! - **Webhook** (`webhook`) - inbound payload types and dispatch onto the
//!   [`webhook::ApprovalCommandService`] trait the application implements
//!
//! The engine never branches on delivery results beyond logging; this crate
//! reports them as plain outcome values, never as errors.

pub mod commands;
pub mod messages;
pub mod twilio;
pub mod webhook;
