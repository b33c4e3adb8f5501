//! Inbound command grammar. Messages that do not parse get the help reply;
//! parsing never touches the store.

use wapprove_core::codes;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InboundCommand {
    Approve { request_code: String },
    Reject { request_code: String, reason: String },
}

/// `APPROVE REQ-YYYYMMDD-NNNN` or `REJECT REQ-YYYYMMDD-NNNN <reason>`.
/// The verb and code are case-insensitive; the rejection reason keeps its
/// original casing and is required.
pub fn parse_inbound_command(text: &str) -> Option<InboundCommand> {
    let mut parts = text.split_whitespace();
    let verb = parts.next()?.to_ascii_uppercase();
    let request_code = parts.next()?.to_ascii_uppercase();
    if !codes::is_request_code(&request_code) {
        return None;
    }

    match verb.as_str() {
        "APPROVE" => parts.next().is_none().then_some(InboundCommand::Approve { request_code }),
        "REJECT" => {
            let reason = parts.collect::<Vec<_>>().join(" ");
            if reason.is_empty() {
                return None;
            }
            Some(InboundCommand::Reject { request_code, reason })
        }
        _ => None,
    }
}
