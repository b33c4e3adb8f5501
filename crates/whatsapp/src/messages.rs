//! Outbound WhatsApp message bodies.

use rust_decimal::Decimal;

use wapprove_core::domain::request::{RequestItem, RequestStatus};

pub struct ApprovalRequestMessage<'a> {
    pub request_code: &'a str,
    pub requester_name: &'a str,
    pub description: &'a str,
    pub total_amount: Decimal,
    pub level_label: &'a str,
    pub items: &'a [RequestItem],
}

pub fn approval_request_body(message: &ApprovalRequestMessage<'_>) -> String {
    let mut body = format!(
        "\u{1F514} *APPROVAL REQUEST*\n\n\
         \u{1F4CB} Request: {}\n\
         \u{1F464} Requester: {}\n\
         \u{1F4DD} Description: {}\n\
         \u{1F4B0} Total Amount: Rp {}\n\
         \u{1F4CA} Level: {}",
        message.request_code,
        message.requester_name,
        message.description,
        format_amount(message.total_amount),
        message.level_label,
    );

    if !message.items.is_empty() {
        body.push_str("\n\n\u{1F4E6} *ITEM DETAILS:*");
        for (index, item) in message.items.iter().enumerate() {
            body.push_str(&format!(
                "\n\n{}. {}\n   \u{1F4C1} Category: {}\n   \u{1F522} Qty: {}\n   \
                 \u{1F4B5} Unit Price: Rp {}\n   \u{1F4B0} Total: Rp {}",
                index + 1,
                item.item_name,
                item.category,
                item.quantity,
                format_amount(item.unit_price),
                format_amount(item.total_price),
            ));
        }
    }

    body.push_str(&format!(
        "\n\nPlease review and approve/reject this request.\n\n\
         Reply with:\n\
         \u{2022} *APPROVE {code}* - to approve\n\
         \u{2022} *REJECT {code} [reason]* - to reject\n\n\
         Thank you! \u{1F64F}",
        code = message.request_code,
    ));

    body
}

pub fn status_update_body(
    request_code: &str,
    status: RequestStatus,
    actor_name: &str,
    notes: Option<&str>,
) -> String {
    let mut body = format!(
        "{} *REQUEST UPDATE*\n\n\
         \u{1F4CB} Request: {}\n\
         \u{1F4CA} Status: {}\n\
         \u{1F464} By: {}",
        status_emoji(status),
        request_code,
        status,
        actor_name,
    );

    if let Some(notes) = notes {
        body.push_str(&format!("\n\u{1F4DD} Notes: {notes}"));
    }

    body
}

pub fn status_emoji(status: RequestStatus) -> &'static str {
    match status {
        RequestStatus::ManagerApproved
        | RequestStatus::DirectorApproved
        | RequestStatus::PurchasingApproved
        | RequestStatus::Completed => "\u{2705}",
        RequestStatus::FullyApproved => "\u{1F389}",
        RequestStatus::Rejected => "\u{274C}",
        RequestStatus::OnHold => "\u{23F8}\u{FE0F}",
        RequestStatus::InProcess => "\u{1F504}",
        RequestStatus::Cancelled => "\u{1F6AB}",
        _ => "\u{1F4CB}",
    }
}

pub fn help_body() -> String {
    "\u{1F916} *WApprove Bot Commands*\n\n\
     To approve a request:\n\
     *APPROVE REQ-YYYYMMDD-XXXX*\n\n\
     To reject a request:\n\
     *REJECT REQ-YYYYMMDD-XXXX [reason]*\n\n\
     Example:\n\
     \u{2022} APPROVE REQ-20260806-0001\n\
     \u{2022} REJECT REQ-20260806-0001 Budget exceeded\n\n\
     Need help? Contact administrator."
        .to_string()
}

pub fn error_body(detail: &str) -> String {
    format!("\u{274C} *Error*\n\n{detail}")
}

pub fn approved_reply(request_code: &str) -> String {
    format!("Request {request_code} has been approved successfully! \u{2705}")
}

pub fn rejected_reply(request_code: &str) -> String {
    format!("Request {request_code} has been rejected. \u{274C}")
}

/// `id-ID` style amount: dots group thousands, a comma separates any
/// fractional part, trailing fractional zeros are dropped.
pub fn format_amount(amount: Decimal) -> String {
    let normalized = amount.normalize();
    let text = normalized.to_string();
    let (sign, unsigned) = match text.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", text.as_str()),
    };
    let (integer, fraction) = match unsigned.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (unsigned, None),
    };

    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (index, ch) in integer.chars().enumerate() {
        if index > 0 && (integer.len() - index) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    match fraction {
        Some(fraction) => format!("{sign}{grouped},{fraction}"),
        None => format!("{sign}{grouped}"),
    }
}
