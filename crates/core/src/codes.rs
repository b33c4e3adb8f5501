//! Request code generation: `REQ-YYYYMMDD-NNNN`, where the four-digit
//! sequence restarts at 0001 for each calendar date.

use chrono::NaiveDate;

pub fn daily_prefix(date: NaiveDate) -> String {
    format!("REQ-{}", date.format("%Y%m%d"))
}

/// Next code for `date`, given the highest code already issued under the
/// same daily prefix (lexicographic max equals numeric max because the
/// sequence is zero-padded).
pub fn next_request_code(date: NaiveDate, latest_for_date: Option<&str>) -> String {
    let sequence = latest_for_date.and_then(sequence_of).map_or(1, |last| last + 1);
    format!("{}-{sequence:04}", daily_prefix(date))
}

/// The numeric sequence of a well-formed request code.
pub fn sequence_of(code: &str) -> Option<u32> {
    let (_, sequence) = split_code(code)?;
    sequence.parse().ok()
}

/// Whether `text` has the shape of a request code (`REQ-` + 8 digits +
/// `-` + at least 4 digits). Used by the inbound command parser before
/// hitting the store.
pub fn is_request_code(text: &str) -> bool {
    split_code(text).is_some()
}

fn split_code(code: &str) -> Option<(&str, &str)> {
    let rest = code.strip_prefix("REQ-")?;
    let (date, sequence) = rest.split_once('-')?;
    let date_ok = date.len() == 8 && date.bytes().all(|b| b.is_ascii_digit());
    let sequence_ok = sequence.len() >= 4 && sequence.bytes().all(|b| b.is_ascii_digit());
    (date_ok && sequence_ok).then_some((date, sequence))
}
