//! Recipient phone number normalization.
//!
//! Numbers arrive in whatever shape students typed them: local ten digit
//! numbers, with or without the `91` dial prefix, with leading trunk zeros,
//! spaces or hyphens. Everything is turned into `+<country><number>` before it
//! reaches the provider.

/// Dial prefix of the home country, without the `+`.
pub const HOME_DIAL_PREFIX: &str = "91";

/// Length of a home-country number including the dial prefix.
const PREFIXED_LEN: usize = 12;

/// Length of a bare subscriber number.
const LOCAL_LEN: usize = 10;

/// Normalize `raw` into international form.
///
/// Returns `None` when nothing remains after removing separators. Numbers that
/// already carry a `+` are returned untouched. Anything the rules do not
/// recognise gets `fallback_prefix` glued on verbatim, so the result only has a
/// `+` if the prefix itself has one.
pub fn normalize(raw: &str, fallback_prefix: &str) -> Option<String> {
    let phone: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect();
    if phone.is_empty() {
        return None;
    }

    if phone.starts_with('+') {
        return Some(phone);
    }

    let digits = phone.trim_start_matches('0');

    if digits.starts_with(HOME_DIAL_PREFIX) && digits.len() == PREFIXED_LEN {
        return Some(format!("+{digits}"));
    }
    if digits.len() == LOCAL_LEN {
        return Some(format!("+{HOME_DIAL_PREFIX}{digits}"));
    }
    if digits.starts_with(HOME_DIAL_PREFIX) {
        return Some(format!("+{digits}"));
    }
    Some(format!("{fallback_prefix}{digits}"))
}
