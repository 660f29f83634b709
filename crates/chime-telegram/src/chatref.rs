//! Destination-reference parsing.
//!
//! Turns free-form user input — `@name`, a `t.me` link, a raw chat ID — into
//! the canonical destination string stored on the reminder: `@username` or a
//! numeric chat ID. Invite links (`t.me/+…`) and private `t.me/c/…` links
//! carry no resolvable public identifier, so they are rejected.

/// Normalize user input into a canonical chat reference, or `None` when the
/// input cannot name a deliverable chat.
pub fn normalize_chat_ref(input: &str) -> Option<String> {
    let mut value = input.trim().to_string();
    if value.starts_with('@') {
        return Some(value);
    }
    for prefix in ["https://t.me/", "http://t.me/", "t.me/"] {
        if let Some(rest) = value.strip_prefix(prefix) {
            value = rest.to_string();
            break;
        }
    }
    if value.starts_with('+') || value.starts_with("c/") {
        return None;
    }
    if is_numeric_id(&value) {
        return Some(value);
    }
    if is_username(&value) {
        return Some(format!("@{value}"));
    }
    None
}

/// A chat ID: optional leading `-` (groups are negative) followed by digits.
fn is_numeric_id(s: &str) -> bool {
    let digits = s.strip_prefix('-').unwrap_or(s);
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

/// Telegram usernames are at least 4 chars of `[A-Za-z0-9_]`.
fn is_username(s: &str) -> bool {
    s.len() >= 4 && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
