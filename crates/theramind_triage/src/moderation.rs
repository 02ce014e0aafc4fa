//! Hard moderation gate for flatly disallowed content.
//!
//! The only gate that may refuse without any empathetic framing, and the
//! only one allowed to short-circuit the whole pipeline.

use regex::Regex;
use std::sync::LazyLock;
use theramind_core::Reply;

static RE_DISALLOWED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(bomb|kill someone|terror|rape|explosives|child sexual)\b").unwrap()
});

/// Test text against the disallowed-term blocklist.
///
/// Returns `(allowed, reason)`. Empty text is allowed; the gibberish gate
/// handles it further down the chain.
pub fn moderate(text: &str) -> (bool, Option<&'static str>) {
    if text.is_empty() {
        return (true, None);
    }
    if RE_DISALLOWED.is_match(text) {
        return (false, Some("disallowed_content"));
    }
    (true, None)
}

pub fn refusal_reply() -> &'static str {
    "I’m sorry — I can’t help with that request."
}

/// Gate adapter for the ordered screen list.
pub fn gate(text: &str, _country: Option<&str>) -> Option<Reply> {
    let (allowed, reason) = moderate(text);
    if allowed {
        return None;
    }
    tracing::info!(reason = reason.unwrap_or("unknown"), "Message refused by moderation");
    Some(Reply::text_only(refusal_reply()))
}
