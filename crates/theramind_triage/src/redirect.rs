//! Explicit navigation-intent detection for the breathing and journal pages.
//!
//! Deliberately narrow: a redirect fires only on an explicit navigation verb
//! plus target (or a fixed canned phrase), so ordinary mentions of "journal"
//! or "breathing" inside an emotional narrative never yank the user away.

use regex::Regex;
use std::sync::LazyLock;
use theramind_core::{Action, Reply};

static RE_NAV_BREATHING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(open|go to|show|start|begin|take me to|launch)\b.*\b(breath|breathing|breathing exercise|guided breathing)\b",
    )
    .unwrap()
});

static RE_NAV_JOURNAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(open|go to|show|start|begin|take me to|launch)\b.*\b(journal|journaling|journal entry)\b",
    )
    .unwrap()
});

static RE_CANNED_BREATHING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(start breathing exercise|guided breathing|breathing exercise|guide me through breathing)\b",
    )
    .unwrap()
});

static RE_CANNED_JOURNAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(open journal|open journaling|start journaling|write in my journal)\b").unwrap()
});

/// Detect an explicit request to open the breathing or journaling page.
pub fn detect_redirect(text: &str) -> Option<Action> {
    let t = text.trim().to_lowercase();
    if RE_NAV_BREATHING.is_match(&t) || RE_CANNED_BREATHING.is_match(&t) {
        return Some(Action::Redirect {
            url: "/breathing".to_string(),
            label: "breathing".to_string(),
        });
    }
    if RE_NAV_JOURNAL.is_match(&t) || RE_CANNED_JOURNAL.is_match(&t) {
        return Some(Action::Redirect {
            url: "/journaling".to_string(),
            label: "journal".to_string(),
        });
    }
    None
}

/// Gate adapter for the ordered screen list.
pub fn gate(text: &str, _country: Option<&str>) -> Option<Reply> {
    let action = detect_redirect(text)?;
    let label = match &action {
        Action::Redirect { label, .. } => label.clone(),
        _ => unreachable!(),
    };
    Some(Reply::with_action(
        format!("Alright — taking you to the {} now.", label),
        action,
    ))
}
