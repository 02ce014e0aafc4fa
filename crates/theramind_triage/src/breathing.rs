//! Breathlessness / panic-attack detection with an inline grounding script.
//!
//! A canned high-priority intervention: in acute distress, speed and
//! predictability matter more than personalization, so no completion call
//! is ever made here.

use regex::Regex;
use std::sync::LazyLock;
use theramind_core::{Action, Reply};

static BREATHLESS_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\bcan't breathe\b",
        r"(?i)\bcant breathe\b",
        r"(?i)\bnot breathing\b",
        r"(?i)\bim breathless\b",
        r"(?i)\bi'm breathless\b",
        r"(?i)\bbreathless\b",
        r"(?i)\bshort of breath\b",
        r"(?i)\bshortness of breath\b",
        r"(?i)\bhyperventilat",
        r"(?i)\bpanic attack\b",
        r"(?i)\bpanic\b",
        r"(?i)\bim panicking\b",
        r"(?i)\bi'm panicking\b",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

pub fn matches_breathless(text: &str) -> bool {
    let t = text.trim();
    BREATHLESS_PATTERNS.iter().any(|p| p.is_match(t))
}

/// Fixed grounding script: 4-2-6 second breathing cycle, 3 rounds, then an
/// invitation to a guided session or alternate grounding.
pub fn grounding_reply() -> String {
    [
        "That sounds really frightening, and I’m glad you told me. Let’s slow things down gently together for a moment.",
        "If you can, sit comfortably and place one hand on your belly and one on your chest.",
        "Breathe in softly through your nose for 4 seconds and feel your belly rise, hold for 2 seconds, then breathe out slowly through your mouth for 6 seconds.",
        "Try this for 3 rounds and just notice any tiny shift, even if it’s small.",
        "If you’d like, I can guide you through a short timed breathing exercise here, or we can try other grounding techniques. Reply 'guide' for breathing, or 'ground' if you want different grounding ideas.",
    ]
    .join(" ")
}

/// Gate adapter for the ordered screen list. Only reached when the crisis
/// gate did not fire.
pub fn gate(text: &str, _country: Option<&str>) -> Option<Reply> {
    if !matches_breathless(text) {
        return None;
    }
    let snippet: String = text.chars().take(200).collect();
    tracing::info!(snippet = %snippet, "BREATHLESS_DETECTED");
    Some(Reply::with_action(
        grounding_reply(),
        Action::InlineBreathing {
            severity_hint: "panic/breathless".to_string(),
        },
    ))
}
