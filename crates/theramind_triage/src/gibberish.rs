//! Statistical gibberish heuristic for degenerate or accidental input.
//!
//! Pure and idempotent: the same input always classifies the same way,
//! independent of history. Runs after the crisis and breathlessness gates so
//! short distress fragments are never deflected as noise.

use theramind_core::Reply;

/// Classify text as gibberish.
///
/// True if any hold: empty after trim; no alphanumeric character at all;
/// length ≤ 2; a long unbroken token that is vowel-starved or contains a run
/// of 5+ identical characters; or symbol-heavy text (6+ symbols exceeding
/// 30% of the length).
pub fn looks_like_gibberish(text: &str) -> bool {
    let t = text.trim();
    if t.is_empty() {
        return true;
    }
    // Unicode-aware: Devanagari (and other scripts) count as letters, so a
    // Hindi message is never dismissed as symbol noise.
    if !t.chars().any(|c| c.is_alphanumeric()) {
        return true;
    }
    let len = t.chars().count();
    if len <= 2 {
        return true;
    }
    if len >= 12 && !t.contains(' ') {
        let letters: Vec<char> = t.chars().filter(|c| c.is_ascii_alphabetic()).collect();
        if !letters.is_empty() {
            let vowels = letters
                .iter()
                .filter(|c| matches!(c.to_ascii_lowercase(), 'a' | 'e' | 'i' | 'o' | 'u'))
                .count();
            if (vowels as f64) / (letters.len() as f64) < 0.15 {
                return true;
            }
        }
        if has_repeat_run(t, 5) {
            return true;
        }
    }
    // ASCII punctuation only: combining marks in non-Latin scripts are not
    // alphanumeric but are not symbol noise either.
    let symbols = t
        .chars()
        .filter(|c| c.is_ascii() && !c.is_ascii_alphanumeric() && !c.is_whitespace())
        .count();
    if symbols >= 6 && symbols as f64 > len as f64 * 0.3 {
        return true;
    }
    false
}

/// True if any character repeats `run_len` or more times consecutively.
fn has_repeat_run(text: &str, run_len: usize) -> bool {
    let mut prev = None;
    let mut run = 0;
    for c in text.chars() {
        if Some(c) == prev {
            run += 1;
        } else {
            prev = Some(c);
            run = 1;
        }
        if run >= run_len {
            return true;
        }
    }
    false
}

pub fn deflection_reply() -> &'static str {
    "That message looks a bit like a test or typo. No problem — I’m right here when you’re ready. \
     You can tell me what’s on your mind, or say 'help' to see some options. 💙"
}

/// Gate adapter for the ordered screen list.
pub fn gate(text: &str, _country: Option<&str>) -> Option<Reply> {
    if looks_like_gibberish(text) {
        Some(Reply::text_only(deflection_reply()))
    } else {
        None
    }
}
