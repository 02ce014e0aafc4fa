//! Lightweight script-range language sniffing.
//!
//! Steers only the persona's language instruction, never control flow.

/// Returns `"hi"` if any character falls in the Devanagari block
/// (U+0900–U+097F), else `"en"`.
pub fn language_hint(text: &str) -> &'static str {
    for ch in text.chars() {
        if ('\u{0900}'..='\u{097F}').contains(&ch) {
            return "hi";
        }
    }
    "en"
}
