//! Input sanitization shared by the pipeline and the prompt assembler.

/// Trim surrounding whitespace and truncate to `max_len` characters.
///
/// Total function: never fails, never panics. Truncation is a plain cut with
/// no ellipsis, counted in characters so multi-byte input stays valid UTF-8.
pub fn safe_trim(text: &str, max_len: usize) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() > max_len {
        trimmed.chars().take(max_len).collect()
    } else {
        trimmed.to_string()
    }
}
