//! Deterministic post-filter on generated text.
//!
//! The persona never refers to itself as an AI; completions that slip a
//! disclaimer through get it stripped by literal substring removal.

const AI_DISCLAIMERS: &[&str] = &[
    "as an AI",
    "as an assistant",
    "as a chatbot",
    "i'm just a bot",
    "i'm not human",
    "i am a virtual assistant",
    "as a language model",
    "I don't have emotions",
    "I'm not a human",
];

/// Remove self-referential AI disclaimer phrases, then trim whitespace.
/// May return an empty string; the caller substitutes a canned line.
pub fn remove_ai_language(reply: &str) -> String {
    let mut out = reply.to_string();
    for phrase in AI_DISCLAIMERS {
        out = out.replace(phrase, "");
    }
    out.trim().to_string()
}
