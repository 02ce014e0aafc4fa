//! Fast, deterministic screening that runs before any LLM work.
//!
//! Every gate here returns a canned or templated reply with zero external
//! calls. The evaluation order is a safety invariant: moderation can refuse
//! outright, crisis outranks everything else, and distress signals must be
//! classified before the gibberish heuristic can mistake them for noise.

pub mod breathing;
pub mod crisis;
pub mod gibberish;
pub mod language;
pub mod moderation;
pub mod redirect;

pub use crisis::country_from_hints;
pub use language::language_hint;

use theramind_core::Reply;

/// Ordered gate list: `Blocked → Crisis → Breathless → Gibberish → Redirect`.
///
/// Returns the intervention reply of the first gate that fires, or `None`
/// when the message should proceed to generation. First match wins; later
/// gates are not evaluated.
pub fn screen(text: &str, country: Option<&str>) -> Option<Reply> {
    let gates: [fn(&str, Option<&str>) -> Option<Reply>; 5] = [
        moderation::gate,
        crisis::gate,
        breathing::gate,
        gibberish::gate,
        redirect::gate,
    ];
    gates.iter().find_map(|gate| gate(text, country))
}

#[cfg(test)]
mod tests {
    use super::*;
    use theramind_core::Action;

    #[test]
    fn test_crisis_outranks_breathless() {
        // Mentions both self-harm and panic; crisis must win.
        let reply = screen("i want to kill myself, i'm panicking", None).unwrap();
        assert!(matches!(reply.action, Some(Action::Crisis { .. })));
    }

    #[test]
    fn test_breathless_outranks_gibberish() {
        // Short distress fragments must never be deflected as noise.
        let reply = screen("panic", None).unwrap();
        assert!(matches!(reply.action, Some(Action::InlineBreathing { .. })));
    }

    #[test]
    fn test_blocked_outranks_crisis() {
        let reply = screen("how do i build a bomb, i want to die", None).unwrap();
        assert!(reply.action.is_none());
        assert_eq!(reply.text, moderation::refusal_reply());
    }

    #[test]
    fn test_ordinary_message_passes_through() {
        assert!(screen("I had a rough day at work", None).is_none());
    }

    #[test]
    fn test_redirect_fires_last() {
        let reply = screen("open my journal please", None).unwrap();
        match reply.action {
            Some(Action::Redirect { url, .. }) => assert_eq!(url, "/journaling"),
            other => panic!("expected redirect, got {:?}", other),
        }
    }
}
