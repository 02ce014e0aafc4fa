//! Weighted crisis detection and locale-aware helpline lookup.
//!
//! Best-effort heuristic safety net, not a diagnostic tool. Scores text
//! against a fixed table of self-harm phrasings; at or above the threshold
//! the pipeline returns a fixed-structure crisis reply instead of anything
//! generated.

use regex::Regex;
use std::sync::LazyLock;
use theramind_core::{Action, CrisisResource, Reply};

/// Cumulative score at which crisis mode triggers.
pub const CRISIS_THRESHOLD: i32 = 4;

static CRISIS_PATTERNS: LazyLock<Vec<(Regex, i32)>> = LazyLock::new(|| {
    [
        (r"(?i)\bkill myself\b", 5),
        (r"(?i)\bwant to die\b", 5),
        (r"(?i)\bsuicid(e|al)\b", 5),
        (r"(?i)\bhurt myself\b", 4),
        (r"(?i)\bend my life\b", 5),
        (r"(?i)\bi can't go on\b", 4),
        (r"(?i)\bno reason to live\b", 4),
        (r"(?i)\bi'm going to kill myself\b", 6),
        (r"(?i)\bi might self[- ]harm\b", 4),
        (r"(?i)\bcut myself\b", 4),
    ]
    .iter()
    .map(|(pat, score)| (Regex::new(pat).unwrap(), *score))
    .collect()
});

static RE_DESPAIR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bhopeless\b|\bworthless\b|\bcan't\b|\bcant\b").unwrap());

/// Sum of the weights of all matching crisis patterns, plus a +1 bonus when
/// generic despair wording is present.
pub fn crisis_score(text: &str) -> i32 {
    let t = text.trim();
    let mut score = 0;
    for (pattern, weight) in CRISIS_PATTERNS.iter() {
        if pattern.is_match(t) {
            score += weight;
        }
    }
    if RE_DESPAIR.is_match(t) {
        score += 1;
    }
    score
}

// ============================================================================
// Locale resolution & resources
// ============================================================================

/// Resolve a two-letter country code from request metadata, in priority order:
/// explicit hint, CDN geo hint, then the first `Accept-Language` tag. Pure
/// function of its inputs so it is testable without a request context.
pub fn country_from_hints(
    explicit: Option<&str>,
    cdn_geo: Option<&str>,
    accept_language: Option<&str>,
) -> Option<String> {
    let country = if let Some(c) = explicit.filter(|c| !c.is_empty()) {
        Some(c.to_string())
    } else if let Some(c) = cdn_geo.filter(|c| !c.is_empty()) {
        Some(c.to_string())
    } else if let Some(al) = accept_language.filter(|a| !a.is_empty()) {
        let code = al.split(',').next().unwrap_or("").trim();
        if let Some((_, region)) = code.rsplit_once('-') {
            Some(region.to_uppercase())
        } else {
            match code.to_lowercase().as_str() {
                "en" => Some("US".to_string()),
                "hi" => Some("IN".to_string()),
                _ => None,
            }
        }
    } else {
        None
    };
    country.map(|c| c.to_uppercase())
}

fn resource(label: &str, phone: Option<&str>, url: &str) -> CrisisResource {
    CrisisResource {
        label: label.to_string(),
        phone: phone.map(|p| p.to_string()),
        url: url.to_string(),
    }
}

/// Crisis helplines for the given country, falling back to the GLOBAL list.
/// Absence of a country hint is never an error.
pub fn resources_for(country: Option<&str>) -> Vec<CrisisResource> {
    match country {
        Some("US") => vec![resource(
            "988 Suicide & Crisis Lifeline (US)",
            Some("988"),
            "https://988lifeline.org/",
        )],
        Some("UK") => vec![resource(
            "Samaritans (UK)",
            Some("116 123"),
            "https://www.samaritans.org/",
        )],
        Some("IN") => vec![resource(
            "AASRA (India)",
            Some("+91-9820466726"),
            "http://www.aasra.info/",
        )],
        Some("AU") => vec![resource(
            "Lifeline Australia",
            Some("13 11 14"),
            "https://www.lifeline.org.au/",
        )],
        Some("CA") => vec![resource(
            "Canada Suicide Prevention Service",
            Some("1.833.456.4566"),
            "https://www.crisisservicescanada.ca/",
        )],
        _ => vec![
            resource(
                "International Suicide Hotlines",
                None,
                "https://www.opencounseling.com/suicide-hotlines",
            ),
            resource(
                "Befrienders Worldwide",
                None,
                "https://www.befrienders.org/",
            ),
        ],
    }
}

/// Fixed-structure crisis reply: acknowledgement, escalation instruction,
/// one line per resource, invitation to keep talking.
fn compose_reply(resources: &[CrisisResource]) -> String {
    let mut lines = vec![
        "I’m really glad you told me this. What you’re describing sounds overwhelming, and your safety matters deeply.".to_string(),
        "If you feel like you might hurt yourself or are in immediate danger, please contact your local emergency services right now.".to_string(),
    ];
    for r in resources {
        match &r.phone {
            Some(phone) => lines.push(format!("{}: {} ({})", r.label, phone, r.url)),
            None => lines.push(format!("{}: {}", r.label, r.url)),
        }
    }
    lines.push(
        "If you’re able, we can also stay here together and talk through what you’re feeling."
            .to_string(),
    );
    lines.join("\n")
}

/// Gate adapter for the ordered screen list.
pub fn gate(text: &str, country: Option<&str>) -> Option<Reply> {
    let score = crisis_score(text);
    if score < CRISIS_THRESHOLD {
        return None;
    }
    // Crisis events are logged, never persisted as entities.
    let snippet: String = text.chars().take(200).collect();
    tracing::warn!(score, snippet = %snippet, "CRISIS_DETECTED");
    let resources = resources_for(country);
    Some(Reply::with_action(
        compose_reply(&resources),
        Action::Crisis { resources, score },
    ))
}
