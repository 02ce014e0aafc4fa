//! Prompt assembly for the completion service.
//!
//! Builds the ordered message list: an optional system block of retrieved
//! memories, the persona instruction, then either a sliding window of raw
//! turns (with remote-processing consent) or a compact recap folded into a
//! single user block (without). The dual history mode is a data-minimization
//! control, not a performance one.

use crate::api_types::ChatMessage;
use theramind_core::config::ChatConfig;
use theramind_core::{safe_trim, ChatHistory, Role};

pub fn language_instruction(lang: &str) -> &'static str {
    if lang == "hi" {
        "Respond in natural, conversational Hindi. \
         If the user mixes Hindi and English, respond in natural Hinglish."
    } else {
        "Respond in natural, conversational English. \
         If the user mixes languages, mirror their style naturally."
    }
}

/// The Theramind persona and style contract, parameterized only by the
/// language instruction.
pub fn persona_prompt(lang_instruction: &str) -> String {
    format!(
        "You are **Theramind**, a world-class mental wellness companion designed for global users. \
         You are calm, emotionally intelligent, deeply attentive, and grounded. You speak like a thoughtful human — \
         never robotic, scripted, preachy, or repetitive.\n\n\
         === CORE IDENTITY ===\n\
         - You are NOT a doctor, but you are highly informed about mental health, wellbeing, stress, anxiety, and emotional regulation.\n\
         - You may provide **safe, general medical and mental health guidance**, lifestyle suggestions, and evidence-based practices, \
         but you must NEVER diagnose conditions, prescribe medications, or claim clinical authority.\n\
         - When something may require professional or emergency help, you gently and clearly encourage seeking it.\n\n\
         === LANGUAGE & CULTURE ===\n\
         - {}\n\
         - Match the user's language naturally (English, Hindi, or mixed Hinglish if the user mixes).\n\
         - Use culturally neutral, globally understandable language.\n\n\
         === CONVERSATION INTELLIGENCE (VERY IMPORTANT) ===\n\
         - Maintain **strong continuity** across the conversation.\n\
         - Remember what the user has already shared and build on it.\n\
         - NEVER repeat the same opening lines, advice, or questions unnecessarily.\n\
         - Do NOT ask generic questions like 'Can you tell me more?' repeatedly.\n\
         - If the user has already tried something (e.g., breathing, grounding), acknowledge it and adapt — do NOT restart it blindly.\n\n\
         === RESPONSE STYLE ===\n\
         - Validate emotions clearly and specifically.\n\
         - Be concise but meaningful (typically 2–6 sentences).\n\
         - Prefer thoughtful reflections and gentle insights over long explanations.\n\
         - Ask open-ended questions only when they truly move the conversation forward.\n\
         - Avoid clichés, therapy-speak, or motivational fluff.\n\n\
         === MEDICAL & WELLNESS GUIDANCE ===\n\
         - You MAY suggest grounding techniques, breathing practices, sleep hygiene tips, \
         nutrition & hydration awareness, exercise, sunlight, routines, and when to consider talking to a professional.\n\
         - You MUST phrase medical-related advice as: 'Many people find...', 'In general, it can help to...', 'You might consider...'\n\
         - NEVER say or imply you are a medical professional.\n\n\
         === SAFETY ===\n\
         - If the user expresses self-harm, suicidal thoughts, or medical emergencies, prioritize safety and crisis guidance immediately.\n\
         - Be calm, direct, and supportive — never alarmist or dismissive.\n\n\
         === OVERALL GOAL ===\n\
         Help the user feel understood, emotionally safer, mentally clearer, and supported without dependence.\n\n\
         Respond as a thoughtful human companion who genuinely remembers and cares. \
         If your response would repeat phrasing from your last 2 messages, rephrase it completely.",
        lang_instruction
    )
}

/// System block carrying retrieved memory summaries, framed so the model
/// uses them for continuity only and never echoes them back.
pub fn memory_block(memories: &[String]) -> String {
    let joined = memories
        .iter()
        .map(|m| safe_trim(m, 300))
        .collect::<Vec<_>>()
        .join(" | ");
    format!(
        "Relevant long-term context about this user:\n{}\nUse this only for continuity. Do NOT repeat it verbatim.",
        joined
    )
}

/// Sliding window of the most recent raw turns, per-message capped.
fn history_window(history: &ChatHistory, limit: usize, per_msg_max: usize) -> Vec<ChatMessage> {
    let start = history.len().saturating_sub(limit);
    history[start..]
        .iter()
        .map(|m| {
            let content = safe_trim(&m.content, per_msg_max);
            match m.role {
                Role::User => ChatMessage::user(content),
                Role::Assistant => ChatMessage::assistant(content),
            }
        })
        .collect()
}

/// Compact textual recap of the last few turns, folded into one user block
/// together with the current message.
fn recap_block(history: &ChatHistory, last_user_message: &str, window: usize) -> ChatMessage {
    let start = history.len().saturating_sub(window);
    let recap: Vec<String> = history[start..]
        .iter()
        .map(|m| {
            let speaker = match m.role {
                Role::User => "User",
                Role::Assistant => "Theramind",
            };
            format!("{}: {}", speaker, safe_trim(&m.content, 200))
        })
        .collect();
    ChatMessage::user(format!(
        "Conversation recap:\n{}\n\nUser now says:\n{}",
        recap.join("\n"),
        last_user_message
    ))
}

/// Build the full ordered message list for one generation call.
pub fn assemble(
    history: &ChatHistory,
    last_user_message: &str,
    memories: &[String],
    lang: &str,
    allow_remote_processing: bool,
    chat: &ChatConfig,
) -> Vec<ChatMessage> {
    let mut messages = Vec::new();
    if !memories.is_empty() {
        messages.push(ChatMessage::system(memory_block(memories)));
    }
    messages.push(ChatMessage::system(persona_prompt(language_instruction(
        lang,
    ))));
    if allow_remote_processing {
        messages.extend(history_window(
            history,
            chat.history_window,
            chat.per_message_max,
        ));
    } else {
        messages.push(recap_block(history, last_user_message, chat.recap_window));
    }
    messages
}

/// Constrained summarization request over the tail of a conversation.
pub fn summarization_messages(history: &ChatHistory) -> Vec<ChatMessage> {
    let start = history.len().saturating_sub(30);
    let snippet: Vec<String> = history[start..]
        .iter()
        .map(|m| match m.role {
            Role::User => format!("User: {}", m.content),
            Role::Assistant => format!("Assistant: {}", m.content),
        })
        .collect();
    vec![
        ChatMessage::system(
            "Summarize the user's key facts, patterns, and concerns from this conversation \
             in 2 short factual sentences for memory storage. \
             Focus on stable themes rather than moment-to-moment details.",
        ),
        ChatMessage::user(safe_trim(&snippet.join("\n"), 4000)),
    ]
}
