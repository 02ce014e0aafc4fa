pub mod config;
pub mod text;

pub use config::TheramindConfig;
pub use text::safe_trim;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One entry in a conversation history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub timestamp: i64, // Unix timestamp
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            timestamp: chrono::Utc::now().timestamp(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

/// Append-only sequence of messages for one conversation.
///
/// One successful chat turn appends exactly one user message followed by
/// exactly one assistant message.
pub type ChatHistory = Vec<Message>;

/// Content of the most recent user message, if any.
pub fn last_user_message(history: &ChatHistory) -> Option<&str> {
    history
        .iter()
        .rev()
        .find(|m| m.role == Role::User)
        .map(|m| m.content.as_str())
}

/// Number of user-authored messages in the history.
pub fn user_turn_count(history: &ChatHistory) -> usize {
    history.iter().filter(|m| m.role == Role::User).count()
}

/// A localized crisis helpline entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrisisResource {
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub url: String,
}

/// Structured side-channel instruction accompanying a reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    Crisis {
        resources: Vec<CrisisResource>,
        score: i32,
    },
    InlineBreathing {
        severity_hint: String,
    },
    Redirect {
        url: String,
        label: String,
    },
}

/// Outbound result of one chat turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reply {
    pub text: String,
    pub action: Option<Action>,
}

impl Reply {
    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            action: None,
        }
    }

    pub fn with_action(text: impl Into<String>, action: Action) -> Self {
        Self {
            text: text.into(),
            action: Some(action),
        }
    }
}

/// Persistence seam for conversation history and memory summaries.
///
/// The reply pipeline never opens storage connections itself; it depends only
/// on these operations. Callers must serialize writes per conversation id —
/// two concurrent turns on the same conversation would otherwise race on the
/// read-modify-write of the history.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn load_history(&self, conv_id: Uuid) -> anyhow::Result<ChatHistory>;
    async fn save_history(&self, conv_id: Uuid, history: &ChatHistory) -> anyhow::Result<()>;
    async fn load_summaries(&self, conv_id: Uuid) -> anyhow::Result<Vec<String>>;
    async fn append_summary(&self, conv_id: Uuid, text: &str) -> anyhow::Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_user_message_picks_most_recent() {
        let history = vec![
            Message::user("first"),
            Message::assistant("reply"),
            Message::user("second"),
        ];
        assert_eq!(last_user_message(&history), Some("second"));
    }

    #[test]
    fn test_last_user_message_empty_history() {
        assert_eq!(last_user_message(&vec![]), None);
    }

    #[test]
    fn test_user_turn_count_ignores_assistant() {
        let history = vec![
            Message::user("a"),
            Message::assistant("b"),
            Message::user("c"),
        ];
        assert_eq!(user_turn_count(&history), 2);
    }

    #[test]
    fn test_action_serializes_with_type_tag() {
        let action = Action::Redirect {
            url: "/journaling".to_string(),
            label: "journal".to_string(),
        };
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["type"], "redirect");
        assert_eq!(json["url"], "/journaling");
    }

    #[test]
    fn test_crisis_resource_omits_missing_phone() {
        let r = CrisisResource {
            label: "Befrienders Worldwide".to_string(),
            phone: None,
            url: "https://www.befrienders.org/".to_string(),
        };
        let json = serde_json::to_string(&r).unwrap();
        assert!(!json.contains("phone"));
    }
}
