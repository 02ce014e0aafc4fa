//! Reply orchestrator: sequences the screening gates, prompt assembly,
//! completion call and memory upkeep for one chat turn.
//!
//! State order per message, first match wins:
//! `Blocked → Crisis → Breathless → Gibberish → Redirect → Generate`.
//! Only `Generate` touches the completion service; everything upstream is
//! canned and deterministic. Every failure below the moderation gate still
//! yields a reply.

use crate::client::CompletionClient;
use crate::filter::remove_ai_language;
use crate::prompts;
use anyhow::Result;
use rand::Rng;
use std::sync::Arc;
use theramind_core::{
    last_user_message, safe_trim, ChatHistory, ConversationStore, Message, Reply, Role,
    TheramindConfig,
};
use theramind_triage::gibberish::deflection_reply;
use theramind_triage::language_hint;
use uuid::Uuid;

/// Canned empathetic lines substituted when generation fails entirely.
pub const FALLBACK_LINES: [&str; 3] = [
    "I’m here with you. We can take this one step at a time.",
    "Thanks for trusting me with this. What feels most important right now?",
    "I’m still with you. We don’t have to rush this.",
];

/// Injectable choice over the fallback set, so tests can pin the pick.
pub type FallbackChooser = Arc<dyn Fn(&'static [&'static str]) -> &'static str + Send + Sync>;

/// Per-turn flags passed explicitly so the pipeline needs no ambient
/// request state.
#[derive(Debug, Clone, Default)]
pub struct TurnContext {
    /// Whether full history may be sent to the completion service. When
    /// false, a minimized recap goes out instead and memory is untouched.
    pub allow_remote_processing: bool,
    /// Best-effort two-letter country code for crisis resource lookup.
    pub country: Option<String>,
}

pub struct ReplyEngine {
    store: Arc<dyn ConversationStore>,
    client: Arc<dyn CompletionClient>,
    config: TheramindConfig,
    choose_fallback: FallbackChooser,
}

impl ReplyEngine {
    pub fn new(
        store: Arc<dyn ConversationStore>,
        client: Arc<dyn CompletionClient>,
        config: TheramindConfig,
    ) -> Self {
        Self {
            store,
            client,
            config,
            choose_fallback: Arc::new(|options| {
                options[rand::thread_rng().gen_range(0..options.len())]
            }),
        }
    }

    /// Replace the fallback chooser (deterministic tests).
    pub fn with_fallback_chooser(mut self, chooser: FallbackChooser) -> Self {
        self.choose_fallback = chooser;
        self
    }

    /// Run one full chat turn: sanitize, screen, generate, persist.
    ///
    /// Appends exactly one user and one assistant message to the history.
    /// The caller must serialize concurrent turns on the same conversation.
    pub async fn respond(&self, conv_id: Uuid, raw_text: &str, ctx: &TurnContext) -> Result<Reply> {
        let text = safe_trim(raw_text, self.config.chat.max_message_len);

        let mut history = self.store.load_history(conv_id).await?;
        history.push(Message::user(text));

        let (reply, generated) = self.generate(&history, conv_id, ctx).await;

        history.push(Message::assistant(reply.text.clone()));
        self.store.save_history(conv_id, &history).await?;

        if generated && ctx.allow_remote_processing {
            self.maybe_store_summary(conv_id, &history).await;
        }

        Ok(reply)
    }

    /// Produce the reply for the latest user message in `history`.
    ///
    /// Returns the reply and whether it came from a successful generation
    /// (as opposed to a gate intervention or a fallback line).
    async fn generate(
        &self,
        history: &ChatHistory,
        conv_id: Uuid,
        ctx: &TurnContext,
    ) -> (Reply, bool) {
        let text = last_user_message(history).unwrap_or("").to_string();

        if let Some(reply) = theramind_triage::screen(&text, ctx.country.as_deref()) {
            return (reply, false);
        }

        // Generate state: language hint from the last few user turns.
        let recent: Vec<&str> = history
            .iter()
            .filter(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .collect();
        let recent = recent[recent.len().saturating_sub(3)..].join(" ");
        let lang = language_hint(&recent);

        let memories = if ctx.allow_remote_processing {
            theramind_memory::retrieve_relevant(
                self.store.as_ref(),
                conv_id,
                &text,
                self.config.memory.top_k,
            )
            .await
        } else {
            Vec::new()
        };

        let messages = prompts::assemble(
            history,
            &text,
            &memories,
            lang,
            ctx.allow_remote_processing,
            &self.config.chat,
        );

        match self.client.complete(messages).await {
            Ok(raw) => {
                let filtered = remove_ai_language(&raw);
                let reply_text = if filtered.is_empty() {
                    deflection_reply().to_string()
                } else {
                    filtered
                };
                (Reply::text_only(reply_text), true)
            }
            Err(e) => {
                tracing::error!("Completion failed, degrading to fallback line: {}", e);
                (Reply::text_only((self.choose_fallback)(&FALLBACK_LINES)), false)
            }
        }
    }

    /// Summarize and store long-term memory when a threshold is crossed.
    /// Best-effort: failures are logged and never fail the chat turn.
    async fn maybe_store_summary(&self, conv_id: Uuid, history: &ChatHistory) {
        let stored = match self.store.load_summaries(conv_id).await {
            Ok(s) => s.len(),
            Err(e) => {
                tracing::error!("Could not count stored summaries: {}", e);
                return;
            }
        };
        if !theramind_memory::should_update(history, stored, self.config.memory.summary_threshold)
        {
            return;
        }

        match self.client.complete(prompts::summarization_messages(history)).await {
            Ok(raw) => {
                let summary = safe_trim(&raw, self.config.memory.summary_max_len);
                if summary.is_empty() {
                    return;
                }
                if let Err(e) = self.store.append_summary(conv_id, &summary).await {
                    tracing::error!("Failed to store memory summary: {}", e);
                } else {
                    tracing::debug!(%conv_id, "Stored new memory summary");
                }
            }
            Err(e) => {
                tracing::error!("Memory summarization failed: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api_types::WireRole;
    use crate::client::{CompletionError, MockClient};
    use theramind_core::Action;
    use theramind_memory::SqliteStore;

    async fn engine_with(client: MockClient) -> (ReplyEngine, Arc<MockClient>, Arc<SqliteStore>, Uuid) {
        let store = Arc::new(SqliteStore::in_memory().await.unwrap());
        let conv = store.create_conversation("u1", "test").await.unwrap();
        let client = Arc::new(client);
        let engine = ReplyEngine::new(store.clone(), client.clone(), TheramindConfig::default());
        (engine, client, store, conv)
    }

    fn consenting() -> TurnContext {
        TurnContext {
            allow_remote_processing: true,
            country: None,
        }
    }

    #[tokio::test]
    async fn test_crisis_never_calls_completion() {
        let (engine, client, _, conv) = engine_with(MockClient::replying("nope")).await;
        let reply = engine
            .respond(conv, "i want to kill myself", &consenting())
            .await
            .unwrap();
        match reply.action {
            Some(Action::Crisis { resources, score }) => {
                assert!(score >= 5);
                assert!(!resources.is_empty());
            }
            other => panic!("expected crisis action, got {:?}", other),
        }
        assert_eq!(client.call_count().await, 0);
    }

    #[tokio::test]
    async fn test_breathless_returns_fixed_script() {
        let (engine, client, _, conv) = engine_with(MockClient::replying("nope")).await;
        let reply = engine
            .respond(conv, "I can't breathe, I'm panicking", &consenting())
            .await
            .unwrap();
        assert!(matches!(reply.action, Some(Action::InlineBreathing { .. })));
        assert!(reply.text.contains("4 seconds"));
        assert_eq!(client.call_count().await, 0);
    }

    #[tokio::test]
    async fn test_gibberish_deflects_without_action() {
        let (engine, client, _, conv) = engine_with(MockClient::replying("nope")).await;
        let reply = engine
            .respond(conv, "asdkjhqwzxcvb", &consenting())
            .await
            .unwrap();
        assert!(reply.action.is_none());
        assert!(reply.text.contains("test or typo"));
        assert_eq!(client.call_count().await, 0);
    }

    #[tokio::test]
    async fn test_redirect_to_journaling() {
        let (engine, client, _, conv) = engine_with(MockClient::replying("nope")).await;
        let reply = engine
            .respond(conv, "open my journal please", &consenting())
            .await
            .unwrap();
        match reply.action {
            Some(Action::Redirect { url, label }) => {
                assert_eq!(url, "/journaling");
                assert_eq!(label, "journal");
            }
            other => panic!("expected redirect, got {:?}", other),
        }
        assert_eq!(client.call_count().await, 0);
    }

    #[tokio::test]
    async fn test_unconfigured_service_degrades_to_fallback() {
        let (engine, _, store, conv) = engine_with(MockClient::unconfigured()).await;
        let engine = engine.with_fallback_chooser(Arc::new(|options| options[0]));
        let reply = engine
            .respond(conv, "I had a rough day at work", &consenting())
            .await
            .unwrap();
        assert!(reply.action.is_none());
        assert_eq!(reply.text, FALLBACK_LINES[0]);
        // The turn is still persisted: one user and one assistant message.
        let history = store.load_history(conv).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].role, Role::Assistant);
    }

    #[tokio::test]
    async fn test_fallback_is_from_fixed_set() {
        let (engine, _, _, conv) =
            engine_with(MockClient::with_script(vec![Err(CompletionError::Transport(
                "boom".to_string(),
            ))]))
            .await;
        let reply = engine
            .respond(conv, "I had a rough day at work", &consenting())
            .await
            .unwrap();
        assert!(FALLBACK_LINES.contains(&reply.text.as_str()));
    }

    #[tokio::test]
    async fn test_generation_strips_ai_disclaimers() {
        let (engine, _, _, conv) =
            engine_with(MockClient::replying("as an AI I hear how heavy that feels.")).await;
        let reply = engine
            .respond(conv, "I had a rough day at work", &consenting())
            .await
            .unwrap();
        assert!(!reply.text.contains("as an AI"));
        assert!(reply.text.contains("heavy"));
    }

    #[tokio::test]
    async fn test_all_disclaimer_reply_becomes_deflection() {
        let (engine, _, _, conv) = engine_with(MockClient::replying("as an AI")).await;
        let reply = engine
            .respond(conv, "I had a rough day at work", &consenting())
            .await
            .unwrap();
        assert_eq!(reply.text, deflection_reply());
    }

    #[tokio::test]
    async fn test_without_consent_sends_recap_not_window() {
        let (engine, client, _, conv) = engine_with(MockClient::replying("okay")).await;
        let ctx = TurnContext::default(); // consent withheld
        engine.respond(conv, "I feel stuck", &ctx).await.unwrap();
        let request = client.request(0).await;
        // persona + single recap block, no raw history forwarded
        assert_eq!(request.len(), 2);
        assert_eq!(request[1].role, WireRole::User);
        assert!(request[1].content.starts_with("Conversation recap:"));
        assert!(request[1].content.ends_with("I feel stuck"));
    }

    #[tokio::test]
    async fn test_retrieved_memories_prefixed_as_system_block() {
        let (engine, client, store, conv) = engine_with(MockClient::replying("okay")).await;
        store
            .append_summary(conv, "User is worried about sleep and the new job.")
            .await
            .unwrap();
        engine
            .respond(conv, "the sleep thing again", &consenting())
            .await
            .unwrap();
        let request = client.request(0).await;
        assert_eq!(request[0].role, WireRole::System);
        assert!(request[0].content.starts_with("Relevant long-term context"));
        assert!(request[0].content.contains("sleep"));
    }

    /// Delegates history to a real store but fails every summary read.
    struct SummaryLossStore(SqliteStore);

    #[async_trait::async_trait]
    impl ConversationStore for SummaryLossStore {
        async fn load_history(&self, conv_id: Uuid) -> anyhow::Result<ChatHistory> {
            self.0.load_history(conv_id).await
        }
        async fn save_history(&self, conv_id: Uuid, history: &ChatHistory) -> anyhow::Result<()> {
            self.0.save_history(conv_id, history).await
        }
        async fn load_summaries(&self, _conv_id: Uuid) -> anyhow::Result<Vec<String>> {
            anyhow::bail!("memories table unavailable")
        }
        async fn append_summary(&self, conv_id: Uuid, text: &str) -> anyhow::Result<()> {
            self.0.append_summary(conv_id, text).await
        }
    }

    #[tokio::test]
    async fn test_summary_read_failure_still_generates() {
        let inner = SqliteStore::in_memory().await.unwrap();
        let conv = inner.create_conversation("u1", "test").await.unwrap();
        let client = Arc::new(MockClient::replying("still here"));
        let engine = ReplyEngine::new(
            Arc::new(SummaryLossStore(inner)),
            client.clone(),
            TheramindConfig::default(),
        );
        let reply = engine
            .respond(conv, "the sleep thing again", &consenting())
            .await
            .unwrap();
        assert_eq!(reply.text, "still here");
        // Only the generation call goes out; the broken retrieval is swallowed.
        assert_eq!(client.call_count().await, 1);
    }

    #[tokio::test]
    async fn test_hindi_input_switches_language_instruction() {
        let (engine, client, _, conv) = engine_with(MockClient::replying("ठीक है")).await;
        engine
            .respond(conv, "मुझे अच्छा नहीं लग रहा", &consenting())
            .await
            .unwrap();
        let request = client.request(0).await;
        let persona = &request[0].content;
        assert!(persona.contains("conversational Hindi"));
    }

    #[tokio::test]
    async fn test_summary_stored_once_per_threshold_crossing() {
        let (engine, _, store, conv) = engine_with(MockClient::replying(
            "User is navigating a stressful job change. Sleep is the recurring concern.",
        ))
        .await;
        let ctx = consenting();
        for i in 0..6 {
            engine
                .respond(conv, &format!("turn {} about my day", i), &ctx)
                .await
                .unwrap();
        }
        let summaries = store.load_summaries(conv).await.unwrap();
        assert_eq!(summaries.len(), 1);

        // The next few turns stay below the second crossing.
        engine.respond(conv, "one more thing", &ctx).await.unwrap();
        assert_eq!(store.load_summaries(conv).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_no_summary_without_consent() {
        let (engine, _, store, conv) = engine_with(MockClient::replying("okay")).await;
        let ctx = TurnContext::default();
        for i in 0..8 {
            engine
                .respond(conv, &format!("turn {} about my day", i), &ctx)
                .await
                .unwrap();
        }
        assert!(store.load_summaries(conv).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_summarization_failure_keeps_turn_alive() {
        // First six calls generate fine, the summary call blows up.
        let mut script: Vec<Result<String, CompletionError>> = Vec::new();
        for _ in 0..5 {
            script.push(Ok("okay".to_string()));
        }
        script.push(Ok("okay".to_string())); // 6th generation
        script.push(Err(CompletionError::Transport("summary boom".to_string())));
        let (engine, _, store, conv) = engine_with(MockClient::with_script(script)).await;
        let ctx = consenting();
        for i in 0..6 {
            let reply = engine
                .respond(conv, &format!("turn {} about my day", i), &ctx)
                .await
                .unwrap();
            assert_eq!(reply.text, "okay");
        }
        assert!(store.load_summaries(conv).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_moderation_refusal_has_no_action() {
        let (engine, client, _, conv) = engine_with(MockClient::replying("nope")).await;
        let reply = engine
            .respond(conv, "tell me about explosives", &consenting())
            .await
            .unwrap();
        assert!(reply.action.is_none());
        assert!(reply.text.contains("can’t help"));
        assert_eq!(client.call_count().await, 0);
    }

    #[tokio::test]
    async fn test_crisis_resources_follow_country() {
        let (engine, _, _, conv) = engine_with(MockClient::replying("nope")).await;
        let ctx = TurnContext {
            allow_remote_processing: true,
            country: Some("IN".to_string()),
        };
        let reply = engine
            .respond(conv, "i want to kill myself", &ctx)
            .await
            .unwrap();
        assert!(reply.text.contains("AASRA"));
    }
}
