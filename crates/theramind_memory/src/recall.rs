//! Summary retrieval and the summarization trigger.

use crate::similarity::{build_tf_vector, cosine_sim};
use theramind_core::{user_turn_count, ChatHistory, ConversationStore};
use uuid::Uuid;

/// Top-k stored summaries most similar to the query.
///
/// Scores every summary by TF-vector cosine similarity, sorts descending and
/// keeps only strictly positive scores. Retrieval failures degrade to an
/// empty result so they can never fail the parent chat turn.
pub async fn retrieve_relevant(
    store: &dyn ConversationStore,
    conv_id: Uuid,
    query: &str,
    top_k: usize,
) -> Vec<String> {
    let summaries = match store.load_summaries(conv_id).await {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Memory retrieval failed: {}", e);
            return Vec::new();
        }
    };
    if summaries.is_empty() {
        return Vec::new();
    }

    let q_vec = build_tf_vector(query);
    let mut scored: Vec<(f64, String)> = summaries
        .into_iter()
        .map(|s| {
            let score = cosine_sim(&q_vec, &build_tf_vector(&s));
            (score, s)
        })
        .collect();
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    scored
        .into_iter()
        .take(top_k)
        .filter(|(score, _)| *score > 0.0)
        .map(|(_, s)| s)
        .collect()
}

/// Decide whether a new memory summary should be stored.
///
/// Fires exactly once per threshold crossing: with a threshold of 6, the
/// first summary is due at 6 user turns, the next at 12, and so on. The
/// stored-summary count is the high-water mark, so turns between crossings
/// never re-trigger summarization.
pub fn should_update(history: &ChatHistory, stored_summaries: usize, threshold: usize) -> bool {
    if threshold == 0 {
        return false;
    }
    user_turn_count(history) >= threshold * (stored_summaries + 1)
}
