//! Completion client seam and a deterministic mock for tests.

use crate::api_types::ChatMessage;
use async_trait::async_trait;
use std::collections::VecDeque;
use tokio::sync::Mutex;

/// Failure taxonomy for the completion seam.
///
/// Every variant is caught by the reply engine and degraded to a canned
/// line; none of them may surface to the user as a raw error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CompletionError {
    /// No API key at all: every generation attempt fails deterministically.
    #[error("completion service not configured (missing API key)")]
    Unconfigured,
    /// Network failure, timeout or non-2xx status. Retried per policy.
    #[error("completion transport failure: {0}")]
    Transport(String),
    /// Body did not decode into the expected response shape.
    #[error("malformed completion response: {0}")]
    MalformedResponse(String),
    /// Well-formed response with no content. Hard stop, never retried.
    #[error("completion returned no content")]
    Empty,
}

#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Send one chat completion request and return the raw assistant text.
    async fn complete(&self, messages: Vec<ChatMessage>) -> Result<String, CompletionError>;
}

// ============================================================================
// Mock client
// ============================================================================

/// Scripted completion client for tests: pops queued results in order and
/// records every request it receives. An exhausted script repeats the last
/// queued result.
pub struct MockClient {
    script: Mutex<VecDeque<Result<String, CompletionError>>>,
    last: Mutex<Option<Result<String, CompletionError>>>,
    calls: Mutex<Vec<Vec<ChatMessage>>>,
}

impl MockClient {
    pub fn with_script(script: Vec<Result<String, CompletionError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            last: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Always reply with the same text.
    pub fn replying(text: &str) -> Self {
        Self::with_script(vec![Ok(text.to_string())])
    }

    /// Always fail as if the service were unconfigured.
    pub fn unconfigured() -> Self {
        Self::with_script(vec![Err(CompletionError::Unconfigured)])
    }

    pub async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }

    /// Messages of the n-th recorded request.
    pub async fn request(&self, n: usize) -> Vec<ChatMessage> {
        self.calls.lock().await[n].clone()
    }
}

#[async_trait]
impl CompletionClient for MockClient {
    async fn complete(&self, messages: Vec<ChatMessage>) -> Result<String, CompletionError> {
        self.calls.lock().await.push(messages);
        let mut script = self.script.lock().await;
        let mut last = self.last.lock().await;
        match script.pop_front() {
            Some(result) => {
                *last = Some(result.clone());
                result
            }
            None => last
                .clone()
                .unwrap_or(Err(CompletionError::Empty)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_pops_script_then_repeats_last() {
        let mock = MockClient::with_script(vec![
            Ok("first".to_string()),
            Ok("second".to_string()),
        ]);
        assert_eq!(mock.complete(vec![]).await.unwrap(), "first");
        assert_eq!(mock.complete(vec![]).await.unwrap(), "second");
        assert_eq!(mock.complete(vec![]).await.unwrap(), "second");
        assert_eq!(mock.call_count().await, 3);
    }

    #[tokio::test]
    async fn test_mock_records_requests() {
        let mock = MockClient::replying("ok");
        mock.complete(vec![ChatMessage::user("hello")]).await.unwrap();
        let req = mock.request(0).await;
        assert_eq!(req.len(), 1);
        assert_eq!(req[0].content, "hello");
    }
}
