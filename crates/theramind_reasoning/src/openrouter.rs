//! OpenRouter chat-completions client with linear-backoff retries.

use crate::api_types::{ChatMessage, ChatRequest, ChatResponse};
use crate::client::{CompletionClient, CompletionError};
use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;
use theramind_core::config::LlmConfig;

#[derive(Debug, Clone)]
pub struct OpenRouterClient {
    client: reqwest::Client,
    config: LlmConfig,
}

impl OpenRouterClient {
    pub fn new(config: LlmConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    async fn attempt(
        &self,
        api_key: &str,
        messages: &[ChatMessage],
    ) -> Result<Option<String>, CompletionError> {
        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );
        let payload = ChatRequest {
            model: self.config.model.clone(),
            messages: messages.to_vec(),
            temperature: self.config.temperature,
            top_p: self.config.top_p,
            presence_penalty: self.config.presence_penalty,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| CompletionError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(200).collect();
            return Err(CompletionError::Transport(format!("{}: {}", status, snippet)));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::MalformedResponse(e.to_string()))?;

        // Well-formed but empty: the caller treats this as a hard stop.
        Ok(parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content))
    }
}

#[async_trait]
impl CompletionClient for OpenRouterClient {
    async fn complete(&self, messages: Vec<ChatMessage>) -> Result<String, CompletionError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(CompletionError::Unconfigured)?;

        let mut last_error = None;
        for attempt in 0..=self.config.retries {
            match self.attempt(api_key, &messages).await {
                Ok(Some(text)) => return Ok(text),
                Ok(None) => {
                    // Empty choice list on a 2xx response: no point retrying.
                    tracing::warn!("Completion service returned an empty choice list");
                    return Err(CompletionError::Empty);
                }
                Err(e) => {
                    tracing::warn!("Completion attempt {} failed: {}", attempt + 1, e);
                    last_error = Some(e);
                }
            }
            if attempt < self.config.retries {
                tokio::time::sleep(Duration::from_secs_f64(0.5 * (attempt + 1) as f64)).await;
            }
        }
        Err(last_error.unwrap_or(CompletionError::Empty))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_key(key: Option<&str>) -> LlmConfig {
        LlmConfig {
            api_key: key.map(|k| k.to_string()),
            ..LlmConfig::default()
        }
    }

    #[tokio::test]
    async fn test_missing_key_fails_without_network() {
        let client = OpenRouterClient::new(config_with_key(None)).unwrap();
        let err = client.complete(vec![ChatMessage::user("hi")]).await.unwrap_err();
        assert!(matches!(err, CompletionError::Unconfigured));
    }

    #[tokio::test]
    async fn test_empty_key_counts_as_unconfigured() {
        let client = OpenRouterClient::new(config_with_key(Some(""))).unwrap();
        let err = client.complete(vec![ChatMessage::user("hi")]).await.unwrap_err();
        assert!(matches!(err, CompletionError::Unconfigured));
    }

    #[tokio::test]
    async fn test_unreachable_host_reports_transport_error() {
        let config = LlmConfig {
            api_key: Some("test-key".to_string()),
            base_url: "http://127.0.0.1:1/api/v1".to_string(),
            timeout_secs: 1,
            retries: 0,
            ..LlmConfig::default()
        };
        let client = OpenRouterClient::new(config).unwrap();
        let err = client.complete(vec![ChatMessage::user("hi")]).await.unwrap_err();
        assert!(matches!(err, CompletionError::Transport(_)));
    }
}
