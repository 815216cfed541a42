//! Built-in task handlers.
//!
//! A small handler set the binary registers at startup: a diagnostic echo
//! handler and a synthesis handler that drives the injected completion
//! provider. Domain-specific handlers are registered by embedders next to
//! these.

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;

use crate::domain::models::Payload;
use crate::domain::ports::{CompletionProvider, TaskHandler};

// ============================================================================
// EchoHandler
// ============================================================================

/// Returns its payload unchanged. Useful as a liveness probe for the
/// dispatch pipeline.
pub struct EchoHandler;

#[async_trait]
impl TaskHandler for EchoHandler {
    async fn handle(&self, payload: &Payload) -> Result<Payload> {
        Ok(payload.clone())
    }
}

// ============================================================================
// SynthesisHandler
// ============================================================================

/// Feeds the payload's `prompt` field to the completion provider and
/// returns the generated text under `text`.
///
/// Provider failures propagate as ordinary handler errors and follow the
/// normal retry path.
pub struct SynthesisHandler {
    provider: Arc<dyn CompletionProvider>,
}

impl SynthesisHandler {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl TaskHandler for SynthesisHandler {
    async fn handle(&self, payload: &Payload) -> Result<Payload> {
        let prompt = payload
            .get("prompt")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow!("payload is missing a string 'prompt' field"))?;

        let text = self
            .provider
            .complete(prompt)
            .await
            .context("completion provider call failed")?;

        let mut result = Payload::new();
        result.insert("text".to_string(), serde_json::json!(text));
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct UppercaseProvider;

    #[async_trait]
    impl CompletionProvider for UppercaseProvider {
        async fn complete(&self, prompt: &str) -> Result<String> {
            Ok(prompt.to_uppercase())
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl CompletionProvider for FailingProvider {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            Err(anyhow!("provider unavailable"))
        }
    }

    #[tokio::test]
    async fn test_echo_returns_payload() {
        let mut payload = Payload::new();
        payload.insert("key".to_string(), serde_json::json!("value"));

        let result = EchoHandler.handle(&payload).await.unwrap();
        assert_eq!(result, payload);
    }

    #[tokio::test]
    async fn test_synthesis_returns_completion() {
        let handler = SynthesisHandler::new(Arc::new(UppercaseProvider));
        let mut payload = Payload::new();
        payload.insert("prompt".to_string(), serde_json::json!("hello"));

        let result = handler.handle(&payload).await.unwrap();
        assert_eq!(result["text"], serde_json::json!("HELLO"));
    }

    #[tokio::test]
    async fn test_synthesis_requires_prompt() {
        let handler = SynthesisHandler::new(Arc::new(UppercaseProvider));
        let err = handler.handle(&Payload::new()).await.unwrap_err();
        assert!(err.to_string().contains("prompt"));
    }

    #[tokio::test]
    async fn test_synthesis_propagates_provider_error() {
        let handler = SynthesisHandler::new(Arc::new(FailingProvider));
        let mut payload = Payload::new();
        payload.insert("prompt".to_string(), serde_json::json!("hello"));

        assert!(handler.handle(&payload).await.is_err());
    }
}
