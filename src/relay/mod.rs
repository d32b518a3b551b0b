use std::sync::Arc;

use log::{debug, warn};
use thiserror::Error;

use crate::cli::Args;
use crate::llm::chat::{new_client, CompletionClient, CompletionError};
use crate::llm::LlmConfig;
use crate::models::chat::{ChatMessage, ChatRequest, ChatResponse, Role};

/// Injected when a conversation arrives without a system turn.
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful assistant. You must always respond using Markdown formatting. \
     Use bolding for emphasis, bullet points for lists, and code blocks for any code \
     snippets to ensure high readability.";

/// Substituted when the completion service answers without usable text.
pub const FALLBACK_TEXT: &str = "No response content";

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("API Key is missing in environment variables")]
    MissingApiKey,
    #[error("{0}")]
    InvalidBody(#[from] serde_json::Error),
    #[error("{0}")]
    Upstream(#[from] CompletionError),
}

/// Translates one inbound conversation into one assistant reply. Holds no
/// state across calls; the client handle is absent when no credential was
/// configured, which turns every request into a configuration error without
/// touching the network.
pub struct Relay {
    client: Option<Arc<dyn CompletionClient>>,
    system_prompt: String,
}

impl Relay {
    pub fn new(
        client: Option<Arc<dyn CompletionClient>>,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self { client, system_prompt: system_prompt.into() }
    }

    pub fn from_args(args: &Args) -> Result<Self, CompletionError> {
        let api_key = args.groq_api_key.clone().filter(|k| !k.trim().is_empty());
        let client = match api_key {
            Some(key) => {
                let config = LlmConfig {
                    api_key: Some(key),
                    completion_model: args.chat_model.clone(),
                    base_url: args.chat_base_url.clone(),
                };
                Some(new_client(&config)?)
            }
            None => {
                warn!("No Groq API key configured. Chat requests will be rejected.");
                None
            }
        };

        let system_prompt = args.system_prompt
            .clone()
            .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string());

        Ok(Self { client, system_prompt })
    }

    /// Handles one raw request body end to end: credential check, lenient
    /// parse, system-prompt normalization, one completion call, response
    /// shaping. Exactly one outbound call per invocation, no retries.
    pub async fn handle(&self, body: &[u8]) -> Result<ChatResponse, RelayError> {
        let client = self.client.as_ref().ok_or(RelayError::MissingApiKey)?;

        let request = ChatRequest::from_bytes(body)?;
        let messages = self.ensure_system_prompt(request.messages);

        debug!("Forwarding {} message(s) to model {}", messages.len(), client.model());

        let text = client
            .complete(&messages).await?
            .unwrap_or_else(|| FALLBACK_TEXT.to_string());

        Ok(ChatResponse { text })
    }

    /// Prepends the configured system prompt when the sequence carries no
    /// system turn. A sequence that already has one, anywhere, is returned
    /// untouched.
    pub fn ensure_system_prompt(&self, messages: Vec<ChatMessage>) -> Vec<ChatMessage> {
        if messages.iter().any(|m| m.role == Role::System) {
            return messages;
        }

        let mut normalized = Vec::with_capacity(messages.len() + 1);
        normalized.push(ChatMessage {
            role: Role::System,
            content: self.system_prompt.clone(),
        });
        normalized.extend(messages);
        normalized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct StubCompletion {
        reply: Result<Option<String>, String>,
        seen: Mutex<Vec<Vec<ChatMessage>>>,
    }

    impl StubCompletion {
        fn returning(text: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(Some(text.to_string())),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn empty() -> Arc<Self> {
            Arc::new(Self { reply: Ok(None), seen: Mutex::new(Vec::new()) })
        }

        fn failing(message: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(message.to_string()),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn forwarded(&self) -> Vec<Vec<ChatMessage>> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CompletionClient for StubCompletion {
        async fn complete(
            &self,
            messages: &[ChatMessage]
        ) -> Result<Option<String>, CompletionError> {
            self.seen.lock().unwrap().push(messages.to_vec());
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(message) => Err(CompletionError::Api(message.clone())),
            }
        }

        fn model(&self) -> &str {
            "stub-model"
        }
    }

    fn relay_with(stub: &Arc<StubCompletion>) -> Relay {
        Relay::new(Some(stub.clone() as Arc<dyn CompletionClient>), DEFAULT_SYSTEM_PROMPT)
    }

    fn user(content: &str) -> ChatMessage {
        ChatMessage { role: Role::User, content: content.to_string() }
    }

    #[tokio::test]
    async fn injects_system_prompt_at_front() {
        let stub = StubCompletion::returning("4");
        let relay = relay_with(&stub);

        let resp = relay.handle(
            br#"{"messages":[{"role":"user","content":"2+2?"},{"role":"assistant","content":"4"},{"role":"user","content":"again?"}]}"#
        ).await.unwrap();
        assert_eq!(resp.text, "4");

        let forwarded = stub.forwarded();
        assert_eq!(forwarded.len(), 1);
        let sequence = &forwarded[0];
        assert_eq!(sequence.len(), 4);
        assert_eq!(sequence[0].role, Role::System);
        assert_eq!(sequence[0].content, DEFAULT_SYSTEM_PROMPT);
        assert_eq!(sequence[1].content, "2+2?");
        assert_eq!(sequence[2].content, "4");
        assert_eq!(sequence[3].content, "again?");
    }

    #[tokio::test]
    async fn never_double_injects() {
        let stub = StubCompletion::returning("ok");
        let relay = relay_with(&stub);

        relay.handle(
            br#"{"messages":[{"role":"user","content":"hi"},{"role":"system","content":"be terse"}]}"#
        ).await.unwrap();

        let sequence = stub.forwarded().remove(0);
        assert_eq!(sequence, vec![
            user("hi"),
            ChatMessage { role: Role::System, content: "be terse".to_string() },
        ]);
    }

    #[tokio::test]
    async fn missing_credential_fails_before_any_call() {
        let relay = Relay::new(None, DEFAULT_SYSTEM_PROMPT);
        let err = relay.handle(br#"{"messages":[]}"#).await.unwrap_err();
        assert!(matches!(err, RelayError::MissingApiKey));
        assert_eq!(err.to_string(), "API Key is missing in environment variables");
    }

    #[tokio::test]
    async fn degenerate_success_yields_fallback_text() {
        let stub = StubCompletion::empty();
        let relay = relay_with(&stub);

        let resp = relay.handle(br#"{"messages":[{"role":"user","content":"?"}]}"#)
            .await
            .unwrap();
        assert_eq!(resp.text, FALLBACK_TEXT);
    }

    #[tokio::test]
    async fn non_array_messages_forwards_prompt_only() {
        let stub = StubCompletion::returning("hello");
        let relay = relay_with(&stub);

        relay.handle(br#"{"messages": 5}"#).await.unwrap();

        let sequence = stub.forwarded().remove(0);
        assert_eq!(sequence.len(), 1);
        assert_eq!(sequence[0].role, Role::System);
    }

    #[tokio::test]
    async fn invalid_body_is_rejected_without_a_call() {
        let stub = StubCompletion::returning("unused");
        let relay = relay_with(&stub);

        let err = relay.handle(b"not json").await.unwrap_err();
        assert!(matches!(err, RelayError::InvalidBody(_)));
        assert!(stub.forwarded().is_empty());
    }

    #[tokio::test]
    async fn upstream_failure_surfaces_its_message() {
        let stub = StubCompletion::failing("rate limit exceeded");
        let relay = relay_with(&stub);

        let err = relay.handle(br#"{"messages":[]}"#).await.unwrap_err();
        assert_eq!(err.to_string(), "rate limit exceeded");
    }
}
