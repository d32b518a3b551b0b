pub mod groq;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use super::LlmConfig;
use crate::models::chat::ChatMessage;
use self::groq::GroqChatClient;

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("Groq API key is required")]
    MissingKey,
    #[error("Invalid API key format: {0}")]
    InvalidKey(String),
    #[error("{0}")]
    Http(#[from] reqwest::Error),
    #[error("{0}")]
    Api(String),
}

/// One configured handle to the remote completion service. The relay talks
/// to this trait so a stub can stand in for the hosted API under test.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Requests a single non-streaming completion for the given message
    /// sequence, forwarded in order. `Ok(None)` means the service answered
    /// but the reply carried no usable text.
    async fn complete(
        &self,
        messages: &[ChatMessage]
    ) -> Result<Option<String>, CompletionError>;

    fn model(&self) -> &str;
}

pub fn new_client(
    config: &LlmConfig
) -> Result<Arc<dyn CompletionClient>, CompletionError> {
    let client = GroqChatClient::from_config(config)?;
    Ok(Arc::new(client))
}
