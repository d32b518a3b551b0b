use async_trait::async_trait;
use log::debug;
use reqwest::{Client as HttpClient, StatusCode, header::{HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION}};
use serde::{Deserialize, Serialize};

use super::{CompletionClient, CompletionError};
use crate::llm::LlmConfig;
use crate::models::chat::ChatMessage;

pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";
pub const DEFAULT_BASE_URL: &str = "https://api.groq.com";

pub struct GroqChatClient {
    http: HttpClient,
    model: String,
    base_url: String,
}

#[derive(Serialize)]
struct GroqRequest<'a> {
    messages: &'a [ChatMessage],
    model: &'a str,
}

#[derive(Deserialize)]
struct GroqResponse {
    #[serde(default)]
    choices: Vec<GroqChoice>,
}

#[derive(Deserialize)]
struct GroqChoice {
    #[serde(default)]
    message: Option<GroqResponseMessage>,
}

#[derive(Deserialize)]
struct GroqResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct GroqErrorEnvelope {
    #[serde(default)]
    error: Option<GroqErrorDetail>,
}

#[derive(Deserialize)]
struct GroqErrorDetail {
    #[serde(default)]
    message: Option<String>,
}

impl GroqChatClient {
    pub fn new(
        api_key: String,
        model: Option<String>,
        base_url: Option<String>,
    ) -> Result<Self, CompletionError> {
        let chat_model = model.unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let api_url = base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key))
                .map_err(|e| CompletionError::InvalidKey(e.to_string()))?
        );

        let http = HttpClient::builder().default_headers(headers).build()?;

        Ok(Self {
            http,
            model: chat_model,
            base_url: api_url,
        })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, CompletionError> {
        let api_key = config.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or(CompletionError::MissingKey)?;

        Self::new(
            api_key,
            config.completion_model.clone(),
            config.base_url.clone(),
        )
    }

    fn completions_url(&self) -> String {
        format!("{}/openai/v1/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl CompletionClient for GroqChatClient {
    async fn complete(
        &self,
        messages: &[ChatMessage]
    ) -> Result<Option<String>, CompletionError> {
        let url = self.completions_url();
        let req = GroqRequest { messages, model: &self.model };

        debug!("Requesting completion from {} with model {}", url, self.model);

        let resp = self.http.post(&url).json(&req).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(CompletionError::Api(extract_api_error(status, &body)));
        }

        let payload = resp.json::<GroqResponse>().await?;
        Ok(extract_content(payload))
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Pulls the first choice's message content out of a completion payload.
/// Every field is optional on the wire; an empty string counts as no
/// content.
fn extract_content(resp: GroqResponse) -> Option<String> {
    resp.choices
        .into_iter()
        .next()?
        .message?
        .content
        .filter(|content| !content.is_empty())
}

fn extract_api_error(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<GroqErrorEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.error)
        .and_then(|detail| detail.message)
        .unwrap_or_else(|| format!("Groq API returned status {}", status))
}
