use async_trait::async_trait;
use reqwest::{Client as HttpClient, StatusCode, header::{HeaderMap, HeaderValue, CONTENT_TYPE}};
use thiserror::Error;

use crate::models::chat::{ChatRequest, ChatResponse, ErrorResponse};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("{0}")]
    Http(#[from] reqwest::Error),
    #[error("Relay returned status {status}: {message}")]
    Status {
        status: StatusCode,
        message: String,
    },
}

/// Seam between the conversation state owner and the relay endpoint, so
/// tests can drive the session without a server.
#[async_trait]
pub trait RelayTransport: Send + Sync {
    async fn send(&self, request: &ChatRequest) -> Result<ChatResponse, TransportError>;
}

pub struct HttpRelayTransport {
    http: HttpClient,
    endpoint: String,
}

impl HttpRelayTransport {
    pub fn new(base_url: &str) -> Result<Self, TransportError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let http = HttpClient::builder().default_headers(headers).build()?;

        Ok(Self {
            http,
            endpoint: format!("{}/api/chat", base_url.trim_end_matches('/')),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl RelayTransport for HttpRelayTransport {
    async fn send(&self, request: &ChatRequest) -> Result<ChatResponse, TransportError> {
        let resp = self.http.post(&self.endpoint).json(request).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp
                .json::<ErrorResponse>().await
                .map(|body| body.error)
                .unwrap_or_else(|_| status.to_string());
            return Err(TransportError::Status { status, message });
        }

        Ok(resp.json::<ChatResponse>().await?)
    }
}
