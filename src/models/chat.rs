use serde::{ Serialize, Deserialize };

/// Conversation roles understood by the relay and the completion service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

/// Inbound body of `POST /api/chat`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

impl ChatRequest {
    /// Decodes a request body. A body that is valid JSON but carries no
    /// `messages` array is treated as an empty conversation; anything that
    /// is not valid JSON is an error for the caller to surface.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        let value: serde_json::Value = serde_json::from_slice(bytes)?;
        let messages = match value.get("messages") {
            Some(serde_json::Value::Array(items)) => {
                serde_json::from_value(serde_json::Value::Array(items.clone()))?
            }
            _ => Vec::new(),
        };
        Ok(Self { messages })
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub text: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_serialize_lowercase() {
        let msg = ChatMessage { role: Role::Assistant, content: "hi".to_string() };
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"hi"}"#);
    }

    #[test]
    fn missing_messages_key_is_empty() {
        let req = ChatRequest::from_bytes(b"{}").unwrap();
        assert!(req.messages.is_empty());
    }

    #[test]
    fn non_array_messages_is_empty() {
        let req = ChatRequest::from_bytes(br#"{"messages": "nope"}"#).unwrap();
        assert!(req.messages.is_empty());
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(ChatRequest::from_bytes(b"not json").is_err());
    }

    #[test]
    fn well_formed_body_round_trips() {
        let req = ChatRequest::from_bytes(
            br#"{"messages":[{"role":"user","content":"2+2?"}]}"#
        ).unwrap();
        assert_eq!(req.messages.len(), 1);
        assert_eq!(req.messages[0].role, Role::User);
        assert_eq!(req.messages[0].content, "2+2?");
    }
}
