use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Transport message kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Question,
    Grading,
    Complete,
    Error,
    Status,
    Pong,
    Answer,
    Ping,
}

impl MessageType {
    /// Whether the server may send this kind. `answer` and `ping` are client-only.
    pub fn is_inbound(self) -> bool {
        !matches!(self, MessageType::Answer | MessageType::Ping)
    }
}

/// Envelope exchanged over the interview socket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "type")]
    kind: MessageType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

/// Why an inbound frame was dropped
#[derive(Debug, Error)]
pub enum InboundError {
    #[error("invalid message: {0}")]
    Json(#[from] serde_json::Error),
    #[error("server sent client-only message type {0:?}")]
    Outbound(MessageType),
}

impl Message {
    pub fn new(kind: MessageType, data: Option<Value>, message: Option<String>) -> Self {
        Self {
            kind,
            data,
            message,
        }
    }

    /// `{"type":"answer","data":{"answer":...}}`
    pub fn answer(text: &str) -> Self {
        Self::new(
            MessageType::Answer,
            Some(serde_json::json!({ "answer": text })),
            None,
        )
    }

    /// `{"type":"ping"}`
    pub fn ping() -> Self {
        Self::new(MessageType::Ping, None, None)
    }

    pub fn kind(&self) -> MessageType {
        self.kind
    }

    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse a frame received from the server.
    pub fn parse_inbound(raw: &str) -> Result<Self, InboundError> {
        let message: Message = serde_json::from_str(raw)?;
        if !message.kind.is_inbound() {
            return Err(InboundError::Outbound(message.kind));
        }
        Ok(message)
    }

    /// Decode `data` into a typed payload.
    pub fn payload<T: DeserializeOwned>(&self) -> Option<T> {
        self.data
            .as_ref()
            .and_then(|data| serde_json::from_value(data.clone()).ok())
    }
}

/// `data` of a `question` message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionPayload {
    pub question: String,
    pub round: u32,
    pub total_rounds: u32,
}

/// `data` of a `grading` message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradingPayload {
    pub score: f64,
    pub band: String,
    pub justification: String,
}

/// `data` of a `complete` message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletePayload {
    pub session_id: String,
    pub average_score: f64,
}

/// `data` of a `status` message, e.g. `{"ai_state":"thinking"}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusPayload {
    pub ai_state: String,
}
