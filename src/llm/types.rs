use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::action::parser::parse_action;
use crate::action::types::Action;
use crate::errors::PhoneAgentResult;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: MessageContent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamChunk {
    pub kind: StreamChunkKind,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamChunkKind {
    Content,
    Done,
    Error,
}

/// Result of one model call. Built once after the stream ends.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelResponse {
    pub thinking: String,
    pub action: String,
    pub raw_content: String,
    pub time_to_first_token: Option<Duration>,
    pub time_to_thinking_end: Option<Duration>,
    pub total_time: Duration,
}

impl ModelResponse {
    /// Parses `action` into a typed `Action`.
    pub fn parse_action(&self) -> PhoneAgentResult<Action> {
        parse_action(&self.action)
    }
}
