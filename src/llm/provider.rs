use std::io::Write;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::errors::PhoneAgentResult;
use crate::llm::types::{ChatMessage, ModelResponse};

/// A model the agent loop can ask for its next step.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Identifier used in logs.
    fn name(&self) -> &str;

    /// Sends the conversation and streams the reply. Thinking text is written
    /// to `sink` as it arrives; the returned response is split from the full
    /// text. Cancelling `cancel` aborts the call with `Cancelled`.
    async fn request(
        &self,
        messages: &[ChatMessage],
        cancel: &CancellationToken,
        sink: &mut dyn ThinkingSink,
    ) -> PhoneAgentResult<ModelResponse>;
}

/// Receives live thinking text while a response streams in.
pub trait ThinkingSink: Send {
    fn emit(&mut self, text: &str);
}

/// Prints thinking text to stdout as it arrives.
#[derive(Debug, Default)]
pub struct StdoutSink;

impl ThinkingSink for StdoutSink {
    fn emit(&mut self, text: &str) {
        let mut out = std::io::stdout().lock();
        let _ = out.write_all(text.as_bytes());
        let _ = out.flush();
    }
}

/// Keeps every emitted piece, in order.
#[derive(Debug, Default)]
pub struct CollectingSink {
    pub pieces: Vec<String>,
}

impl CollectingSink {
    pub fn text(&self) -> String {
        self.pieces.concat()
    }
}

impl ThinkingSink for CollectingSink {
    fn emit(&mut self, text: &str) {
        self.pieces.push(text.to_string());
    }
}
