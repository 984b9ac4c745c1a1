use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::config::{AppConfig, ModelConfig};
use crate::errors::{PhoneAgentError, PhoneAgentResult};
use crate::i18n::MessageCatalog;
use crate::llm::metrics::{log_metrics, InferenceTimer};
use crate::llm::provider::{ChatModel, ThinkingSink};
use crate::llm::segmenter::{split_response, LiveSegmenter};
use crate::llm::sse_parser::{self, LineDecoder};
use crate::llm::types::{ChatMessage, ModelResponse, StreamChunkKind};

/// Streaming client for OpenAI-compatible chat completion endpoints.
pub struct ModelClient {
    config: ModelConfig,
    catalog: MessageCatalog,
    client: reqwest::Client,
}

impl ModelClient {
    pub fn new(config: ModelConfig, catalog: MessageCatalog) -> PhoneAgentResult<Self> {
        Ok(Self {
            config,
            catalog,
            client: reqwest::Client::builder().build()?,
        })
    }

    /// Client for the configured model, printing in the configured language.
    pub fn from_app_config(config: &AppConfig) -> PhoneAgentResult<Self> {
        Self::new(config.model.clone(), config.catalog())
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    fn deadline(&self) -> Option<Duration> {
        self.config.timeout_secs.map(Duration::from_secs)
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    async fn send(
        &self,
        messages: &[ChatMessage],
        cancel: &CancellationToken,
        sink: &mut dyn ThinkingSink,
    ) -> PhoneAgentResult<ModelResponse> {
        let timer = InferenceTimer::start();
        let body = serde_json::json!({
            "model": self.config.model_name,
            "messages": messages,
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
            "top_p": self.config.top_p,
            "frequency_penalty": self.config.frequency_penalty,
            "stream": true,
        });

        tracing::debug!(
            endpoint = %self.endpoint(),
            messages = messages.len(),
            "sending model request"
        );

        let mut request = self.client.post(self.endpoint()).json(&body);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PhoneAgentError::Cancelled),
            response = request.send() => response?,
        };

        if !response.status().is_success() {
            let status = response.status();
            let err_body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, "model request rejected");
            return Err(PhoneAgentError::LlmProvider(format!("{}: {}", status, err_body)));
        }

        let response = collect_stream(response.bytes_stream(), timer, cancel, sink).await?;

        log_metrics(
            &self.catalog,
            response.time_to_first_token,
            response.time_to_thinking_end,
            response.total_time,
        );
        Ok(response)
    }
}

#[async_trait]
impl ChatModel for ModelClient {
    fn name(&self) -> &str {
        &self.config.model_name
    }

    async fn request(
        &self,
        messages: &[ChatMessage],
        cancel: &CancellationToken,
        sink: &mut dyn ThinkingSink,
    ) -> PhoneAgentResult<ModelResponse> {
        let request_id = uuid::Uuid::new_v4();
        let span = tracing::info_span!("model_request", %request_id, model = %self.config.model_name);
        with_deadline(self.deadline(), self.send(messages, cancel, sink))
            .instrument(span)
            .await
    }
}

/// Runs `fut` under an optional deadline. On expiry the future is dropped,
/// which releases any open response stream, and `Timeout` is returned.
async fn with_deadline<T, F>(deadline: Option<Duration>, fut: F) -> PhoneAgentResult<T>
where
    F: Future<Output = PhoneAgentResult<T>>,
{
    let Some(limit) = deadline else {
        return fut.await;
    };
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(timeout = ?limit, "model request timed out");
            Err(PhoneAgentError::Timeout(limit))
        }
    }
}

/// Per-request state: the full text so far plus the live display split.
struct ResponseCollector {
    raw_content: String,
    live: LiveSegmenter,
    timer: InferenceTimer,
}

impl ResponseCollector {
    fn new(timer: InferenceTimer) -> Self {
        Self {
            raw_content: String::new(),
            live: LiveSegmenter::new(),
            timer,
        }
    }

    fn on_delta(&mut self, delta: &str, sink: &mut dyn ThinkingSink) {
        if delta.is_empty() {
            return;
        }
        self.raw_content.push_str(delta);
        self.timer.mark_first_token();

        let out = self.live.push(delta);
        if let Some(text) = out.thinking {
            sink.emit(&text);
        }
        if out.entered_action_phase {
            self.timer.mark_thinking_end();
        }
    }

    /// Handles one SSE line. Returns true once the stream signalled completion.
    fn on_line(&mut self, line: &str, sink: &mut dyn ThinkingSink) -> PhoneAgentResult<bool> {
        match sse_parser::parse_sse_line(line) {
            Ok(Some(chunk)) => match chunk.kind {
                StreamChunkKind::Content => {
                    self.on_delta(&chunk.content, sink);
                    Ok(false)
                }
                StreamChunkKind::Done => Ok(true),
                StreamChunkKind::Error => Err(PhoneAgentError::Stream(chunk.content)),
            },
            Ok(None) => Ok(false),
            Err(e) => {
                tracing::debug!("SSE parse skipped: {e}");
                Ok(false)
            }
        }
    }

    fn finish(self) -> ModelResponse {
        let parts = split_response(&self.raw_content);
        tracing::info!(
            content_len = self.raw_content.len(),
            thinking_len = parts.thinking.len(),
            action = %parts.action,
            "model stream complete"
        );
        ModelResponse {
            thinking: parts.thinking,
            action: parts.action,
            time_to_first_token: self.timer.first_token(),
            time_to_thinking_end: self.timer.thinking_end(),
            total_time: self.timer.elapsed(),
            raw_content: self.raw_content,
        }
    }
}

/// Drains an SSE byte stream into a `ModelResponse`.
///
/// The stream is dropped on every return path, which releases the underlying
/// connection. Cancellation wins over a ready chunk.
pub(crate) async fn collect_stream<S, B, E>(
    byte_stream: S,
    timer: InferenceTimer,
    cancel: &CancellationToken,
    sink: &mut dyn ThinkingSink,
) -> PhoneAgentResult<ModelResponse>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Display,
{
    let mut byte_stream = std::pin::pin!(byte_stream);
    let mut collector = ResponseCollector::new(timer);
    let mut decoder = LineDecoder::new();
    let mut done = false;

    'stream: loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::info!("model stream cancelled");
                return Err(PhoneAgentError::Cancelled);
            }
            next = byte_stream.next() => next,
        };

        let Some(result) = next else { break };
        let bytes = result.map_err(|e| {
            tracing::error!(error = %e, "model stream failed");
            PhoneAgentError::Stream(e.to_string())
        })?;

        for line in decoder.push(bytes.as_ref()) {
            if collector.on_line(&line, sink)? {
                done = true;
                break 'stream;
            }
        }
    }

    // Stream ended without a trailing newline.
    if !done {
        if let Some(line) = decoder.finish() {
            collector.on_line(&line, sink)?;
        }
    }

    Ok(collector.finish())
}
