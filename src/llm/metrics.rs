use std::time::{Duration, Instant};

use crate::i18n::MessageCatalog;

/// Latency timings for one streamed model call.
#[derive(Debug)]
pub struct InferenceTimer {
    start: Instant,
    first_token: Option<Duration>,
    thinking_end: Option<Duration>,
}

impl InferenceTimer {
    pub fn start() -> Self {
        Self::started_at(Instant::now())
    }

    pub fn started_at(start: Instant) -> Self {
        Self {
            start,
            first_token: None,
            thinking_end: None,
        }
    }

    /// Records time-to-first-token; later calls are ignored.
    pub fn mark_first_token(&mut self) {
        if self.first_token.is_none() {
            self.first_token = Some(self.start.elapsed());
        }
    }

    /// Records time-to-thinking-end; later calls are ignored.
    pub fn mark_thinking_end(&mut self) {
        if self.thinking_end.is_none() {
            self.thinking_end = Some(self.start.elapsed());
        }
    }

    pub fn first_token(&self) -> Option<Duration> {
        self.first_token
    }

    pub fn thinking_end(&self) -> Option<Duration> {
        self.thinking_end
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

/// Logs the timing summary in the catalog's language.
pub fn log_metrics(
    catalog: &MessageCatalog,
    first_token: Option<Duration>,
    thinking_end: Option<Duration>,
    total: Duration,
) {
    let rule = "=".repeat(50);
    tracing::info!("{rule}");
    tracing::info!("⏱️  {}", catalog.get("performance_metrics"));
    tracing::info!("{}", "-".repeat(50));
    if let Some(t) = first_token {
        tracing::info!("{}: {:.3}s", catalog.get("time_to_first_token"), t.as_secs_f64());
    }
    if let Some(t) = thinking_end {
        tracing::info!("{}: {:.3}s", catalog.get("time_to_thinking_end"), t.as_secs_f64());
    }
    tracing::info!("{}: {:.3}s", catalog.get("total_inference_time"), total.as_secs_f64());
    tracing::info!("{rule}");
}
