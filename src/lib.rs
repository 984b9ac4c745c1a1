pub mod action;
pub mod config;
pub mod errors;
pub mod i18n;
pub mod llm;

pub use action::{parse_action, Action, ActionKind, ActionResult, Literal};
pub use errors::{PhoneAgentError, PhoneAgentResult};
pub use llm::provider::{ChatModel, CollectingSink, StdoutSink, ThinkingSink};
pub use llm::providers::openai_compatible::ModelClient;
pub use llm::segmenter::{split_response, LiveSegmenter, ResponseParts};
pub use llm::types::{ChatMessage, ModelResponse};

/// Installs the global `tracing` subscriber. Honors `RUST_LOG`, defaulting to
/// `info`. Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();
}
