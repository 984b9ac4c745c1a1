use thiserror::Error;

#[derive(Debug, Error)]
pub enum PhoneAgentError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("LLM provider error: {0}")]
    LlmProvider(String),

    #[error("SSE parsing error: {0}")]
    SseParsing(String),

    /// Transport failure while receiving deltas.
    #[error("Stream error: {0}")]
    Stream(String),

    /// Action text has a call prefix but not a well-formed call shape.
    #[error("Invalid action syntax: {0}")]
    Syntax(String),

    /// A `key=value` token inside `do(...)` is malformed.
    #[error("Invalid argument: {0}")]
    Argument(String),

    /// A value token matches no supported literal form.
    #[error("Unsupported literal: {0}")]
    Literal(String),

    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("TOML deserialize error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    /// The caller's cancellation token fired.
    #[error("Request cancelled")]
    Cancelled,

    /// The configured request deadline passed. Handled like `Cancelled`.
    #[error("Request timed out after {0:?}")]
    Timeout(std::time::Duration),
}

impl PhoneAgentError {
    /// True for the errors produced while turning action text into an `Action`.
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            Self::Syntax(_) | Self::Argument(_) | Self::Literal(_) | Self::UnknownAction(_)
        )
    }

    /// True when the request was stopped from outside rather than failing.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Timeout(_))
    }
}

impl serde::Serialize for PhoneAgentError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        serializer.serialize_str(self.to_string().as_str())
    }
}

pub type PhoneAgentResult<T> = Result<T, PhoneAgentError>;
