use crate::errors::{PhoneAgentError, PhoneAgentResult};
use crate::llm::types::{StreamChunk, StreamChunkKind};

/// Parses a raw SSE line (OpenAI-compatible format) into a StreamChunk.
/// Returns None if the line is a keep-alive, a non-data line, or carries no
/// content.
pub fn parse_sse_line(line: &str) -> PhoneAgentResult<Option<StreamChunk>> {
    if line.is_empty() || line.starts_with(':') {
        return Ok(None);
    }

    let data = if let Some(d) = line.strip_prefix("data:") {
        d.trim()
    } else {
        return Ok(None);
    };

    if data == "[DONE]" {
        return Ok(Some(StreamChunk {
            kind: StreamChunkKind::Done,
            content: String::new(),
        }));
    }

    let json: serde_json::Value =
        serde_json::from_str(data).map_err(|e| PhoneAgentError::SseParsing(e.to_string()))?;

    // Providers report mid-stream failures as an `error` object.
    if let Some(err) = json.get("error") {
        let message = err["message"]
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| err.to_string());
        return Ok(Some(StreamChunk {
            kind: StreamChunkKind::Error,
            content: message,
        }));
    }

    if let Some(first) = json["choices"].as_array().and_then(|c| c.first()) {
        if let Some(content) = first["delta"]["content"].as_str() {
            if !content.is_empty() {
                return Ok(Some(StreamChunk {
                    kind: StreamChunkKind::Content,
                    content: content.to_string(),
                }));
            }
        }

        // Finish reason signals done
        if first["finish_reason"].as_str().is_some() {
            return Ok(Some(StreamChunk {
                kind: StreamChunkKind::Done,
                content: String::new(),
            }));
        }
    }

    Ok(None)
}

/// Splits a byte stream into complete lines.
///
/// Bytes are buffered until a newline arrives, so a multi-byte character cut
/// by a network chunk boundary is decoded whole.
#[derive(Debug, Default)]
pub struct LineDecoder {
    buf: Vec<u8>,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `bytes` and returns every line completed by them, trimmed.
    /// Blank lines are dropped.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(bytes);

        let mut lines = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.buf.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw).trim().to_string();
            if !line.is_empty() {
                lines.push(line);
            }
        }
        lines
    }

    /// Returns the unterminated last line, if any.
    pub fn finish(&mut self) -> Option<String> {
        let raw = std::mem::take(&mut self.buf);
        let line = String::from_utf8_lossy(&raw).trim().to_string();
        (!line.is_empty()).then_some(line)
    }
}
