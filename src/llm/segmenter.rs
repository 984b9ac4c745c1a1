/// Literal markers that open the action part of a response, in priority order.
/// The first marker in this list that occurs anywhere wins, even if a later
/// one occurs earlier in the text.
pub const ACTION_MARKERS: [&str; 2] = ["finish(message=", "do(action="];

const THINK_OPEN: &str = "<think>";
const THINK_CLOSE: &str = "</think>";
const ANSWER_OPEN: &str = "<answer>";
const ANSWER_CLOSE: &str = "</answer>";

/// What a single delta produced on the live path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LiveOutput {
    /// Thinking text safe to display now.
    pub thinking: Option<String>,
    /// Set on the one delta that completed an action marker.
    pub entered_action_phase: bool,
}

/// Display-only splitter that runs while the response is still streaming.
///
/// Text is held back while the buffered tail could still grow into an action
/// marker, so a marker split across chunks is never shown partially. The
/// parsed result never depends on this; see [`split_response`].
#[derive(Debug, Default)]
pub struct LiveSegmenter {
    buffer: String,
    in_action_phase: bool,
}

impl LiveSegmenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_action_phase(&self) -> bool {
        self.in_action_phase
    }

    /// Text held back at the moment, waiting for more chunks.
    pub fn pending(&self) -> &str {
        &self.buffer
    }

    pub fn push(&mut self, delta: &str) -> LiveOutput {
        if self.in_action_phase {
            return LiveOutput::default();
        }

        self.buffer.push_str(delta);

        for marker in ACTION_MARKERS {
            if let Some(pos) = self.buffer.find(marker) {
                let thinking = self.buffer[..pos].to_string();
                self.buffer.clear();
                self.in_action_phase = true;
                tracing::trace!(marker = marker, "live segmenter entered action phase");
                return LiveOutput {
                    thinking: (!thinking.is_empty()).then_some(thinking),
                    entered_action_phase: true,
                };
            }
        }

        if ends_with_partial_marker(&self.buffer) {
            return LiveOutput::default();
        }

        let thinking = std::mem::take(&mut self.buffer);
        LiveOutput {
            thinking: (!thinking.is_empty()).then_some(thinking),
            entered_action_phase: false,
        }
    }
}

/// True when the text ends with a non-empty proper prefix of any marker.
fn ends_with_partial_marker(text: &str) -> bool {
    ACTION_MARKERS
        .iter()
        .any(|marker| (1..marker.len()).any(|i| text.ends_with(&marker[..i])))
}

/// Reasoning and action parts of a complete response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseParts {
    pub thinking: String,
    pub action: String,
}

/// Splits the full response text into thinking and action.
///
/// Rules, first match wins:
/// 1. `finish(message=` anywhere: split before its first occurrence.
/// 2. `do(action=` anywhere: same.
/// 3. `<answer>`: legacy `<think>/<answer>` tags.
/// 4. Otherwise everything is the action.
pub fn split_response(content: &str) -> ResponseParts {
    for marker in ACTION_MARKERS {
        if let Some(pos) = content.find(marker) {
            return ResponseParts {
                thinking: content[..pos].trim().to_string(),
                action: content[pos..].to_string(),
            };
        }
    }

    if let Some((thinking, action)) = split_legacy_tags(content) {
        return ResponseParts { thinking, action };
    }

    ResponseParts {
        thinking: String::new(),
        action: content.to_string(),
    }
}

/// Legacy `<think>...</think><answer>...</answer>` split. Returns `None` when
/// there is no `<answer>` tag. Every think tag is removed from the thinking
/// part and every `</answer>` from the action part.
pub fn split_legacy_tags(content: &str) -> Option<(String, String)> {
    let (before, after) = content.split_once(ANSWER_OPEN)?;
    let thinking = before.replace(THINK_OPEN, "").replace(THINK_CLOSE, "");
    let action = after.replace(ANSWER_CLOSE, "");
    Some((thinking.trim().to_string(), action.trim().to_string()))
}
