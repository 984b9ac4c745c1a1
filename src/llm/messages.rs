use base64::Engine as _;

use crate::llm::types::{ChatMessage, ContentPart, ImageUrl, MessageContent};

impl ChatMessage {
    pub fn system(text: impl Into<String>) -> Self {
        Self::text("system", text)
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::text("user", text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::text("assistant", text)
    }

    fn text(role: &str, text: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: MessageContent::Text(text.into()),
        }
    }

    /// User turn carrying a PNG screenshot followed by the text.
    pub fn user_with_screenshot(text: impl Into<String>, png: &[u8]) -> Self {
        let encoded = base64::engine::general_purpose::STANDARD.encode(png);
        Self {
            role: "user".into(),
            content: MessageContent::Parts(vec![
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: format!("data:image/png;base64,{encoded}"),
                    },
                },
                ContentPart::Text { text: text.into() },
            ]),
        }
    }

    /// Assistant turn replayed into history in the tagged form the model emits.
    pub fn assistant_turn(thinking: &str, action: &str) -> Self {
        Self::assistant(format!("<think>{thinking}</think><answer>{action}</answer>"))
    }

    /// Drops image parts, keeping only text. Old screenshots are the bulk of
    /// the context, so history keeps just the latest one.
    pub fn strip_images(&mut self) {
        if let MessageContent::Parts(parts) = &self.content {
            let text: Vec<&str> = parts
                .iter()
                .filter_map(|p| match p {
                    ContentPart::Text { text } => Some(text.as_str()),
                    ContentPart::ImageUrl { .. } => None,
                })
                .collect();
            self.content = MessageContent::Text(text.join("\n"));
        }
    }

    pub fn has_image(&self) -> bool {
        matches!(&self.content, MessageContent::Parts(parts)
            if parts.iter().any(|p| matches!(p, ContentPart::ImageUrl { .. })))
    }
}
