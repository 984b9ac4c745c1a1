use std::collections::HashMap;

/// Language-keyed text lookup for user-facing strings.
///
/// Passed explicitly to whatever prints text; there is no global catalog.
#[derive(Debug, Clone)]
pub struct MessageCatalog {
    lang: String,
    tables: HashMap<String, HashMap<String, String>>,
}

const FALLBACK_LANG: &str = "en";

const BUILTIN_CN: &[(&str, &str)] = &[
    ("performance_metrics", "性能指标"),
    ("time_to_first_token", "首 Token 延迟 (TTFT)"),
    ("time_to_thinking_end", "思考完成延迟"),
    ("total_inference_time", "总推理时间"),
];

const BUILTIN_EN: &[(&str, &str)] = &[
    ("performance_metrics", "Performance Metrics"),
    ("time_to_first_token", "Time to First Token (TTFT)"),
    ("time_to_thinking_end", "Time to Thinking End"),
    ("total_inference_time", "Total Inference Time"),
];

impl MessageCatalog {
    /// Catalog with the built-in `cn` and `en` tables.
    pub fn new(lang: impl Into<String>) -> Self {
        let mut tables = HashMap::new();
        for (lang, entries) in [("cn", BUILTIN_CN), ("en", BUILTIN_EN)] {
            let table = entries
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            tables.insert(lang.to_string(), table);
        }
        Self {
            lang: lang.into(),
            tables,
        }
    }

    /// Adds or replaces entries for `lang`.
    pub fn with_overrides(
        mut self,
        lang: &str,
        entries: impl IntoIterator<Item = (String, String)>,
    ) -> Self {
        self.tables.entry(lang.to_string()).or_default().extend(entries);
        self
    }

    pub fn lang(&self) -> &str {
        &self.lang
    }

    /// Looks `key` up in the selected language, then English, then returns the
    /// key itself.
    pub fn get<'a>(&'a self, key: &'a str) -> &'a str {
        [self.lang.as_str(), FALLBACK_LANG]
            .iter()
            .find_map(|lang| self.tables.get(*lang).and_then(|t| t.get(key)))
            .map(String::as_str)
            .unwrap_or(key)
    }
}

impl Default for MessageCatalog {
    fn default() -> Self {
        Self::new("cn")
    }
}
