use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::errors::{PhoneAgentError, PhoneAgentResult};
use crate::i18n::MessageCatalog;

const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub model: ModelConfig,
    /// Per-language message overrides: `[messages.en] total_inference_time = "..."`.
    #[serde(default)]
    pub messages: HashMap<String, HashMap<String, String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// OpenAI-compatible API root; `/chat/completions` is appended.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Optional API key (falls back to env var PHONE_AGENT_API_KEY).
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_model_name")]
    pub model_name: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub temperature: f32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    #[serde(default = "default_frequency_penalty")]
    pub frequency_penalty: f32,
    /// Language of user-facing text, e.g. "cn" or "en".
    #[serde(default = "default_lang")]
    pub lang: String,
    /// Whole-request timeout. None waits indefinitely.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_base_url() -> String {
    "http://localhost:8000/v1".to_string()
}

fn default_model_name() -> String {
    "autoglm-phone-9b".to_string()
}

fn default_max_tokens() -> u32 {
    3000
}

fn default_top_p() -> f32 {
    0.85
}

fn default_frequency_penalty() -> f32 {
    0.2
}

fn default_lang() -> String {
    "cn".to_string()
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            model_name: default_model_name(),
            max_tokens: default_max_tokens(),
            temperature: 0.0,
            top_p: default_top_p(),
            frequency_penalty: default_frequency_penalty(),
            lang: default_lang(),
            timeout_secs: None,
        }
    }
}

impl AppConfig {
    /// Message catalog for the configured language, with file overrides applied.
    pub fn catalog(&self) -> MessageCatalog {
        self.messages.iter().fold(
            MessageCatalog::new(self.model.lang.clone()),
            |catalog, (lang, entries)| catalog.with_overrides(lang, entries.clone()),
        )
    }

    /// Applies `PHONE_AGENT_*` environment overrides on top of file values.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("PHONE_AGENT_BASE_URL") {
            self.model.base_url = v;
        }
        if let Some(v) = lookup("PHONE_AGENT_MODEL") {
            self.model.model_name = v;
        }
        if let Some(v) = lookup("PHONE_AGENT_API_KEY") {
            self.model.api_key = Some(v);
        }
        if let Some(v) = lookup("PHONE_AGENT_LANG") {
            self.model.lang = v;
        }
    }
}

fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(exe) = std::env::current_exe() {
        if let Some(parent) = exe.parent() {
            let candidate = parent.join(CONFIG_FILE);
            if candidate.exists() {
                tracing::debug!(path = %candidate.display(), "config found next to executable");
                return Some(candidate);
            }
        }
    }

    if let Ok(cwd) = std::env::current_dir() {
        let candidate = cwd.join(CONFIG_FILE);
        if candidate.exists() {
            tracing::debug!(path = %candidate.display(), "config found in working directory");
            return Some(candidate);
        }
    }

    let candidate = dirs::config_dir()?.join("phoneagent").join(CONFIG_FILE);
    if candidate.exists() {
        tracing::debug!(path = %candidate.display(), "config found in user config dir");
        return Some(candidate);
    }
    None
}

/// Loads `.env`, then `config.toml` if one is found, then env overrides.
/// A missing file is not an error; defaults are used.
pub fn load_config() -> PhoneAgentResult<AppConfig> {
    // Load .env file if present (ignore error if not found)
    let _ = dotenvy::dotenv();

    let mut config = match resolve_config_path() {
        Some(path) => {
            let content = std::fs::read_to_string(&path)?;
            let config: AppConfig = toml::from_str(&content)?;
            tracing::info!(path = %path.display(), model = %config.model.model_name, "config loaded");
            config
        }
        None => {
            tracing::info!("no config.toml found, using defaults");
            AppConfig::default()
        }
    };
    config.apply_env_overrides();
    Ok(config)
}

pub fn save_config(config: &AppConfig) -> PhoneAgentResult<()> {
    let path = match resolve_config_path() {
        Some(path) => path,
        None => {
            let dir = dirs::config_dir()
                .ok_or_else(|| PhoneAgentError::Config("no user config directory".into()))?
                .join("phoneagent");
            std::fs::create_dir_all(&dir)?;
            dir.join(CONFIG_FILE)
        }
    };
    let content = toml::to_string_pretty(config)?;
    std::fs::write(&path, content)?;
    tracing::info!(path = %path.display(), "config saved");
    Ok(())
}
