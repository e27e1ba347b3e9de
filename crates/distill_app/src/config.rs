use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use distill_core::{ModelRank, OutputLanguage, SummaryLength, AUTO_FREE_MODEL};
use distill_engine::{
    CompletionSettings, FetchSettings, SummaryDefaults, DEFAULT_ENDPOINT, DEFAULT_MAX_TOKENS,
    DEFAULT_READER_BASE,
};
use distill_logging::distill_info;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "distill.ron";
pub const API_KEY_ENV: &str = "OPENROUTER_API_KEY";

const DEFAULT_FREE_MODELS: &[&str] = &[
    "meta-llama/llama-3.3-70b-instruct:free",
    "deepseek/deepseek-chat-v3-0324:free",
    "google/gemini-2.0-flash-exp:free",
    "qwen/qwen-2.5-72b-instruct:free",
    "mistralai/mistral-7b-instruct:free",
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: ron::error::SpannedError,
    },
}

/// Contents of `distill.ron`. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api_key: Option<String>,
    pub endpoint: String,
    pub default_model: String,
    pub default_length: SummaryLength,
    pub custom_prompt: Option<String>,
    pub language: String,
    pub free_models: Vec<String>,
    pub reader_base: String,
    pub max_tokens: u32,
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub max_page_bytes: u64,
    pub indent_unit: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            default_model: AUTO_FREE_MODEL.to_string(),
            default_length: SummaryLength::default(),
            custom_prompt: None,
            language: "auto".to_string(),
            free_models: DEFAULT_FREE_MODELS.iter().map(|m| m.to_string()).collect(),
            reader_base: DEFAULT_READER_BASE.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            request_timeout_secs: 60,
            connect_timeout_secs: 10,
            max_page_bytes: 5 * 1024 * 1024,
            indent_unit: "\t".to_string(),
        }
    }
}

impl Settings {
    /// Reads settings from `path`; a missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                distill_info!("No config at {:?}; using defaults", path);
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        Self::parse(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(content: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(content)
    }

    /// A non-blank environment value replaces the file's key.
    pub fn with_env_api_key(mut self, value: Option<String>) -> Self {
        if let Some(key) = value.filter(|key| !key.trim().is_empty()) {
            self.api_key = Some(key);
        }
        self
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().map(str::trim).filter(|key| !key.is_empty())
    }

    pub fn output_language(&self) -> OutputLanguage {
        self.language.parse().unwrap_or_default()
    }

    pub fn ranked_models(&self) -> ModelRank {
        ModelRank::new(&self.free_models)
    }

    pub fn fetch_settings(&self) -> FetchSettings {
        FetchSettings {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            max_bytes: self.max_page_bytes,
            reader_base: self.reader_base.clone(),
            ..FetchSettings::default()
        }
    }

    pub fn completion_settings(&self) -> CompletionSettings {
        CompletionSettings {
            endpoint: self.endpoint.clone(),
            max_tokens: self.max_tokens,
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            read_timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }

    pub fn summary_defaults(&self) -> SummaryDefaults {
        SummaryDefaults {
            model: self.default_model.clone(),
            length: self.default_length,
            language: self.output_language(),
            custom_prompt: self.custom_prompt.clone().filter(|p| !p.trim().is_empty()),
            ranked_models: self.ranked_models(),
        }
    }
}
