use crate::error::{Result, ScribeError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Shape of the transcript requested from the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    /// Plain text, no timing information.
    #[default]
    Text,
    /// Structured JSON with per-segment timestamps, language and duration.
    Verbose,
}

impl std::fmt::Display for ResponseFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResponseFormat::Text => write!(f, "text"),
            ResponseFormat::Verbose => write!(f, "verbose"),
        }
    }
}

impl std::str::FromStr for ResponseFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(ResponseFormat::Text),
            "verbose" | "json" => Ok(ResponseFormat::Verbose),
            _ => Err(format!("Unknown format: {}. Use 'text' or 'verbose'", s)),
        }
    }
}

impl ResponseFormat {
    /// Value sent in the API's `response_format` field.
    pub fn api_value(&self) -> &'static str {
        match self {
            ResponseFormat::Text => "text",
            ResponseFormat::Verbose => "verbose_json",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ResponseFormat::Text => "txt",
            ResponseFormat::Verbose => "json",
        }
    }
}

const DEFAULT_PROMPT: &str = "You are transcribing an audio file. Format in accordance \
with the speaker's pauses and breaks. Do not add any additional text or commentary.";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub openai_api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    /// ISO 639-1 language hint; None lets the API auto-detect.
    pub language: Option<String>,
    pub prompt: String,
    pub response_format: ResponseFormat,
    /// Target chunk size in MB when splitting oversized files.
    pub target_size_mb: f64,
    /// Allowed overshoot past the target before a cut is rejected.
    pub tolerance_mb: f64,
    /// Hard API payload ceiling; nothing larger is ever submitted.
    pub max_upload_mb: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            model: "whisper-1".to_string(),
            temperature: 0.0,
            language: Some("en".to_string()),
            prompt: DEFAULT_PROMPT.to_string(),
            response_format: ResponseFormat::default(),
            target_size_mb: 20.0,
            tolerance_mb: 2.0,
            max_upload_mb: 25,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        // Load from config file if it exists
        if let Some(config_path) = Self::config_file_path() {
            if config_path.exists() {
                let contents = std::fs::read_to_string(&config_path)?;
                if let Ok(file_config) = toml::from_str::<Config>(&contents) {
                    config = file_config;
                }
            }
        }

        // Override with environment variables
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            config.openai_api_key = Some(key);
        }
        if let Ok(model) = std::env::var("BATCHSCRIBE_MODEL") {
            config.model = model;
        }
        if let Ok(format) = std::env::var("BATCHSCRIBE_FORMAT") {
            if let Ok(f) = format.parse() {
                config.response_format = f;
            }
        }
        if let Ok(language) = std::env::var("BATCHSCRIBE_LANGUAGE") {
            config.language = if language.is_empty() || language == "auto" {
                None
            } else {
                Some(language)
            };
        }

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.openai_api_key.is_none() {
            return Err(ScribeError::Config(
                "OPENAI_API_KEY not set. Export it with: export OPENAI_API_KEY=sk-...".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.temperature) {
            return Err(ScribeError::Config(format!(
                "Temperature must be between 0.0 and 1.0, got {}",
                self.temperature
            )));
        }

        if self.target_size_mb <= 0.0 || self.tolerance_mb < 0.0 {
            return Err(ScribeError::Config(
                "Chunk target size must be positive and tolerance non-negative".to_string(),
            ));
        }

        if self.target_size_mb + self.tolerance_mb > self.max_upload_mb as f64 {
            return Err(ScribeError::Config(format!(
                "target_size_mb + tolerance_mb ({:.1}) exceeds the {}MB upload ceiling",
                self.target_size_mb + self.tolerance_mb,
                self.max_upload_mb
            )));
        }

        Ok(())
    }

    fn config_file_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("batchscribe").join("config.toml"))
    }

    /// Directory where chunk audio and fragment files persist between runs.
    pub fn scratch_dir() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("batchscribe")
    }
}
