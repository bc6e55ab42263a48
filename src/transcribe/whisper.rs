use crate::config::{Config, ResponseFormat};
use crate::error::{Result, ScribeError};
use crate::transcribe::{FragmentSegment, Transcriber, TranscriptFragment};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::path::Path;
use tokio::fs;
use tracing::debug;

/// OpenAI Whisper API endpoint.
const WHISPER_API_URL: &str = "https://api.openai.com/v1/audio/transcriptions";

/// OpenAI Whisper API client.
pub struct WhisperClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
    language: Option<String>,
    prompt: Option<String>,
    response_format: ResponseFormat,
    max_upload_mb: u64,
}

impl WhisperClient {
    /// Create a new Whisper client with the given API key.
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: WHISPER_API_URL.to_string(),
            model: "whisper-1".to_string(),
            temperature: 0.0,
            language: None,
            prompt: None,
            response_format: ResponseFormat::default(),
            max_upload_mb: 25,
        }
    }

    /// Build a client from loaded configuration. The API key must already be
    /// validated as present.
    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = config
            .openai_api_key
            .clone()
            .ok_or_else(|| ScribeError::Config("OPENAI_API_KEY not set".to_string()))?;

        let mut client = Self::new(api_key)
            .with_model(config.model.clone())
            .with_temperature(config.temperature)
            .with_prompt(config.prompt.clone())
            .with_response_format(config.response_format);
        client.max_upload_mb = config.max_upload_mb;
        if let Some(ref lang) = config.language {
            client = client.with_language(lang.clone());
        }
        Ok(client)
    }

    pub fn with_model(mut self, model: String) -> Self {
        self.model = model;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the source language (ISO 639-1 code).
    pub fn with_language(mut self, language: String) -> Self {
        self.language = Some(language);
        self
    }

    /// Set the priming prompt sent with every request.
    pub fn with_prompt(mut self, prompt: String) -> Self {
        self.prompt = Some(prompt);
        self
    }

    pub fn with_response_format(mut self, format: ResponseFormat) -> Self {
        self.response_format = format;
        self
    }

    /// Point the client at a different endpoint (used by tests).
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    /// Build the multipart form for the API request.
    async fn build_form(&self, audio_path: &Path) -> Result<Form> {
        let file_bytes = fs::read(audio_path).await?;
        let file_name = audio_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.ogg")
            .to_string();

        let mime_type = match audio_path.extension().and_then(|e| e.to_str()) {
            Some("ogg") | Some("oga") | Some("opus") => "audio/ogg",
            Some("wav") => "audio/wav",
            Some("mp3") => "audio/mpeg",
            Some("m4a") => "audio/mp4",
            Some("flac") => "audio/flac",
            Some("webm") => "audio/webm",
            _ => "application/octet-stream",
        };

        let file_part = Part::bytes(file_bytes)
            .file_name(file_name)
            .mime_str(mime_type)?;

        let mut form = Form::new()
            .part("file", file_part)
            .text("model", self.model.clone())
            .text("response_format", self.response_format.api_value())
            .text("temperature", self.temperature.to_string());

        if let Some(ref lang) = self.language {
            form = form.text("language", lang.clone());
        }

        if let Some(ref prompt) = self.prompt {
            form = form.text("prompt", prompt.clone());
        }

        Ok(form)
    }

    /// Issue the request once; no retry at any layer.
    async fn call_api(&self, form: Form) -> Result<String> {
        let response = self
            .client
            .post(&self.base_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        debug!("Whisper API response status: {}", status);

        if status.is_success() {
            return Ok(response.text().await?);
        }

        let error_body = response.text().await.unwrap_or_default();

        if let Ok(api_error) = serde_json::from_str::<ApiErrorResponse>(&error_body) {
            return Err(ScribeError::Api(format!(
                "Whisper API error: {} ({})",
                api_error.error.message, api_error.error.r#type
            )));
        }

        Err(ScribeError::Api(format!(
            "Whisper API error ({}): {}",
            status, error_body
        )))
    }

    fn parse_response(&self, body: String) -> Result<TranscriptFragment> {
        match self.response_format {
            ResponseFormat::Text => Ok(TranscriptFragment::Text {
                text: body.trim().to_string(),
            }),
            ResponseFormat::Verbose => {
                let parsed: VerboseResponse = serde_json::from_str(&body)?;
                let segments = parsed
                    .segments
                    .unwrap_or_default()
                    .into_iter()
                    .map(|s| FragmentSegment {
                        start: s.start,
                        end: s.end,
                        text: s.text.trim().to_string(),
                    })
                    .collect();
                Ok(TranscriptFragment::Structured {
                    text: parsed.text.trim().to_string(),
                    language: parsed.language,
                    task: parsed.task,
                    duration: parsed.duration,
                    segments,
                })
            }
        }
    }
}

#[async_trait]
impl Transcriber for WhisperClient {
    async fn transcribe(&self, audio_path: &Path) -> Result<TranscriptFragment> {
        debug!("Transcribing {} with Whisper", audio_path.display());

        // The size gate is a hard invariant: nothing over the ceiling is
        // ever submitted.
        let metadata = fs::metadata(audio_path).await?;
        if metadata.len() > self.max_upload_bytes() {
            return Err(ScribeError::SizeLimit {
                path: audio_path.to_path_buf(),
                size_mb: metadata.len() as f64 / (1024.0 * 1024.0),
                limit_mb: self.max_upload_mb,
            });
        }

        let form = self.build_form(audio_path).await?;
        let body = self.call_api(form).await?;
        let fragment = self.parse_response(body)?;

        debug!(
            "Whisper returned {} segments for {}",
            fragment.segments().len(),
            audio_path.display()
        );

        Ok(fragment)
    }

    fn name(&self) -> &'static str {
        "OpenAI Whisper"
    }

    fn max_upload_bytes(&self) -> u64 {
        self.max_upload_mb * 1024 * 1024
    }
}

// API response types

#[derive(Debug, Deserialize)]
struct VerboseResponse {
    text: String,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    task: Option<String>,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    segments: Option<Vec<VerboseSegment>>,
}

#[derive(Debug, Deserialize)]
struct VerboseSegment {
    start: f64,
    end: f64,
    text: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
    r#type: String,
    #[allow(dead_code)]
    code: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_text_response() {
        let client = WhisperClient::new("test-key".to_string());
        let fragment = client
            .parse_response("  Hello world.  \n".to_string())
            .unwrap();
        assert_eq!(
            fragment,
            TranscriptFragment::Text {
                text: "Hello world.".to_string()
            }
        );
    }

    #[test]
    fn test_parse_verbose_response() {
        let client = WhisperClient::new("test-key".to_string())
            .with_response_format(ResponseFormat::Verbose);

        let body = r#"{
            "task": "transcribe",
            "language": "en",
            "duration": 4.0,
            "text": "Hello world. How are you?",
            "segments": [
                {"start": 0.0, "end": 2.0, "text": " Hello world."},
                {"start": 2.5, "end": 4.0, "text": " How are you?"}
            ]
        }"#;

        let fragment = client.parse_response(body.to_string()).unwrap();
        assert_eq!(fragment.text(), "Hello world. How are you?");
        assert_eq!(fragment.duration(), Some(4.0));
        assert_eq!(fragment.segments().len(), 2);
        assert_eq!(fragment.segments()[0].text, "Hello world.");
        assert_eq!(fragment.language(), Some("en"));
    }

    #[test]
    fn test_parse_verbose_response_without_segments() {
        let client = WhisperClient::new("test-key".to_string())
            .with_response_format(ResponseFormat::Verbose);

        let body = r#"{"text": "Hello", "language": "en", "duration": 2.0}"#;
        let fragment = client.parse_response(body.to_string()).unwrap();
        assert_eq!(fragment.text(), "Hello");
        assert!(fragment.segments().is_empty());
    }

    #[test]
    fn test_max_upload_bytes() {
        let client = WhisperClient::new("test-key".to_string());
        assert_eq!(client.max_upload_bytes(), 25 * 1024 * 1024);
    }
}
