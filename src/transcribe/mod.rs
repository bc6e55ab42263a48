pub mod whisper;

pub use whisper::WhisperClient;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One timed span of transcribed speech.
///
/// Inside a [`TranscriptFragment`] the times are seconds relative to that
/// fragment's own chunk; the merge step re-bases them to source-file time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FragmentSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// Transcription result for exactly one audio chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TranscriptFragment {
    /// Plain text, no timing metadata.
    Text { text: String },

    /// Structured result with chunk-relative segment timestamps.
    Structured {
        text: String,
        language: Option<String>,
        task: Option<String>,
        /// Chunk duration in seconds, as reported by the API.
        duration: Option<f64>,
        segments: Vec<FragmentSegment>,
    },
}

impl TranscriptFragment {
    pub fn text(&self) -> &str {
        match self {
            TranscriptFragment::Text { text } => text,
            TranscriptFragment::Structured { text, .. } => text,
        }
    }

    pub fn duration(&self) -> Option<f64> {
        match self {
            TranscriptFragment::Text { .. } => None,
            TranscriptFragment::Structured { duration, .. } => *duration,
        }
    }

    pub fn segments(&self) -> &[FragmentSegment] {
        match self {
            TranscriptFragment::Text { .. } => &[],
            TranscriptFragment::Structured { segments, .. } => segments,
        }
    }

    pub fn language(&self) -> Option<&str> {
        match self {
            TranscriptFragment::Text { .. } => None,
            TranscriptFragment::Structured { language, .. } => language.as_deref(),
        }
    }

    pub fn task(&self) -> Option<&str> {
        match self {
            TranscriptFragment::Text { .. } => None,
            TranscriptFragment::Structured { task, .. } => task.as_deref(),
        }
    }
}

/// A remote speech-to-text service, called once per size-compliant chunk.
///
/// Implementations do not retry; a failed call surfaces as-is and the caller
/// decides whether to skip the chunk or re-run the pipeline.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio_path: &Path) -> Result<TranscriptFragment>;
    fn name(&self) -> &'static str;
    fn max_upload_bytes(&self) -> u64;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_fragment_accessors() {
        let fragment = TranscriptFragment::Text {
            text: "hello".to_string(),
        };
        assert_eq!(fragment.text(), "hello");
        assert!(fragment.duration().is_none());
        assert!(fragment.segments().is_empty());
        assert!(fragment.language().is_none());
    }

    #[test]
    fn test_structured_fragment_accessors() {
        let fragment = TranscriptFragment::Structured {
            text: "hello world".to_string(),
            language: Some("en".to_string()),
            task: Some("transcribe".to_string()),
            duration: Some(9.5),
            segments: vec![FragmentSegment {
                start: 0.0,
                end: 9.5,
                text: "hello world".to_string(),
            }],
        };
        assert_eq!(fragment.text(), "hello world");
        assert_eq!(fragment.duration(), Some(9.5));
        assert_eq!(fragment.segments().len(), 1);
        assert_eq!(fragment.language(), Some("en"));
        assert_eq!(fragment.task(), Some("transcribe"));
    }

    #[test]
    fn test_fragment_json_round_trip_is_tagged() {
        let fragment = TranscriptFragment::Text {
            text: "hi".to_string(),
        };
        let json = serde_json::to_string(&fragment).unwrap();
        assert!(json.contains("\"kind\":\"text\""));

        let back: TranscriptFragment = serde_json::from_str(&json).unwrap();
        assert_eq!(back, fragment);
    }
}
