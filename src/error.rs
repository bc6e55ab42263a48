use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScribeError {
    #[error("Failed to decode audio: {0}")]
    Decode(String),

    #[error("Transcoding failed: {0}")]
    Transcode(String),

    #[error("{} is {size_mb:.2}MB, over the {limit_mb}MB API limit", .path.display())]
    SizeLimit {
        path: PathBuf,
        size_mb: f64,
        limit_mb: u64,
    },

    #[error("Transcription API error: {0}")]
    Api(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ScribeError>;
