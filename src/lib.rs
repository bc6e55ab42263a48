pub mod audio;
pub mod config;
pub mod error;
pub mod merge;
pub mod pipeline;
pub mod store;
pub mod transcribe;

pub use config::{Config, ResponseFormat};
pub use error::{Result, ScribeError};
pub use merge::{merge, MergedTranscript};
pub use pipeline::{print_summary, BatchSummary, Pipeline};
pub use store::FragmentStore;
pub use transcribe::{Transcriber, TranscriptFragment, WhisperClient};
