pub mod silence;
pub mod split;
pub mod transcode;

pub use silence::{detect_silence, SilenceParams};
pub use split::{split_file, SplitConfig};
pub use transcode::{
    check_ffmpeg, check_ffprobe, convert_to_ogg, decode_for_analysis, export_range,
    probe_duration_ms,
};

use std::path::{Path, PathBuf};

/// File stem used to key chunk, fragment, and transcript names.
pub fn base_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "audio".to_string())
}

/// Decoded amplitude signal for one source file.
///
/// Read-only once built; time positions throughout the crate are integer
/// milliseconds from the start of this timeline.
#[derive(Debug, Clone)]
pub struct AudioTimeline {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
    /// Byte size of the encoded file this timeline was decoded from.
    pub encoded_bytes: u64,
}

impl AudioTimeline {
    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        (self.samples.len() as u64 * 1000) / self.sample_rate as u64
    }
}

/// A half-open `[start_ms, end_ms)` range classified as silent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SilenceInterval {
    pub start_ms: u64,
    pub end_ms: u64,
}

impl SilenceInterval {
    pub fn duration_ms(&self) -> u64 {
        self.end_ms.saturating_sub(self.start_ms)
    }
}

/// One contiguous sub-range of a source file, exported for transcription.
///
/// Indices are 1-based; chunks of one file are contiguous, the first starts
/// at 0 and the last ends at the source duration.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    pub start_ms: u64,
    pub end_ms: u64,
    pub index: usize,
    pub count: usize,
    pub path: PathBuf,
}

impl AudioChunk {
    pub fn duration_ms(&self) -> u64 {
        self.end_ms.saturating_sub(self.start_ms)
    }
}
