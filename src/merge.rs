use serde::Serialize;
use tracing::debug;

use crate::transcribe::{FragmentSegment, TranscriptFragment};

/// One time-coherent transcript for an entire source file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedTranscript {
    pub text: String,
    /// All fragment segments, re-based to source-file-absolute seconds.
    pub segments: Vec<FragmentSegment>,
    /// Sum of the fragments' reported durations, in seconds.
    pub duration: f64,
    pub language: Option<String>,
    pub task: Option<String>,
}

/// Combine ordered fragments into one transcript.
///
/// Texts are joined by a single space in chunk order. Each fragment's
/// segments are shifted by the summed durations of all earlier fragments; a
/// fragment that never reported a duration contributes a zero offset, so
/// segments after it stay mis-based. Language and task come from the first
/// fragment only. Empty input yields `None`.
pub fn merge(fragments: &[TranscriptFragment]) -> Option<MergedTranscript> {
    let first = fragments.first()?;

    let mut text_parts: Vec<&str> = Vec::with_capacity(fragments.len());
    let mut segments = Vec::new();
    let mut offset_secs = 0.0f64;

    for fragment in fragments {
        text_parts.push(fragment.text());

        for segment in fragment.segments() {
            segments.push(FragmentSegment {
                start: segment.start + offset_secs,
                end: segment.end + offset_secs,
                text: segment.text.clone(),
            });
        }

        offset_secs += fragment.duration().unwrap_or(0.0);
    }

    debug!(
        "Merged {} fragments into {} segments spanning {:.1}s",
        fragments.len(),
        segments.len(),
        offset_secs
    );

    Some(MergedTranscript {
        text: text_parts.join(" "),
        segments,
        duration: offset_secs,
        language: first.language().map(str::to_string),
        task: first.task().map(str::to_string),
    })
}
