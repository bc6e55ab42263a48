use std::path::Path;

use tracing::{debug, info};

use crate::error::Result;

use super::silence::{detect_silence, SilenceParams};
use super::transcode::{decode_for_analysis, export_range, probe_duration_ms};
use super::{AudioChunk, SilenceInterval};

const MB: f64 = 1024.0 * 1024.0;

/// Size budget for splitting oversized files.
#[derive(Debug, Clone)]
pub struct SplitConfig {
    /// Preferred encoded size per chunk, in MB.
    pub target_size_mb: f64,

    /// Allowed overshoot past the target when a silence cut lands late.
    pub tolerance_mb: f64,

    pub silence: SilenceParams,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            target_size_mb: 20.0,
            tolerance_mb: 2.0,
            silence: SilenceParams::default(),
        }
    }
}

impl SplitConfig {
    fn budget_bytes(&self) -> f64 {
        (self.target_size_mb + self.tolerance_mb) * MB
    }
}

/// Plan cut points over `[0, duration_ms)`.
///
/// Chunk sizes are extrapolated linearly from the whole file's bytes-per-
/// millisecond ratio, which assumes roughly constant bitrate. Each cut
/// prefers the silence start nearest the ideal end that keeps the chunk
/// within `target + tolerance`; with no qualifying silence the cut falls at
/// the ideal end even mid-word. A tail that extrapolates within budget is
/// never split further.
///
/// The returned ranges are contiguous, ordered, and span the input exactly.
pub fn plan_cuts(
    duration_ms: u64,
    total_bytes: u64,
    target_bytes: f64,
    tolerance_bytes: f64,
    silences: &[SilenceInterval],
) -> Vec<(u64, u64)> {
    if duration_ms == 0 {
        return vec![];
    }
    if total_bytes == 0 {
        return vec![(0, duration_ms)];
    }

    let bytes_per_ms = total_bytes as f64 / duration_ms as f64;
    let budget = target_bytes + tolerance_bytes;
    let target_duration_ms = ((target_bytes / bytes_per_ms) as u64).max(1);

    let mut cuts = Vec::new();
    let mut start = 0u64;

    while start < duration_ms {
        let ideal_end = start + target_duration_ms;

        let end = if ideal_end >= duration_ms
            || (duration_ms - start) as f64 * bytes_per_ms <= budget
        {
            duration_ms
        } else {
            let candidate = silences
                .iter()
                .filter(|s| s.start_ms > start)
                .filter(|s| (s.start_ms - start) as f64 * bytes_per_ms <= budget)
                .min_by_key(|s| s.start_ms.abs_diff(ideal_end));

            match candidate {
                Some(s) => s.start_ms,
                // Mid-audio cut, accepted as a last resort.
                None => ideal_end,
            }
        };

        cuts.push((start, end));
        start = end;
    }

    cuts
}

/// Deterministic chunk file name for a source base name.
pub fn chunk_file_name(base: &str, index: usize, count: usize) -> String {
    format!("{}.chunk_{:03}_of_{:03}.ogg", base, index, count)
}

/// Split a file into size-compliant chunks at silence boundaries.
///
/// A file already within `target + tolerance` comes back as one chunk
/// pointing at the original path, untouched. Otherwise the file is decoded,
/// scanned for silence, cut, and each range exported into `scratch_dir`.
///
/// `base` keys the exported chunk names. It is the SOURCE file's base name,
/// not this path's: the caller may hand in a transcoded intermediate, and
/// chunk rediscovery on a later run looks the source name up.
pub fn split_file(
    path: &Path,
    base: &str,
    config: &SplitConfig,
    scratch_dir: &Path,
) -> Result<Vec<AudioChunk>> {
    let total_bytes = std::fs::metadata(path)?.len();

    if (total_bytes as f64) <= config.budget_bytes() {
        debug!(
            "{} is {:.2}MB, within budget; no split needed",
            path.display(),
            total_bytes as f64 / MB
        );
        let duration_ms = probe_duration_ms(path)?;
        return Ok(vec![AudioChunk {
            start_ms: 0,
            end_ms: duration_ms,
            index: 1,
            count: 1,
            path: path.to_path_buf(),
        }]);
    }

    info!(
        "{} is {:.2}MB, splitting at silence boundaries",
        path.display(),
        total_bytes as f64 / MB
    );

    let timeline = decode_for_analysis(path, scratch_dir)?;
    let silences = detect_silence(&timeline, &config.silence);

    let cuts = plan_cuts(
        timeline.duration_ms(),
        timeline.encoded_bytes,
        config.target_size_mb * MB,
        config.tolerance_mb * MB,
        &silences,
    );

    std::fs::create_dir_all(scratch_dir)?;
    let count = cuts.len();
    let mut chunks = Vec::with_capacity(count);

    for (i, &(start_ms, end_ms)) in cuts.iter().enumerate() {
        let index = i + 1;
        let chunk_path = scratch_dir.join(chunk_file_name(base, index, count));
        export_range(path, &chunk_path, start_ms, end_ms)?;
        chunks.push(AudioChunk {
            start_ms,
            end_ms,
            index,
            count,
            path: chunk_path,
        });
    }

    info!("Split {} into {} chunks", path.display(), chunks.len());
    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::find_chunks;
    use std::process::Command;
    use tempfile::TempDir;

    fn silence(start_ms: u64, end_ms: u64) -> SilenceInterval {
        SilenceInterval { start_ms, end_ms }
    }

    fn ffmpeg_available() -> bool {
        Command::new("ffmpeg")
            .arg("-version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    fn ffmpeg_has_opus() -> bool {
        Command::new("ffmpeg")
            .args(["-hide_banner", "-encoders"])
            .output()
            .map(|o| o.status.success() && String::from_utf8_lossy(&o.stdout).contains("libopus"))
            .unwrap_or(false)
    }

    /// A continuously loud sine wave, so silence detection finds nothing.
    fn write_sine_wav(path: &Path, seconds: u32) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 16000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..(16000 * seconds) {
            let sample = ((i as f32 * 0.05).sin() * 8000.0) as i16;
            writer.write_sample(sample).unwrap();
        }
        writer.finalize().unwrap();
    }

    fn assert_spans_exactly(cuts: &[(u64, u64)], duration_ms: u64) {
        assert_eq!(cuts.first().unwrap().0, 0);
        assert_eq!(cuts.last().unwrap().1, duration_ms);
        for pair in cuts.windows(2) {
            assert_eq!(pair[0].1, pair[1].0);
        }
        for &(start, end) in cuts {
            assert!(start < end);
        }
    }

    #[test]
    fn test_plan_cuts_prefers_nearby_silence() {
        // 60s at 40MB total, 20MB target + 2MB tolerance, one silence near
        // the 30s midpoint: exactly two chunks split at the silence start.
        let total_bytes = 40 * 1024 * 1024;
        let silences = vec![silence(29_800, 30_200)];
        let cuts = plan_cuts(
            60_000,
            total_bytes,
            20.0 * MB,
            2.0 * MB,
            &silences,
        );

        assert_eq!(cuts, vec![(0, 29_800), (29_800, 60_000)]);
    }

    #[test]
    fn test_plan_cuts_falls_back_to_ideal_end() {
        // No silence anywhere: cuts land exactly at the extrapolated target.
        let total_bytes = 40 * 1024 * 1024;
        let cuts = plan_cuts(60_000, total_bytes, 10.0 * MB, 0.0, &[]);

        assert_eq!(cuts, vec![(0, 15_000), (15_000, 30_000), (30_000, 45_000), (45_000, 60_000)]);
    }

    #[test]
    fn test_plan_cuts_rejects_silence_over_budget() {
        // Only silence sits far past the budget; fallback cut applies.
        let total_bytes = 40 * 1024 * 1024;
        let silences = vec![silence(55_000, 56_000)];
        let cuts = plan_cuts(60_000, total_bytes, 10.0 * MB, 1.0 * MB, &silences);

        assert_eq!(cuts[0], (0, 15_000));
    }

    #[test]
    fn test_plan_cuts_ignores_silence_at_or_before_start() {
        // Silence starting exactly at the walk position must not produce an
        // empty chunk.
        let total_bytes = 40 * 1024 * 1024;
        let silences = vec![silence(0, 400), silence(29_800, 30_200)];
        let cuts = plan_cuts(60_000, total_bytes, 20.0 * MB, 2.0 * MB, &silences);

        assert_eq!(cuts, vec![(0, 29_800), (29_800, 60_000)]);
    }

    #[test]
    fn test_plan_cuts_spans_input_exactly() {
        let total_bytes = 100 * 1024 * 1024;
        let silences = vec![
            silence(10_000, 10_600),
            silence(31_000, 31_500),
            silence(44_000, 45_000),
            silence(80_000, 81_000),
        ];
        let cuts = plan_cuts(300_000, total_bytes, 20.0 * MB, 2.0 * MB, &silences);

        assert!(cuts.len() > 1);
        assert_spans_exactly(&cuts, 300_000);
    }

    #[test]
    fn test_plan_cuts_single_chunk_when_remainder_fits() {
        // Whole file extrapolates within budget even though the ideal end
        // falls short of the duration.
        let total_bytes = 21 * 1024 * 1024;
        let cuts = plan_cuts(60_000, total_bytes, 20.0 * MB, 2.0 * MB, &[]);
        assert_eq!(cuts, vec![(0, 60_000)]);
    }

    #[test]
    fn test_plan_cuts_empty_duration() {
        assert!(plan_cuts(0, 1024, 20.0 * MB, 2.0 * MB, &[]).is_empty());
    }

    #[test]
    fn test_chunk_file_name() {
        assert_eq!(chunk_file_name("meeting", 2, 14), "meeting.chunk_002_of_014.ogg");
    }

    #[test]
    fn test_split_file_within_budget_returns_original() {
        if !ffmpeg_available() {
            eprintln!("Skipping test: FFmpeg not available");
            return;
        }

        let dir = TempDir::new().unwrap();
        let input = dir.path().join("meeting.wav");
        write_sine_wav(&input, 1);

        let scratch = dir.path().join("scratch");
        let chunks = split_file(&input, "meeting", &SplitConfig::default(), &scratch).unwrap();

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].path, input);
        assert_eq!(chunks[0].start_ms, 0);
        assert_eq!((chunks[0].index, chunks[0].count), (1, 1));
        assert!((900..=1100).contains(&chunks[0].end_ms));
        // Nothing was exported.
        assert!(find_chunks(&scratch, "meeting").is_empty());
    }

    #[test]
    fn test_split_file_names_chunks_by_given_base() {
        if !ffmpeg_has_opus() {
            eprintln!("Skipping test: FFmpeg with libopus not available");
            return;
        }

        let dir = TempDir::new().unwrap();
        // Mimic a transcoded intermediate whose stem differs from the source.
        let input = dir.path().join("meeting_converted_1724800000.wav");
        write_sine_wav(&input, 2);

        let scratch = dir.path().join("scratch");
        let config = SplitConfig {
            target_size_mb: 0.01,
            tolerance_mb: 0.0,
            silence: SilenceParams::default(),
        };
        let chunks = split_file(&input, "meeting", &config, &scratch).unwrap();
        assert!(chunks.len() > 1);

        // Rediscovery by the source base name sees every exported chunk.
        let found = find_chunks(&scratch, "meeting");
        assert_eq!(found.len(), chunks.len());
        for (chunk, found_path) in chunks.iter().zip(&found) {
            assert_eq!(&chunk.path, found_path);
        }
        assert!(find_chunks(&scratch, "meeting_converted_1724800000").is_empty());
    }
}
