use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

use hound::WavReader;
use tracing::{debug, info};

use crate::error::{Result, ScribeError};

use super::{base_name, AudioTimeline};

/// Check if FFmpeg is installed and accessible.
pub fn check_ffmpeg() -> Result<()> {
    let output = Command::new("ffmpeg").arg("-version").output().map_err(|e| {
        ScribeError::Transcode(format!(
            "FFmpeg not found. Please install FFmpeg and ensure it's in your PATH. Error: {e}"
        ))
    })?;

    if !output.status.success() {
        return Err(ScribeError::Transcode("FFmpeg check failed".to_string()));
    }

    debug!("FFmpeg is available");
    Ok(())
}

/// Check if FFprobe is installed and accessible.
pub fn check_ffprobe() -> Result<()> {
    let output = Command::new("ffprobe").arg("-version").output().map_err(|e| {
        ScribeError::Transcode(format!(
            "FFprobe not found. Please install FFmpeg (includes FFprobe). Error: {e}"
        ))
    })?;

    if !output.status.success() {
        return Err(ScribeError::Transcode("FFprobe check failed".to_string()));
    }

    debug!("FFprobe is available");
    Ok(())
}

/// Get audio duration in milliseconds using FFprobe.
pub fn probe_duration_ms(input: &Path) -> Result<u64> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(input)
        .output()
        .map_err(|e| ScribeError::Decode(format!("Failed to run FFprobe: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ScribeError::Decode(format!("FFprobe failed: {stderr}")));
    }

    let duration_str = String::from_utf8_lossy(&output.stdout);
    let duration_secs: f64 = duration_str.trim().parse().map_err(|e| {
        ScribeError::Decode(format!(
            "Failed to parse duration '{}': {e}",
            duration_str.trim()
        ))
    })?;

    Ok((duration_secs * 1000.0).round() as u64)
}

/// Convert an audio file to speech-optimized OGG.
///
/// Mono 12kbps Opus tuned for voice keeps hour-long recordings well under the
/// API payload ceiling. The output lands next to the input, suffixed with a
/// timestamp so repeated runs never collide.
pub fn convert_to_ogg(input: &Path) -> Result<PathBuf> {
    check_ffmpeg()?;

    if !input.exists() {
        return Err(ScribeError::FileNotFound(input.display().to_string()));
    }

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let output = input.with_file_name(format!(
        "{}_converted_{}.ogg",
        base_name(input),
        timestamp
    ));

    info!("Converting {} to OGG", input.display());

    let result = Command::new("ffmpeg")
        .args(["-y", "-i"])
        .arg(input)
        .args([
            "-vn",
            "-map_metadata",
            "-1",
            "-ac",
            "1",
            "-c:a",
            "libopus",
            "-b:a",
            "12k",
            "-application",
            "voip",
        ])
        .arg(&output)
        .output()
        .map_err(|e| ScribeError::Transcode(format!("Failed to run FFmpeg: {e}")))?;

    if !result.status.success() {
        let stderr = String::from_utf8_lossy(&result.stderr);
        return Err(ScribeError::Transcode(format!(
            "FFmpeg conversion failed: {stderr}"
        )));
    }

    if !output.exists() {
        return Err(ScribeError::Transcode(
            "Output file was not created".to_string(),
        ));
    }

    info!("Converted to {}", output.display());
    Ok(output)
}

/// Decode an audio file into an in-memory timeline for silence analysis.
///
/// FFmpeg renders a mono 16kHz WAV into the scratch directory, hound reads it
/// back, and the intermediate file is removed.
pub fn decode_for_analysis(input: &Path, scratch_dir: &Path) -> Result<AudioTimeline> {
    check_ffmpeg()?;

    if !input.exists() {
        return Err(ScribeError::FileNotFound(input.display().to_string()));
    }

    std::fs::create_dir_all(scratch_dir)?;
    let wav_path = scratch_dir.join(format!("{}.analysis.wav", base_name(input)));

    let result = Command::new("ffmpeg")
        .args(["-y", "-i"])
        .arg(input)
        .args(["-vn", "-acodec", "pcm_s16le", "-ar", "16000", "-ac", "1"])
        .arg(&wav_path)
        .output()
        .map_err(|e| ScribeError::Decode(format!("Failed to run FFmpeg: {e}")))?;

    if !result.status.success() {
        let stderr = String::from_utf8_lossy(&result.stderr);
        return Err(ScribeError::Decode(format!("FFmpeg decode failed: {stderr}")));
    }

    let reader = WavReader::open(&wav_path)
        .map_err(|e| ScribeError::Decode(format!("Failed to open WAV file: {e}")))?;

    let spec = reader.spec();
    let samples: Vec<i16> = match spec.sample_format {
        hound::SampleFormat::Int => reader
            .into_samples::<i16>()
            .map(|s| s.unwrap_or(0))
            .collect(),
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .map(|s| (s.unwrap_or(0.0) * i16::MAX as f32) as i16)
            .collect(),
    };

    let _ = std::fs::remove_file(&wav_path);

    let encoded_bytes = std::fs::metadata(input)?.len();

    debug!(
        "Decoded {} samples at {} Hz from {}",
        samples.len(),
        spec.sample_rate,
        input.display()
    );

    Ok(AudioTimeline {
        samples,
        sample_rate: spec.sample_rate,
        encoded_bytes,
    })
}

/// Export the `[start_ms, end_ms)` range of `input` as its own OGG file.
pub fn export_range(input: &Path, output: &Path, start_ms: u64, end_ms: u64) -> Result<()> {
    if end_ms <= start_ms {
        return Err(ScribeError::Transcode(
            "Chunk range duration is zero".to_string(),
        ));
    }

    let start_secs = format!("{:.3}", start_ms as f64 / 1000.0);
    let duration_secs = format!("{:.3}", (end_ms - start_ms) as f64 / 1000.0);

    debug!(
        "Exporting range start={} duration={} to {}",
        start_secs,
        duration_secs,
        output.display()
    );

    let result = Command::new("ffmpeg")
        .args(["-y", "-ss"])
        .arg(&start_secs)
        .arg("-t")
        .arg(&duration_secs)
        .arg("-i")
        .arg(input)
        .args([
            "-vn",
            "-ac",
            "1",
            "-c:a",
            "libopus",
            "-b:a",
            "12k",
            "-application",
            "voip",
        ])
        .arg(output)
        .output()
        .map_err(|e| ScribeError::Transcode(format!("Failed to run FFmpeg: {e}")))?;

    if !result.status.success() {
        let stderr = String::from_utf8_lossy(&result.stderr);
        return Err(ScribeError::Transcode(format!(
            "FFmpeg range export failed: {stderr}"
        )));
    }

    Ok(())
}
