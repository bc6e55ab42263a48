use tracing::debug;

use super::{AudioTimeline, SilenceInterval};

/// Parameters for silence detection.
#[derive(Debug, Clone)]
pub struct SilenceParams {
    /// Silent stretches shorter than this are absorbed into voiced audio.
    pub min_silence_ms: u64,

    /// Windows quieter than this (dBFS) are classified silent.
    pub threshold_dbfs: f32,

    /// Analysis window and step size in milliseconds.
    pub seek_step_ms: u64,
}

impl Default for SilenceParams {
    fn default() -> Self {
        Self {
            min_silence_ms: 500,
            threshold_dbfs: -40.0,
            seek_step_ms: 10,
        }
    }
}

/// RMS level of a window in dBFS relative to i16 full scale.
fn window_dbfs(samples: &[i16]) -> f32 {
    if samples.is_empty() {
        return f32::NEG_INFINITY;
    }

    let sum_squares: f64 = samples
        .iter()
        .map(|&s| {
            let normalized = s as f64 / i16::MAX as f64;
            normalized * normalized
        })
        .sum();

    let rms = (sum_squares / samples.len() as f64).sqrt();
    if rms <= 0.0 {
        f32::NEG_INFINITY
    } else {
        (20.0 * rms.log10()) as f32
    }
}

/// Find the silent intervals of a timeline.
///
/// The timeline is scanned in `seek_step_ms` windows, each classified by RMS
/// level against `threshold_dbfs`. Maximal silent runs shorter than
/// `min_silence_ms` are absorbed into the surrounding voiced audio; what
/// remains is returned ordered by start. A timeline with no voiced window at
/// all comes back as a single interval spanning the whole duration.
pub fn detect_silence(timeline: &AudioTimeline, params: &SilenceParams) -> Vec<SilenceInterval> {
    let duration_ms = timeline.duration_ms();
    if duration_ms == 0 {
        return vec![];
    }

    let step_samples =
        ((timeline.sample_rate as u64 * params.seek_step_ms) / 1000).max(1) as usize;

    let silent_windows: Vec<bool> = timeline
        .samples
        .chunks(step_samples)
        .map(|w| window_dbfs(w) < params.threshold_dbfs)
        .collect();

    if silent_windows.iter().all(|&s| s) {
        return vec![SilenceInterval {
            start_ms: 0,
            end_ms: duration_ms,
        }];
    }

    // Contract the classification into maximal silent runs (window indices).
    let mut runs: Vec<(usize, usize)> = Vec::new();
    let mut run_start = None;
    for (i, &silent) in silent_windows.iter().enumerate() {
        match (silent, run_start) {
            (true, None) => run_start = Some(i),
            (false, Some(start)) => {
                runs.push((start, i));
                run_start = None;
            }
            _ => {}
        }
    }
    if let Some(start) = run_start {
        runs.push((start, silent_windows.len()));
    }

    let intervals: Vec<SilenceInterval> = runs
        .into_iter()
        .map(|(start, end)| SilenceInterval {
            start_ms: start as u64 * params.seek_step_ms,
            end_ms: (end as u64 * params.seek_step_ms).min(duration_ms),
        })
        .filter(|iv| iv.duration_ms() >= params.min_silence_ms)
        .collect();

    debug!(
        "Silence scan: {} windows, {} intervals kept",
        silent_windows.len(),
        intervals.len()
    );

    intervals
}
