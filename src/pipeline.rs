use crate::audio::{base_name, convert_to_ogg, split_file, SplitConfig};
use crate::config::{Config, ResponseFormat};
use crate::error::{Result, ScribeError};
use crate::merge::{merge, MergedTranscript};
use crate::store::{find_chunks, FragmentStore};
use crate::transcribe::{Transcriber, TranscriptFragment};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Outcome of one batch run.
#[derive(Debug, Default)]
pub struct BatchSummary {
    /// Final transcript paths for files that made it through.
    pub succeeded: Vec<PathBuf>,
    /// Inputs that failed, with the error that stopped them.
    pub failed: Vec<(PathBuf, String)>,
    pub total_time: Duration,
}

/// Drives one source file at a time: resume probe, transcode, split,
/// per-chunk transcription, merge, artifact write.
pub struct Pipeline {
    transcriber: Box<dyn Transcriber>,
    store: FragmentStore,
    scratch_dir: PathBuf,
    split: SplitConfig,
    response_format: ResponseFormat,
    show_progress: bool,
}

impl Pipeline {
    pub fn new(transcriber: Box<dyn Transcriber>, store: FragmentStore, scratch_dir: PathBuf) -> Self {
        Self {
            transcriber,
            store,
            scratch_dir,
            split: SplitConfig::default(),
            response_format: ResponseFormat::default(),
            show_progress: true,
        }
    }

    pub fn with_split(mut self, split: SplitConfig) -> Self {
        self.split = split;
        self
    }

    pub fn with_response_format(mut self, format: ResponseFormat) -> Self {
        self.response_format = format;
        self
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Size budget and response shape from loaded configuration.
    pub fn with_config(self, config: &Config) -> Self {
        let split = SplitConfig {
            target_size_mb: config.target_size_mb,
            tolerance_mb: config.tolerance_mb,
            ..SplitConfig::default()
        };
        self.with_split(split)
            .with_response_format(config.response_format)
    }

    /// Process every input, containing each failure to its own file.
    pub async fn run_batch(&self, inputs: &[PathBuf]) -> BatchSummary {
        let start = Instant::now();
        let mut summary = BatchSummary::default();

        for input in inputs {
            info!("Processing {}", input.display());
            match self.process_file(input).await {
                Ok(output) => summary.succeeded.push(output),
                Err(e) => {
                    warn!("Skipping {}: {}", input.display(), e);
                    summary.failed.push((input.clone(), e.to_string()));
                }
            }
        }

        summary.total_time = start.elapsed();
        summary
    }

    /// Run the full pipeline for one source file and return the transcript
    /// path.
    pub async fn process_file(&self, input: &Path) -> Result<PathBuf> {
        if !input.exists() {
            return Err(ScribeError::FileNotFound(input.display().to_string()));
        }

        let base = base_name(input);

        // First resume tier: stored fragments mean no chunking or
        // transcription work is repeated.
        let fragment_paths = self.store.find_fragments(&base)?;
        let fragments = if !fragment_paths.is_empty() {
            info!(
                "Resuming {}: {} stored fragments, skipping transcription",
                input.display(),
                fragment_paths.len()
            );
            fragment_paths
                .iter()
                .map(|p| self.store.load(p))
                .collect::<Result<Vec<_>>>()?
        } else {
            let chunk_paths = self.prepare_chunks(input, &base)?;
            self.transcribe_chunks(&chunk_paths, &base).await?
        };

        let merged = merge(&fragments).ok_or_else(|| {
            ScribeError::Api(format!(
                "No chunk of {} was transcribed successfully",
                input.display()
            ))
        })?;

        let output = self.write_transcript(&merged, input)?;
        info!("Transcript saved to {}", output.display());
        Ok(output)
    }

    /// Transcode and split, unless chunk audio from an earlier run is
    /// already on disk (second resume tier).
    fn prepare_chunks(&self, input: &Path, base: &str) -> Result<Vec<PathBuf>> {
        let existing = find_chunks(&self.scratch_dir, base);
        if !existing.is_empty() {
            info!(
                "Resuming {}: {} existing chunks, skipping split",
                input.display(),
                existing.len()
            );
            return Ok(existing);
        }

        // The converted file carries a timestamp suffix; chunks must stay
        // keyed by the source base so a later run can rediscover them.
        let speech_file = convert_to_ogg(input)?;
        let chunks = split_file(&speech_file, base, &self.split, &self.scratch_dir)?;
        Ok(chunks.into_iter().map(|c| c.path).collect())
    }

    /// Transcribe chunks in order, persisting each fragment as it lands.
    ///
    /// A failed chunk is logged and skipped; the final transcript then has a
    /// gap where that chunk's text would have been.
    async fn transcribe_chunks(
        &self,
        chunk_paths: &[PathBuf],
        base: &str,
    ) -> Result<Vec<TranscriptFragment>> {
        let count = chunk_paths.len();
        info!(
            "Transcribing {} chunks with {}",
            count,
            self.transcriber.name()
        );

        let progress_bar = if self.show_progress {
            let pb = ProgressBar::new(count as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({eta})")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
            );
            Some(pb)
        } else {
            None
        };

        let mut fragments = Vec::with_capacity(count);

        for (i, path) in chunk_paths.iter().enumerate() {
            let index = i + 1;
            debug!("Transcribing chunk {}/{}: {}", index, count, path.display());

            match self.transcriber.transcribe(path).await {
                Ok(fragment) => {
                    self.store.save(&fragment, base, index, count)?;
                    fragments.push(fragment);
                }
                Err(e) => {
                    warn!("Chunk {}/{} failed, skipping: {}", index, count, e);
                }
            }

            if let Some(ref pb) = progress_bar {
                pb.inc(1);
            }
        }

        if let Some(pb) = progress_bar {
            pb.finish_with_message("Transcription complete");
        }

        Ok(fragments)
    }

    fn write_transcript(&self, merged: &MergedTranscript, input: &Path) -> Result<PathBuf> {
        let dir = input.parent().unwrap_or_else(|| Path::new("."));
        let base = base_name(input);
        let output = unique_output_path(dir, &base, self.response_format.extension());

        let contents = match self.response_format {
            ResponseFormat::Text => merged.text.clone(),
            ResponseFormat::Verbose => serde_json::to_string_pretty(merged)?,
        };

        std::fs::write(&output, contents)?;
        Ok(output)
    }

    /// Startup-only maintenance: drop scratch files left behind by source
    /// files that are not part of this run. Mid-run state is never touched,
    /// since it is what makes a re-run resumable.
    pub fn clean_scratch(&self, keep_bases: &[String]) -> Result<()> {
        let mut removed = 0usize;
        let store_root = self.store.root().to_path_buf();

        for dir in [&self.scratch_dir, &store_root] {
            let Ok(entries) = std::fs::read_dir(dir) else {
                continue;
            };
            for entry in entries.filter_map(|e| e.ok()) {
                let name = entry.file_name().to_string_lossy().into_owned();
                let keep = keep_bases.iter().any(|b| name.starts_with(&format!("{b}.")));
                if !keep && entry.path().is_file() {
                    if std::fs::remove_file(entry.path()).is_ok() {
                        removed += 1;
                    }
                }
            }
        }

        if removed > 0 {
            info!("Cleaned {} stale scratch files", removed);
        }
        Ok(())
    }
}

/// Transcript path beside the source, with a counter suffix when taken.
fn unique_output_path(dir: &Path, base: &str, extension: &str) -> PathBuf {
    let first = dir.join(format!("{} Transcription.{}", base, extension));
    if !first.exists() {
        return first;
    }

    let mut counter = 2;
    loop {
        let candidate = dir.join(format!("{} Transcription {}.{}", base, counter, extension));
        if !candidate.exists() {
            return candidate;
        }
        counter += 1;
    }
}

/// Print a closing summary of the batch run.
pub fn print_summary(summary: &BatchSummary) {
    println!();
    println!("═══════════════════════════════════════════════════════════════");
    println!("                     Transcription Complete                     ");
    println!("═══════════════════════════════════════════════════════════════");
    println!();
    println!("  Transcribed:  {}", summary.succeeded.len());
    for path in &summary.succeeded {
        println!("    {}", path.display());
    }
    if !summary.failed.is_empty() {
        println!("  Failed:       {}", summary.failed.len());
        for (path, error) in &summary.failed {
            println!("    {} ({})", path.display(), error);
        }
    }
    println!();
    println!("  Total time:   {:.2}s", summary.total_time.as_secs_f64());
    println!();
    println!("═══════════════════════════════════════════════════════════════");
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_unique_output_path_first_free() {
        let dir = TempDir::new().unwrap();
        let path = unique_output_path(dir.path(), "meeting", "txt");
        assert!(path.ends_with("meeting Transcription.txt"));
    }

    #[test]
    fn test_unique_output_path_appends_counter() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("meeting Transcription.txt"), b"x").unwrap();
        std::fs::write(dir.path().join("meeting Transcription 2.txt"), b"x").unwrap();

        let path = unique_output_path(dir.path(), "meeting", "txt");
        assert!(path.ends_with("meeting Transcription 3.txt"));
    }

    #[test]
    fn test_batch_summary_default() {
        let summary = BatchSummary::default();
        assert!(summary.succeeded.is_empty());
        assert!(summary.failed.is_empty());
        assert_eq!(summary.total_time, Duration::ZERO);
    }
}
