use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::Result;
use crate::transcribe::TranscriptFragment;

/// Durable per-chunk transcript storage.
///
/// Fragments are JSON files named `{base}.fragment_{i:03}_of_{n:03}.json`
/// under the store root. A later run rediscovers them by base name alone; no
/// attempt is made to verify that the files still correspond to the current
/// audio content.
#[derive(Debug, Clone)]
pub struct FragmentStore {
    root: PathBuf,
}

impl FragmentStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn fragment_file_name(base: &str, index: usize, count: usize) -> String {
        format!("{}.fragment_{:03}_of_{:03}.json", base, index, count)
    }

    /// Persist one fragment, keyed by source base name and 1-based index.
    pub fn save(
        &self,
        fragment: &TranscriptFragment,
        base: &str,
        index: usize,
        count: usize,
    ) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.root)?;
        let path = self.root.join(Self::fragment_file_name(base, index, count));
        let json = serde_json::to_string_pretty(fragment)?;
        std::fs::write(&path, json)?;
        debug!("Saved fragment {} to {}", index, path.display());
        Ok(path)
    }

    pub fn load(&self, path: &Path) -> Result<TranscriptFragment> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Previously saved fragments for a source base name, ordered by index.
    /// Empty when no prior run got this far.
    pub fn find_fragments(&self, base: &str) -> Result<Vec<PathBuf>> {
        Ok(discover_indexed(&self.root, base, "fragment", "json"))
    }
}

/// Previously exported chunk audio for a source base name, ordered by index.
pub fn find_chunks(scratch_dir: &Path, base: &str) -> Vec<PathBuf> {
    discover_indexed(scratch_dir, base, "chunk", "ogg")
}

/// Parse the 1-based index out of `{base}.{marker}_{i}_of_{n}.{ext}`.
fn parse_index(file_name: &str, base: &str, marker: &str, ext: &str) -> Option<usize> {
    let middle = file_name
        .strip_prefix(&format!("{}.{}_", base, marker))?
        .strip_suffix(&format!(".{}", ext))?;
    let (index, count) = middle.split_once("_of_")?;
    count.parse::<usize>().ok()?;
    index.parse().ok()
}

fn discover_indexed(dir: &Path, base: &str, marker: &str, ext: &str) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return vec![];
    };

    let mut found: Vec<(usize, PathBuf)> = entries
        .filter_map(|e| e.ok())
        .filter_map(|e| {
            let name = e.file_name().to_string_lossy().into_owned();
            parse_index(&name, base, marker, ext).map(|i| (i, e.path()))
        })
        .collect();

    found.sort_by_key(|(i, _)| *i);
    found.into_iter().map(|(_, p)| p).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn text_fragment(text: &str) -> TranscriptFragment {
        TranscriptFragment::Text {
            text: text.to_string(),
        }
    }

    #[test]
    fn test_parse_index() {
        assert_eq!(
            parse_index("meeting.fragment_002_of_005.json", "meeting", "fragment", "json"),
            Some(2)
        );
        assert_eq!(
            parse_index("meeting.chunk_010_of_012.ogg", "meeting", "chunk", "ogg"),
            Some(10)
        );
        assert_eq!(
            parse_index("other.fragment_001_of_002.json", "meeting", "fragment", "json"),
            None
        );
        assert_eq!(
            parse_index("meeting.fragment_abc_of_002.json", "meeting", "fragment", "json"),
            None
        );
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = FragmentStore::new(dir.path().to_path_buf());

        let fragment = text_fragment("hello there");
        let path = store.save(&fragment, "meeting", 1, 3).unwrap();
        assert!(path.ends_with("meeting.fragment_001_of_003.json"));

        let loaded = store.load(&path).unwrap();
        assert_eq!(loaded, fragment);
    }

    #[test]
    fn test_find_fragments_ordered_by_index() {
        let dir = TempDir::new().unwrap();
        let store = FragmentStore::new(dir.path().to_path_buf());

        // Saved out of order; discovery must come back index-ordered.
        store.save(&text_fragment("c"), "meeting", 3, 3).unwrap();
        store.save(&text_fragment("a"), "meeting", 1, 3).unwrap();
        store.save(&text_fragment("b"), "meeting", 2, 3).unwrap();
        store.save(&text_fragment("x"), "other", 1, 1).unwrap();

        let paths = store.find_fragments("meeting").unwrap();
        assert_eq!(paths.len(), 3);
        for (i, path) in paths.iter().enumerate() {
            let name = path.file_name().unwrap().to_string_lossy().into_owned();
            assert!(name.contains(&format!("fragment_{:03}", i + 1)), "{name}");
        }
    }

    #[test]
    fn test_find_fragments_empty_when_none() {
        let dir = TempDir::new().unwrap();
        let store = FragmentStore::new(dir.path().join("missing"));
        assert!(store.find_fragments("meeting").unwrap().is_empty());
    }

    #[test]
    fn test_find_chunks() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("meeting.chunk_002_of_002.ogg"), b"x").unwrap();
        std::fs::write(dir.path().join("meeting.chunk_001_of_002.ogg"), b"x").unwrap();
        std::fs::write(dir.path().join("meeting.analysis.wav"), b"x").unwrap();

        let chunks = find_chunks(dir.path(), "meeting");
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].ends_with("meeting.chunk_001_of_002.ogg"));
        assert!(chunks[1].ends_with("meeting.chunk_002_of_002.ogg"));
    }
}
