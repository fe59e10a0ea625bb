//! Fragment naming and discovery.
//!
//! Fragments are named by their ordinal zero-padded to nine digits, so a
//! lexicographic listing and a numeric sort agree for every ordinal up to
//! 999,999,999. Discovery still sorts explicitly: directory enumeration order
//! is whatever the filesystem hands back and is never relied upon.

use crate::error::PipelineError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Extension of every fragment file (without the dot).
pub const FRAGMENT_EXTENSION: &str = "txt";

/// Number of digits in a fragment ordinal.
pub const ORDINAL_WIDTH: usize = 9;

/// Largest ordinal that fits in [`ORDINAL_WIDTH`] digits.
pub const MAX_ORDINAL: u64 = 999_999_999;

/// Suffix of the captured-stdout artifact name.
pub const STDOUT_SUFFIX: &str = "_stdout.txt";

/// Suffix of the captured-stderr artifact name.
pub const STDERR_SUFFIX: &str = "_stderr.txt";

static RE_ORDINAL_STEM: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{9}$").unwrap());

/// File name for the fragment with the given 1-based ordinal.
pub fn fragment_file_name(ordinal: u64) -> String {
    format!("{ordinal:0width$}.{FRAGMENT_EXTENSION}", width = ORDINAL_WIDTH)
}

/// A fragment file found in the split directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    /// Full path to the fragment file.
    pub path: PathBuf,
    /// File name without extension, e.g. `000000042`.
    pub stem: String,
    /// Parsed ordinal when the stem is a nine-digit number.
    ///
    /// Any other `.txt` file in the split directory is still rendered, after
    /// every ordinal-named fragment.
    pub ordinal: Option<u64>,
}

impl Fragment {
    /// Interpret `path` as a fragment, or `None` when it lacks the fragment
    /// extension or has a non-UTF-8 stem.
    pub fn from_path(path: PathBuf) -> Option<Self> {
        if path.extension().and_then(|e| e.to_str()) != Some(FRAGMENT_EXTENSION) {
            return None;
        }
        let stem = path.file_stem()?.to_str()?.to_string();
        let ordinal = if RE_ORDINAL_STEM.is_match(&stem) {
            stem.parse().ok()
        } else {
            None
        };
        Some(Self {
            path,
            stem,
            ordinal,
        })
    }

    /// Manifest identifier (and file name) of the captured stdout.
    pub fn stdout_id(&self) -> String {
        format!("{}{STDOUT_SUFFIX}", self.stem)
    }

    /// Manifest identifier (and file name) of the captured stderr.
    pub fn stderr_id(&self) -> String {
        format!("{}{STDERR_SUFFIX}", self.stem)
    }

    fn sort_key(&self) -> (u64, &str) {
        (self.ordinal.unwrap_or(u64::MAX), self.stem.as_str())
    }
}

/// List every fragment in `dir`, sorted by ordinal.
///
/// Only regular files (symlinks are followed) with the fragment extension
/// count; directories and other files are skipped silently. A missing
/// directory yields an empty list.
pub async fn list_fragments(dir: &Path) -> Result<Vec<Fragment>, PipelineError> {
    let list_err = |source: std::io::Error| PipelineError::FragmentListFailed {
        path: dir.to_path_buf(),
        source,
    };

    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(list_err(e)),
    };

    let mut fragments = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(list_err)? {
        let path = entry.path();
        let is_file = tokio::fs::metadata(&path)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false);
        if !is_file {
            debug!("Skipping non-file entry {}", path.display());
            continue;
        }
        match Fragment::from_path(path) {
            Some(fragment) => fragments.push(fragment),
            None => debug!("Skipping non-fragment file {}", entry.path().display()),
        }
    }

    fragments.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    Ok(fragments)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_are_nine_digits() {
        assert_eq!(fragment_file_name(1), "000000001.txt");
        assert_eq!(fragment_file_name(42), "000000042.txt");
        assert_eq!(fragment_file_name(MAX_ORDINAL), "999999999.txt");
    }

    #[test]
    fn lexicographic_order_matches_numeric_order() {
        let ordinals = [1u64, 2, 9, 10, 99, 100, 12_345, 999_999_999];
        let mut names: Vec<String> = ordinals.iter().map(|&o| fragment_file_name(o)).collect();
        let numeric = names.clone();
        names.sort();
        assert_eq!(names, numeric);
    }

    #[test]
    fn artifact_ids_derive_from_stem() {
        let f = Fragment::from_path(PathBuf::from("/out/split/000000007.txt")).unwrap();
        assert_eq!(f.ordinal, Some(7));
        assert_eq!(f.stdout_id(), "000000007_stdout.txt");
        assert_eq!(f.stderr_id(), "000000007_stderr.txt");
    }

    #[test]
    fn non_fragment_paths_are_rejected() {
        assert!(Fragment::from_path(PathBuf::from("/out/split/README.md")).is_none());
        assert!(Fragment::from_path(PathBuf::from("/out/split/000000001")).is_none());

        let other = Fragment::from_path(PathBuf::from("/out/split/notes.txt")).unwrap();
        assert_eq!(other.ordinal, None);
    }

    #[tokio::test]
    async fn listing_sorts_by_ordinal_and_skips_others() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["000000010.txt", "notes.txt", "000000002.txt", "image.png"] {
            std::fs::write(dir.path().join(name), "x").unwrap();
        }
        std::fs::create_dir(dir.path().join("000000001.txt")).unwrap();

        let stems: Vec<String> = list_fragments(dir.path())
            .await
            .unwrap()
            .into_iter()
            .map(|f| f.stem)
            .collect();
        assert_eq!(stems, vec!["000000002", "000000010", "notes"]);
    }

    #[tokio::test]
    async fn listing_missing_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let fragments = list_fragments(&dir.path().join("nope")).await.unwrap();
        assert!(fragments.is_empty());
    }
}
