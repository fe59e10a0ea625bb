//! Manifest store: the append-only ledger of completed artifacts.
//!
//! One identifier per line. An identifier is the artifact's file name inside
//! `processed/` (e.g. `000000001_stdout.txt`). Lines holding a full path are
//! accepted on load and reduced to their file name, so manifests written with
//! path-style entries keep working when the output directory is moved.
//!
//! Both identifiers of a fragment are appended with a single write and synced
//! to disk before [`ManifestStore::append`] returns; a crash right after a
//! render therefore loses at most the fragment that was in flight.

use crate::error::PipelineError;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// File-backed manifest at a fixed path.
#[derive(Debug, Clone)]
pub struct ManifestStore {
    path: PathBuf,
}

impl ManifestStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load every recorded identifier. A missing manifest means no history.
    pub async fn load(&self) -> Result<HashSet<String>, PipelineError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No manifest at {}; starting fresh", self.path.display());
                return Ok(HashSet::new());
            }
            Err(source) => {
                return Err(PipelineError::ManifestIo {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let ids: HashSet<String> = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(normalise_identifier)
            .collect();
        debug!(
            "Loaded {} manifest entries from {}",
            ids.len(),
            self.path.display()
        );
        Ok(ids)
    }

    /// Append `ids` as one record, flushed and synced before returning.
    pub async fn append(&self, ids: &[&str]) -> Result<(), PipelineError> {
        let io_err = |source| PipelineError::ManifestIo {
            path: self.path.clone(),
            source,
        };

        let mut record = String::new();
        for id in ids {
            record.push_str(id);
            record.push('\n');
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(io_err)?;
        file.write_all(record.as_bytes()).await.map_err(io_err)?;
        file.flush().await.map_err(io_err)?;
        file.sync_data().await.map_err(io_err)?;
        Ok(())
    }
}

/// Reduce a manifest line to the artifact file name it names.
fn normalise_identifier(line: &str) -> String {
    Path::new(line)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(line)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_manifest_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = ManifestStore::new(dir.path().join("processed_files.txt"));
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn appended_records_are_loaded_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = ManifestStore::new(dir.path().join("processed_files.txt"));

        store
            .append(&["000000001_stdout.txt", "000000001_stderr.txt"])
            .await
            .unwrap();
        store
            .append(&["000000002_stdout.txt", "000000002_stderr.txt"])
            .await
            .unwrap();

        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(raw.lines().count(), 4);
        assert!(raw.ends_with("000000002_stderr.txt\n"));

        let ids = store.load().await.unwrap();
        assert_eq!(ids.len(), 4);
        assert!(ids.contains("000000001_stderr.txt"));
    }

    #[tokio::test]
    async fn path_style_lines_are_normalised() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("processed_files.txt");
        std::fs::write(
            &path,
            "output/processed/000000001_stdout.txt\n\
             output/processed/000000001_stderr.txt\n\
             \n",
        )
        .unwrap();

        let ids = ManifestStore::new(&path).load().await.unwrap();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains("000000001_stdout.txt"));
        assert!(ids.contains("000000001_stderr.txt"));
    }

    #[tokio::test]
    async fn append_never_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("processed_files.txt");
        std::fs::write(&path, "old_stdout.txt\n").unwrap();

        ManifestStore::new(&path).append(&["new_stdout.txt"]).await.unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "old_stdout.txt\nnew_stdout.txt\n"
        );
    }
}
