//! Failure ledger: append-only NDJSON record of renders that did not succeed.
//!
//! The manifest only answers "is this fragment done?". The ledger keeps the
//! why for every fragment whose renderer exited non-zero, was killed, or timed
//! out, so failures can be inspected after an unattended run. One JSON object
//! per line; each line is written and flushed in one go.

use crate::error::{FragmentError, PipelineError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// One failed render.
///
/// `reason` and `exit_code` are flattened from `error` so a line can be read
/// without knowing the tagged layout of [`FragmentError`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureRecord {
    /// Fragment stem, e.g. `000000004`.
    pub fragment: String,
    /// Identifier of the captured stdout artifact.
    pub stdout: String,
    /// Identifier of the captured stderr artifact.
    pub stderr: String,
    /// Human-readable failure message.
    pub reason: String,
    /// Renderer exit code; `null` after a signal or a timeout.
    pub exit_code: Option<i32>,
    pub error: FragmentError,
    /// Whether the pair was recorded in the manifest anyway.
    pub recorded_complete: bool,
    pub recorded_at: DateTime<Utc>,
}

impl FailureRecord {
    /// Build a record for `fragment`, stamped with the current time.
    pub fn new(
        fragment: impl Into<String>,
        stdout: impl Into<String>,
        stderr: impl Into<String>,
        error: FragmentError,
        recorded_complete: bool,
    ) -> Self {
        Self {
            fragment: fragment.into(),
            stdout: stdout.into(),
            stderr: stderr.into(),
            reason: error.to_string(),
            exit_code: error.exit_code(),
            error,
            recorded_complete,
            recorded_at: Utc::now(),
        }
    }
}

/// File-backed NDJSON failure ledger.
#[derive(Debug, Clone)]
pub struct FailureLedger {
    path: PathBuf,
}

impl FailureLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn append(&self, record: &FailureRecord) -> Result<(), PipelineError> {
        let io_err = |source| PipelineError::FailureLedgerIo {
            path: self.path.clone(),
            source,
        };

        let mut line =
            serde_json::to_string(record).map_err(|source| PipelineError::FailureRecordInvalid {
                path: self.path.clone(),
                source,
            })?;
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(io_err)?;
        file.write_all(line.as_bytes()).await.map_err(io_err)?;
        file.flush().await.map_err(io_err)?;
        Ok(())
    }

    /// Read every record. A missing ledger has no records.
    pub async fn load(&self) -> Result<Vec<FailureRecord>, PipelineError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(PipelineError::FailureLedgerIo {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                serde_json::from_str(line).map_err(|source| PipelineError::FailureRecordInvalid {
                    path: self.path.clone(),
                    source,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(stem: &str, error: FragmentError) -> FailureRecord {
        FailureRecord::new(
            stem,
            format!("{stem}_stdout.txt"),
            format!("{stem}_stderr.txt"),
            error,
            false,
        )
    }

    #[tokio::test]
    async fn records_round_trip_one_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = FailureLedger::new(dir.path().join("failed_files.ndjson"));

        let first = record(
            "000000001",
            FragmentError::NonZeroExit {
                fragment: "000000001".into(),
                code: 3,
            },
        );
        let second = record(
            "000000002",
            FragmentError::Timeout {
                fragment: "000000002".into(),
                secs: 1,
            },
        );
        ledger.append(&first).await.unwrap();
        ledger.append(&second).await.unwrap();

        let raw = std::fs::read_to_string(ledger.path()).unwrap();
        assert_eq!(raw.lines().count(), 2);

        let loaded = ledger.load().await.unwrap();
        assert_eq!(loaded, vec![first, second]);
    }

    #[test]
    fn line_carries_reason_and_exit_code_at_top_level() {
        let rec = record(
            "000000005",
            FragmentError::NonZeroExit {
                fragment: "000000005".into(),
                code: 4,
            },
        );
        let value: serde_json::Value = serde_json::to_value(&rec).unwrap();
        let obj = value.as_object().unwrap();
        for key in [
            "fragment",
            "stdout",
            "stderr",
            "reason",
            "exit_code",
            "recorded_at",
        ] {
            assert!(obj.contains_key(key), "missing {key}: {value}");
        }
        assert_eq!(obj["exit_code"], 4);
        assert!(obj["reason"].as_str().unwrap().contains("status 4"));

        let timed_out = record(
            "000000006",
            FragmentError::Timeout {
                fragment: "000000006".into(),
                secs: 1,
            },
        );
        let value = serde_json::to_value(&timed_out).unwrap();
        assert!(value["exit_code"].is_null());
        assert!(value["reason"].as_str().unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn garbage_line_is_reported_as_invalid_record() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = FailureLedger::new(dir.path().join("failed_files.ndjson"));
        std::fs::write(ledger.path(), "not json\n").unwrap();

        let err = ledger.load().await.unwrap_err();
        assert!(
            matches!(err, PipelineError::FailureRecordInvalid { .. }),
            "got: {err:?}"
        );
    }

    #[tokio::test]
    async fn missing_ledger_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = FailureLedger::new(dir.path().join("none.ndjson"));
        assert!(ledger.load().await.unwrap().is_empty());
    }
}
