//! Result types returned by [`crate::run::run`].

use crate::error::{FragmentError, PipelineError};
use crate::pipeline::split::SplitCompletion;
use serde::{Deserialize, Serialize};

/// What happened to one fragment during the render phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FragmentStatus {
    /// The renderer ran and succeeded; the pair is in the manifest.
    Rendered,
    /// Already in the manifest; the renderer was not invoked.
    Skipped,
    /// The renderer ran but did not succeed.
    Failed,
}

/// Per-fragment outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FragmentResult {
    /// Fragment stem, e.g. `000000001`.
    pub fragment: String,
    pub ordinal: Option<u64>,
    pub status: FragmentStatus,
    /// Identifier of the captured stdout artifact.
    pub stdout: String,
    /// Identifier of the captured stderr artifact.
    pub stderr: String,
    pub exit_code: Option<i32>,
    /// Wall-clock time spent in the renderer (0 when skipped).
    pub duration_ms: u64,
    /// Whether the pair is recorded in the manifest after this run.
    pub recorded: bool,
    pub error: Option<FragmentError>,
}

/// Aggregate numbers for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub total_fragments: usize,
    pub rendered: usize,
    pub skipped: usize,
    pub failed: usize,
    pub split_duration_ms: u64,
    pub render_duration_ms: u64,
    pub total_duration_ms: u64,
}

impl RunStats {
    /// Count statuses; durations are left at zero for the caller to fill.
    pub fn tally(fragments: &[FragmentResult]) -> Self {
        let count = |status: FragmentStatus| fragments.iter().filter(|f| f.status == status).count();
        Self {
            total_fragments: fragments.len(),
            rendered: count(FragmentStatus::Rendered),
            skipped: count(FragmentStatus::Skipped),
            failed: count(FragmentStatus::Failed),
            ..Default::default()
        }
    }

    /// Number of renderer invocations made during the run.
    pub fn invocations(&self) -> usize {
        self.rendered + self.failed
    }
}

/// Everything a run produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineOutput {
    pub split: SplitCompletion,
    pub fragments: Vec<FragmentResult>,
    pub stats: RunStats,
}

impl PipelineOutput {
    /// Turn any failed fragment into an error, for callers with zero tolerance.
    pub fn into_result(self) -> Result<Self, PipelineError> {
        if self.stats.failed > 0 {
            return Err(PipelineError::PartialFailure {
                failed: self.stats.failed,
                total: self.stats.total_fragments,
            });
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(stem: &str, status: FragmentStatus) -> FragmentResult {
        FragmentResult {
            fragment: stem.into(),
            ordinal: stem.parse().ok(),
            status,
            stdout: format!("{stem}_stdout.txt"),
            stderr: format!("{stem}_stderr.txt"),
            exit_code: None,
            duration_ms: 0,
            recorded: status != FragmentStatus::Failed,
            error: None,
        }
    }

    #[test]
    fn tally_counts_each_status() {
        let stats = RunStats::tally(&[
            result("000000001", FragmentStatus::Rendered),
            result("000000002", FragmentStatus::Skipped),
            result("000000003", FragmentStatus::Failed),
            result("000000004", FragmentStatus::Rendered),
        ]);
        assert_eq!(stats.total_fragments, 4);
        assert_eq!(stats.rendered, 2);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.invocations(), 3);
    }

    #[test]
    fn into_result_rejects_failures() {
        let fragments = vec![
            result("000000001", FragmentStatus::Rendered),
            result("000000002", FragmentStatus::Failed),
        ];
        let output = PipelineOutput {
            split: SplitCompletion::Performed { fragments: 2 },
            stats: RunStats::tally(&fragments),
            fragments,
        };
        let err = output.into_result().unwrap_err();
        assert!(err.to_string().contains("1/2"), "got: {err}");
    }

    #[test]
    fn output_serialises_to_json() {
        let fragments = vec![result("000000001", FragmentStatus::Skipped)];
        let output = PipelineOutput {
            split: SplitCompletion::AlreadySplit { existing: 1 },
            stats: RunStats::tally(&fragments),
            fragments,
        };
        let json = serde_json::to_string(&output).unwrap();
        assert!(json.contains("\"status\":\"already_split\""), "got: {json}");
        assert!(json.contains("\"status\":\"skipped\""), "got: {json}");
    }
}
