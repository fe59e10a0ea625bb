//! Renderer invoker: render every fragment not yet in the manifest.
//!
//! Fragments are handled strictly one at a time, in ordinal order. For each
//! one the sequence is: check the manifest set, invoke the renderer (bounded
//! by the configured timeout), write both artifacts, then record. Recording
//! happens only after both artifacts are on disk, so an interrupted run
//! re-renders at most the fragment that was in flight.
//!
//! ## Skip rule
//!
//! A fragment is skipped when EITHER of its two identifiers is already in the
//! manifest. Deleting the manifest makes every fragment eligible again;
//! re-rendering simply overwrites the existing artifacts.
//!
//! ## Failures
//!
//! A renderer that cannot be launched aborts the run. A renderer that runs
//! and fails (non-zero exit, signal, timeout) still gets its artifacts
//! written and a failure-ledger entry; under [`FailurePolicy::Retry`] its
//! pair stays out of the manifest so the next run tries again. Output is
//! captured only from a renderer that exits, so a timed-out fragment gets two
//! empty artifacts.

use crate::config::{FailurePolicy, PipelineConfig};
use crate::error::{FragmentError, PipelineError};
use crate::output::{FragmentResult, FragmentStatus};
use crate::pipeline::failures::{FailureLedger, FailureRecord};
use crate::pipeline::fragment::{list_fragments, Fragment};
use crate::pipeline::manifest::ManifestStore;
use crate::pipeline::renderer::{resolve_renderer, RenderOutput, Renderer};
use once_cell::sync::OnceCell;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Outcome of one bounded renderer call.
enum Invocation {
    Finished(RenderOutput),
    TimedOut,
}

/// Runs the render phase for one configuration.
pub struct RenderInvoker<'a> {
    config: &'a PipelineConfig,
    manifest: ManifestStore,
    ledger: FailureLedger,
    processed_dir: PathBuf,
    renderer: OnceCell<Arc<dyn Renderer>>,
}

impl<'a> RenderInvoker<'a> {
    pub fn new(config: &'a PipelineConfig) -> Self {
        Self {
            config,
            manifest: ManifestStore::new(config.manifest_path()),
            ledger: FailureLedger::new(config.failure_ledger_path()),
            processed_dir: config.processed_dir(),
            renderer: OnceCell::new(),
        }
    }

    /// Render every eligible fragment in `fragment_dir`.
    ///
    /// `processed` is the manifest set loaded at startup; identifiers of
    /// newly recorded fragments are inserted into it as the run progresses.
    pub async fn process(
        &self,
        fragment_dir: &Path,
        processed: &mut HashSet<String>,
    ) -> Result<Vec<FragmentResult>, PipelineError> {
        let fragments = list_fragments(fragment_dir).await?;
        let total = fragments.len();
        info!(
            "Rendering {} fragments from {} ({} manifest entries)",
            total,
            fragment_dir.display(),
            processed.len()
        );

        tokio::fs::create_dir_all(&self.processed_dir)
            .await
            .map_err(|source| PipelineError::ArtifactWriteFailed {
                path: self.processed_dir.clone(),
                source,
            })?;

        let cb = self.config.progress_callback.as_ref();
        if let Some(cb) = cb {
            cb.on_render_start(total);
        }

        let mut results = Vec::with_capacity(total);
        for (index, fragment) in fragments.iter().enumerate() {
            let position = index + 1;
            let stdout_id = fragment.stdout_id();
            let stderr_id = fragment.stderr_id();

            if processed.contains(&stdout_id) || processed.contains(&stderr_id) {
                debug!("Fragment {} already processed, skipping", fragment.stem);
                if let Some(cb) = cb {
                    cb.on_fragment_skipped(&fragment.stem, position, total);
                }
                results.push(FragmentResult {
                    fragment: fragment.stem.clone(),
                    ordinal: fragment.ordinal,
                    status: FragmentStatus::Skipped,
                    stdout: stdout_id,
                    stderr: stderr_id,
                    exit_code: None,
                    duration_ms: 0,
                    recorded: true,
                    error: None,
                });
                continue;
            }

            if let Some(cb) = cb {
                cb.on_fragment_start(&fragment.stem, position, total);
            }
            let result = self.render_one(fragment, stdout_id, stderr_id, processed).await?;
            if let Some(cb) = cb {
                match &result.error {
                    None => cb.on_fragment_complete(&fragment.stem, position, total),
                    Some(e) => cb.on_fragment_error(&fragment.stem, position, total, &e.to_string()),
                }
            }
            results.push(result);
        }

        if let Some(cb) = cb {
            let rendered = results
                .iter()
                .filter(|r| r.status == FragmentStatus::Rendered)
                .count();
            let failed = results
                .iter()
                .filter(|r| r.status == FragmentStatus::Failed)
                .count();
            cb.on_render_complete(total, rendered, failed);
        }

        Ok(results)
    }

    /// Invoke, capture, and record a single fragment.
    async fn render_one(
        &self,
        fragment: &Fragment,
        stdout_id: String,
        stderr_id: String,
        processed: &mut HashSet<String>,
    ) -> Result<FragmentResult, PipelineError> {
        let renderer = self
            .renderer
            .get_or_try_init(|| resolve_renderer(self.config))?;
        let fragment_path =
            std::path::absolute(&fragment.path).unwrap_or_else(|_| fragment.path.clone());

        let start = Instant::now();
        let invocation = self.invoke_bounded(renderer.as_ref(), &fragment_path).await?;
        let duration_ms = start.elapsed().as_millis() as u64;

        let (output, error) = match invocation {
            Invocation::Finished(output) => {
                let error = match output.exit_code {
                    Some(0) => None,
                    Some(code) => Some(FragmentError::NonZeroExit {
                        fragment: fragment.stem.clone(),
                        code,
                    }),
                    None => Some(FragmentError::Terminated {
                        fragment: fragment.stem.clone(),
                    }),
                };
                (output, error)
            }
            // Nothing was collected from the killed child.
            Invocation::TimedOut => (
                RenderOutput::default(),
                Some(FragmentError::Timeout {
                    fragment: fragment.stem.clone(),
                    secs: self.config.render_timeout_secs,
                }),
            ),
        };

        self.write_artifact(&stdout_id, &output.stdout).await?;
        self.write_artifact(&stderr_id, &output.stderr).await?;

        let recorded =
            error.is_none() || self.config.failure_policy == FailurePolicy::RecordComplete;
        if recorded {
            self.manifest
                .append(&[stdout_id.as_str(), stderr_id.as_str()])
                .await?;
            processed.insert(stdout_id.clone());
            processed.insert(stderr_id.clone());
        }

        match &error {
            None => debug!(
                "Rendered {} with {} in {}ms",
                fragment.stem,
                renderer.name(),
                duration_ms
            ),
            Some(e) => {
                warn!("{}", e);
                self.ledger
                    .append(&FailureRecord::new(
                        &fragment.stem,
                        &stdout_id,
                        &stderr_id,
                        e.clone(),
                        recorded,
                    ))
                    .await?;
            }
        }

        Ok(FragmentResult {
            fragment: fragment.stem.clone(),
            ordinal: fragment.ordinal,
            status: if error.is_none() {
                FragmentStatus::Rendered
            } else {
                FragmentStatus::Failed
            },
            stdout: stdout_id,
            stderr: stderr_id,
            exit_code: output.exit_code,
            duration_ms,
            recorded,
            error,
        })
    }

    /// Call the renderer, giving up after `render_timeout_secs` (0 = never).
    async fn invoke_bounded(
        &self,
        renderer: &dyn Renderer,
        fragment_path: &Path,
    ) -> Result<Invocation, PipelineError> {
        let call = renderer.invoke(fragment_path, &self.config.format);
        let secs = self.config.render_timeout_secs;
        if secs == 0 {
            return call.await.map(Invocation::Finished);
        }
        match tokio::time::timeout(Duration::from_secs(secs), call).await {
            Ok(result) => result.map(Invocation::Finished),
            Err(_) => Ok(Invocation::TimedOut),
        }
    }

    async fn write_artifact(&self, id: &str, bytes: &[u8]) -> Result<(), PipelineError> {
        let path = self.processed_dir.join(id);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|source| PipelineError::ArtifactWriteFailed { path, source })
    }
}
