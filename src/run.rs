//! Pipeline controller: split (unless already done), then render.
//!
//! ```text
//! Start ──▶ fragments present? ──yes──▶ Render ──▶ Done
//!                  │                      ▲
//!                  no ──▶ Split ──────────┘
//! ```
//!
//! There is no retry loop. A failed or interrupted run is recovered by
//! running it again: the split phase is skipped once fragments exist, and
//! every fragment already in the manifest is skipped by the render phase.

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::output::{PipelineOutput, RunStats};
use crate::pipeline::invoke::RenderInvoker;
use crate::pipeline::manifest::ManifestStore;
use crate::pipeline::split::{self, SplitCompletion};
use std::path::Path;
use std::time::Instant;
use tracing::info;

/// Split `source` on `pattern` and render every fragment.
///
/// # Errors
/// Returns `Err(PipelineError)` only for fatal errors:
/// - Source document missing or unreadable
/// - Delimiter pattern does not compile
/// - Output directory not writable
/// - Renderer cannot be launched
///
/// A fragment whose renderer ran but failed is reported in
/// `output.fragments` and `output.stats.failed`, not as an error.
pub async fn run(
    source: impl AsRef<Path>,
    pattern: &str,
    config: &PipelineConfig,
) -> Result<PipelineOutput, PipelineError> {
    let total_start = Instant::now();
    let source = source.as_ref();
    info!(
        "Starting pipeline: {} → {}",
        source.display(),
        config.output_dir().display()
    );

    // ── Phase 1: Split ───────────────────────────────────────────────────
    let split_start = Instant::now();
    let split = split::split_document(source, pattern, config).await?;
    let split_duration_ms = split_start.elapsed().as_millis() as u64;

    if let Some(ref cb) = config.progress_callback {
        match split {
            SplitCompletion::AlreadySplit { existing } => cb.on_split_skipped(existing),
            SplitCompletion::Performed { fragments } => cb.on_split_complete(fragments),
        }
    }

    // ── Phase 2: Render ──────────────────────────────────────────────────
    let render_start = Instant::now();
    let mut processed = ManifestStore::new(config.manifest_path()).load().await?;
    let fragments = RenderInvoker::new(config)
        .process(&config.split_dir(), &mut processed)
        .await?;
    let render_duration_ms = render_start.elapsed().as_millis() as u64;

    let stats = RunStats {
        split_duration_ms,
        render_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        ..RunStats::tally(&fragments)
    };

    info!(
        "Pipeline complete: {} rendered, {} skipped, {} failed of {} fragments in {}ms",
        stats.rendered, stats.skipped, stats.failed, stats.total_fragments, stats.total_duration_ms
    );

    Ok(PipelineOutput {
        split,
        fragments,
        stats,
    })
}

/// Synchronous wrapper around [`run`].
///
/// Creates a temporary tokio runtime internally.
pub fn run_sync(
    source: impl AsRef<Path>,
    pattern: &str,
    config: &PipelineConfig,
) -> Result<PipelineOutput, PipelineError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| PipelineError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(run(source, pattern, config))
}
