//! Splitter: turn one source document into ordered fragment files.
//!
//! ## Atomic publication
//!
//! Every fragment is computed in memory before the first byte is written,
//! so a bad pattern or an oversized document fails without touching disk.
//! The files are then written into a hidden staging directory next to
//! `split/` and the staging directory is renamed into place. Because "any
//! fragment present" is what marks the split phase as done, a crash halfway
//! through writing must never leave a partially filled `split/` behind.
//!
//! ## Stale reuse
//!
//! When `split/` already holds fragments the phase is skipped without looking
//! at the document or the pattern. Re-running against the same output
//! directory with a different document silently reuses the old fragments;
//! start from a fresh output directory to re-split.

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::pipeline::fragment::{fragment_file_name, list_fragments, MAX_ORDINAL};
use crate::pipeline::input;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Outcome of the split phase, checked by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SplitCompletion {
    /// The document was split and `fragments` files were written.
    Performed { fragments: usize },
    /// Fragments already existed; nothing was read or written.
    AlreadySplit { existing: usize },
}

impl SplitCompletion {
    /// Number of fragments present after the phase.
    pub fn fragment_count(&self) -> usize {
        match self {
            SplitCompletion::Performed { fragments } => *fragments,
            SplitCompletion::AlreadySplit { existing } => *existing,
        }
    }

    pub fn was_skipped(&self) -> bool {
        matches!(self, SplitCompletion::AlreadySplit { .. })
    }
}

/// Compile a delimiter pattern with multi-line anchors.
pub fn compile_pattern(pattern: &str) -> Result<Regex, PipelineError> {
    RegexBuilder::new(pattern)
        .multi_line(true)
        .build()
        .map_err(|e| PipelineError::InvalidPattern {
            pattern: pattern.to_string(),
            detail: e.to_string(),
        })
}

/// Split `text` on `re` into trimmed, non-empty pieces in document order.
///
/// Text captured by groups in the pattern becomes a piece of its own, placed
/// between the text before and after the match.
pub fn split_text(text: &str, re: &Regex) -> Vec<String> {
    let mut pieces: Vec<&str> = Vec::new();
    let mut last = 0;

    for caps in re.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        pieces.push(&text[last..whole.start()]);
        pieces.extend(caps.iter().skip(1).flatten().map(|g| g.as_str()));
        last = whole.end();
    }
    pieces.push(&text[last..]);

    pieces
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Run the split phase for `source` unless fragments already exist.
pub async fn split_document(
    source: &Path,
    pattern: &str,
    config: &PipelineConfig,
) -> Result<SplitCompletion, PipelineError> {
    let split_dir = config.split_dir();

    let existing = list_fragments(&split_dir).await?.len();
    if existing > 0 {
        info!(
            "File already split ({} fragments in {}). Skipping splitting phase.",
            existing,
            split_dir.display()
        );
        return Ok(SplitCompletion::AlreadySplit { existing });
    }

    let re = compile_pattern(pattern)?;
    let text = input::read_source(source).await?;
    let pieces = split_text(&text, &re);
    if pieces.len() as u64 > MAX_ORDINAL {
        return Err(PipelineError::TooManyFragments {
            count: pieces.len(),
        });
    }
    info!(
        "Split {} into {} fragments on /{}/",
        source.display(),
        pieces.len(),
        pattern
    );

    write_fragments(&pieces, config).await?;
    Ok(SplitCompletion::Performed {
        fragments: pieces.len(),
    })
}

/// Write `pieces` as fragment files and publish them under `split/`.
async fn write_fragments(pieces: &[String], config: &PipelineConfig) -> Result<(), PipelineError> {
    let output_dir = config.output_dir();
    let split_dir = config.split_dir();
    tokio::fs::create_dir_all(output_dir)
        .await
        .map_err(write_err(output_dir))?;

    // Dropping the guard removes the staging directory on any early return.
    let staging = tempfile::Builder::new()
        .prefix(".split-")
        .tempdir_in(output_dir)
        .map_err(write_err(output_dir))?;

    for (index, piece) in pieces.iter().enumerate() {
        let path = staging.path().join(fragment_file_name(index as u64 + 1));
        tokio::fs::write(&path, piece.as_bytes())
            .await
            .map_err(write_err(&path))?;
        debug!("Staged fragment {} ({} bytes)", path.display(), piece.len());
    }

    // `rename` only replaces an empty directory, and not on every platform.
    if tokio::fs::metadata(&split_dir).await.is_ok()
        && tokio::fs::remove_dir(&split_dir).await.is_err()
    {
        warn!(
            "{} holds non-fragment entries; moving fragments in one by one",
            split_dir.display()
        );
        return move_each(staging.path(), &split_dir, pieces.len()).await;
    }

    tokio::fs::rename(staging.path(), &split_dir)
        .await
        .map_err(write_err(&split_dir))?;
    debug!("Published fragments to {}", split_dir.display());
    Ok(())
}

fn write_err(path: &Path) -> impl FnOnce(std::io::Error) -> PipelineError {
    let path = path.to_path_buf();
    move |source| PipelineError::FragmentWriteFailed { path, source }
}

/// Move staged fragments into an occupied `split/` one by one.
///
/// On failure every fragment already moved is removed again: a partial set
/// would otherwise mark the split as done on the next run.
async fn move_each(staging: &Path, split_dir: &Path, count: usize) -> Result<(), PipelineError> {
    let mut moved = Vec::with_capacity(count);
    for ordinal in 1..=count as u64 {
        let name = fragment_file_name(ordinal);
        let target = split_dir.join(&name);
        if let Err(e) = tokio::fs::rename(staging.join(&name), &target).await {
            rollback(&moved).await;
            return Err(write_err(&target)(e));
        }
        moved.push(target);
    }
    Ok(())
}

async fn rollback(moved: &[PathBuf]) {
    for path in moved {
        if let Err(e) = tokio::fs::remove_file(path).await {
            warn!("Could not remove partial fragment {}: {}", path.display(), e);
        }
    }
    if !moved.is_empty() {
        warn!("Removed {} partially published fragments", moved.len());
    }
}
