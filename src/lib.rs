//! # splitrender
//!
//! Split one large text document into ordered fragments with a regular
//! expression, then run every fragment through an external renderer
//! (`go-org render <fragment> org` by default), capturing its stdout and
//! stderr next to each other.
//!
//! ## Resumable by construction
//!
//! Runs are expected to be interrupted. Two guards make re-running safe:
//!
//! * the split phase is skipped as soon as `split/` holds any fragment, and
//! * every rendered fragment is appended to a manifest before the next one
//!   starts, so a re-run only renders what is missing.
//!
//! ## Pipeline Overview
//!
//! ```text
//! document.org
//!  │
//!  ├─ 1. Split   regex (multi-line) → split/000000001.txt …
//!  ├─ 2. Load    processed_files.txt → set of completed artifacts
//!  ├─ 3. Render  one fragment at a time → processed/<n>_stdout.txt, <n>_stderr.txt
//!  └─ 4. Record  append to the manifest (success) or failed_files.ndjson (failure)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use splitrender::{run, PipelineConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PipelineConfig::builder()
//!         .output_dir("output")
//!         .build()?;
//!     let output = run("notes.org", r"^\* ", &config).await?;
//!     eprintln!(
//!         "{} rendered, {} skipped, {} failed",
//!         output.stats.rendered, output.stats.skipped, output.stats.failed
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `splitrender` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod run;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{FailurePolicy, PipelineConfig, PipelineConfigBuilder};
pub use error::{FragmentError, PipelineError};
pub use output::{FragmentResult, FragmentStatus, PipelineOutput, RunStats};
pub use pipeline::renderer::{ExternalRenderer, RenderOutput, Renderer};
pub use pipeline::split::SplitCompletion;
pub use progress::{NoopProgressCallback, PipelineProgressCallback, ProgressCallback};
pub use run::{run, run_sync};
