//! CLI binary for splitrender.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `PipelineConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use splitrender::{
    run, FailurePolicy, PipelineConfig, PipelineProgressCallback, ProgressCallback,
};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a spinner while splitting, then a bar that
/// advances once per fragment (rendered, skipped or failed).
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Splitting");
        bar.set_message("Reading document…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }

    /// Switch to the full progress-bar style once we know `total`.
    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} fragments  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Rendering");
        self.bar.reset_eta();
    }
}

impl PipelineProgressCallback for CliProgressCallback {
    fn on_split_skipped(&self, existing_fragments: usize) {
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!(
                "File already split ({existing_fragments} fragments). Skipping splitting phase."
            ))
        ));
    }

    fn on_split_complete(&self, fragments: usize) {
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Split into {fragments} fragments"))
        ));
    }

    fn on_render_start(&self, total: usize) {
        self.activate_bar(total);
    }

    fn on_fragment_skipped(&self, _name: &str, _position: usize, _total: usize) {
        self.bar.inc(1);
    }

    fn on_fragment_start(&self, name: &str, _position: usize, _total: usize) {
        self.bar.set_message(name.to_string());
    }

    fn on_fragment_complete(&self, _name: &str, _position: usize, _total: usize) {
        self.bar.inc(1);
    }

    fn on_fragment_error(&self, name: &str, position: usize, total: usize, error: &str) {
        self.bar.println(format!(
            "  {} {} {:>3}/{:<3}  {}",
            red("✗"),
            name,
            position,
            total,
            red(error),
        ));
        self.bar.inc(1);
    }

    fn on_render_complete(&self, _total: usize, _rendered: usize, _failed: usize) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Split an org file on top-level headings and render each one
  splitrender notes.org '^\* '

  # Custom output directory and renderer
  splitrender book.txt '^%%$' -o build --renderer /opt/bin/go-org --format html

  # Resume an interrupted run: just run the same command again
  splitrender notes.org '^\* '

  # Give each render at most 30 seconds
  splitrender notes.org '^\* ' --render-timeout 30

  # Machine-readable summary
  splitrender notes.org '^\* ' --json > run.json

OUTPUT LAYOUT:
  <output_dir>/split/000000001.txt …        one file per fragment
  <output_dir>/processed/<n>_stdout.txt      captured renderer stdout
  <output_dir>/processed/<n>_stderr.txt      captured renderer stderr
  <output_dir>/processed_files.txt           manifest of completed artifacts
  <output_dir>/failed_files.ndjson           renders that did not succeed

  Delete processed_files.txt to render everything again.
  Delete split/ to split again (e.g. with a new pattern).

ENVIRONMENT VARIABLES:
  RUST_LOG                 Override log filtering (e.g. splitrender=debug)
  SPLITRENDER_RENDERER     Renderer executable (default: go-org)
  SPLITRENDER_FORMAT       Format token passed to the renderer (default: org)
"#;

/// Split a document by regex and render each fragment with an external tool.
#[derive(Parser, Debug)]
#[command(
    name = "splitrender",
    version,
    about = "Split a document by regex and render each fragment with an external tool",
    long_about = "Split a large text document into fragments on a multi-line regular expression, \
then run every fragment through an external renderer, capturing its stdout and stderr. \
Interrupted runs resume where they stopped.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Source document to split.
    input_file: PathBuf,

    /// Delimiter regex; `^` and `$` match at every line.
    regex_pattern: String,

    /// Base directory for split/, processed/ and the manifest.
    #[arg(short, long, alias = "output_dir", env = "SPLITRENDER_OUTPUT_DIR", default_value = "output")]
    output_dir: PathBuf,

    /// Renderer executable, looked up on PATH.
    #[arg(long, env = "SPLITRENDER_RENDERER", default_value = "go-org")]
    renderer: String,

    /// Sub-command passed to the renderer before the fragment path.
    #[arg(long, env = "SPLITRENDER_RENDER_COMMAND", default_value = "render")]
    render_command: String,

    /// Target-format token passed to the renderer after the fragment path.
    #[arg(long, env = "SPLITRENDER_FORMAT", default_value = "org")]
    format: String,

    /// Seconds to wait for one render before killing it (0 = wait forever).
    #[arg(long, env = "SPLITRENDER_RENDER_TIMEOUT", default_value_t = 300)]
    render_timeout: u64,

    /// Record failed renders in the manifest anyway (they will not be retried).
    #[arg(long, env = "SPLITRENDER_RECORD_FAILURES_AS_COMPLETE")]
    record_failures_as_complete: bool,

    /// Print the run summary as JSON on stdout.
    #[arg(long, env = "SPLITRENDER_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "SPLITRENDER_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "SPLITRENDER_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "SPLITRENDER_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO-level library logs.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn PipelineProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;

    // ── Run pipeline ─────────────────────────────────────────────────────
    let output = run(&cli.input_file, &cli.regex_pattern, &config)
        .await
        .context("Pipeline failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    }

    if !cli.quiet {
        let stats = &output.stats;
        eprintln!(
            "{}  {} rendered  {} skipped  {} failed  of {}  {}ms",
            if stats.failed == 0 {
                green("✔")
            } else {
                cyan("⚠")
            },
            bold(&stats.rendered.to_string()),
            stats.skipped,
            if stats.failed == 0 {
                stats.failed.to_string()
            } else {
                red(&stats.failed.to_string())
            },
            stats.total_fragments,
            stats.total_duration_ms,
        );
        if stats.failed > 0 {
            eprintln!(
                "   {}",
                dim(&format!(
                    "details in {}",
                    config.failure_ledger_path().display()
                ))
            );
        }
    }

    output.into_result().context("Some fragments failed")?;
    Ok(())
}

/// Map CLI args to `PipelineConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<PipelineConfig> {
    let policy = if cli.record_failures_as_complete {
        FailurePolicy::RecordComplete
    } else {
        FailurePolicy::Retry
    };

    let mut builder = PipelineConfig::builder()
        .output_dir(&cli.output_dir)
        .renderer_program(&cli.renderer)
        .render_command(&cli.render_command)
        .format(&cli.format)
        .render_timeout_secs(cli.render_timeout)
        .failure_policy(policy);

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
