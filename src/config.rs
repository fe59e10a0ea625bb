//! Configuration types for a split-and-render run.
//!
//! All pipeline behaviour is controlled through [`PipelineConfig`], built via
//! its [`PipelineConfigBuilder`]. The config is constructed once per run and
//! handed to every component; every on-disk location is derived from
//! `output_dir` by the accessor methods below, so two configs pointing at two
//! directories never share state.

use crate::error::PipelineError;
use crate::pipeline::renderer::Renderer;
use crate::progress::ProgressCallback;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Name of the directory holding fragment files.
pub const SPLIT_DIR_NAME: &str = "split";
/// Name of the directory holding captured renderer output.
pub const PROCESSED_DIR_NAME: &str = "processed";
/// Name of the manifest file (one completed artifact identifier per line).
pub const MANIFEST_FILE_NAME: &str = "processed_files.txt";
/// Name of the NDJSON failure ledger.
pub const FAILURE_LEDGER_FILE_NAME: &str = "failed_files.ndjson";

/// Configuration for one pipeline run.
///
/// Built via [`PipelineConfig::builder()`] or using
/// [`PipelineConfig::default()`].
///
/// # Example
/// ```rust
/// use splitrender::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .output_dir("out")
///     .renderer_program("go-org")
///     .format("html")
///     .render_timeout_secs(60)
///     .build()
///     .unwrap();
/// assert_eq!(config.split_dir(), std::path::Path::new("out/split"));
/// ```
#[derive(Clone)]
pub struct PipelineConfig {
    /// Base directory for `split/`, `processed/`, the manifest and the
    /// failure ledger. Default: `output`.
    pub output_dir: PathBuf,

    /// Renderer executable, looked up on `PATH` unless it contains a path
    /// separator. Default: `go-org`.
    pub renderer_program: String,

    /// Sub-command passed as the first renderer argument. Default: `render`.
    pub render_command: String,

    /// Target-format token passed after the fragment path. Default: `org`.
    pub format: String,

    /// Per-invocation timeout in seconds; `0` waits forever. Default: 300.
    ///
    /// A hung renderer would otherwise stall the whole run. On expiry the
    /// child is killed and the fragment is recorded as failed.
    pub render_timeout_secs: u64,

    /// What to do with a fragment whose render did not succeed.
    pub failure_policy: FailurePolicy,

    /// Pre-constructed renderer. Takes precedence over `renderer_program`.
    pub renderer: Option<Arc<dyn Renderer>>,

    /// Optional per-fragment progress callback.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            renderer_program: "go-org".to_string(),
            render_command: "render".to_string(),
            format: "org".to_string(),
            render_timeout_secs: 300,
            failure_policy: FailurePolicy::default(),
            renderer: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("output_dir", &self.output_dir)
            .field("renderer_program", &self.renderer_program)
            .field("render_command", &self.render_command)
            .field("format", &self.format)
            .field("render_timeout_secs", &self.render_timeout_secs)
            .field("failure_policy", &self.failure_policy)
            .field("renderer", &self.renderer.as_ref().map(|_| "<dyn Renderer>"))
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn PipelineProgressCallback>"),
            )
            .finish()
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }

    /// `<output_dir>/split`
    pub fn split_dir(&self) -> PathBuf {
        self.output_dir.join(SPLIT_DIR_NAME)
    }

    /// `<output_dir>/processed`
    pub fn processed_dir(&self) -> PathBuf {
        self.output_dir.join(PROCESSED_DIR_NAME)
    }

    /// `<output_dir>/processed_files.txt`
    pub fn manifest_path(&self) -> PathBuf {
        self.output_dir.join(MANIFEST_FILE_NAME)
    }

    /// `<output_dir>/failed_files.ndjson`
    pub fn failure_ledger_path(&self) -> PathBuf {
        self.output_dir.join(FAILURE_LEDGER_FILE_NAME)
    }

    /// The output directory as given.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn renderer_program(mut self, program: impl Into<String>) -> Self {
        self.config.renderer_program = program.into();
        self
    }

    pub fn render_command(mut self, command: impl Into<String>) -> Self {
        self.config.render_command = command.into();
        self
    }

    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.config.format = format.into();
        self
    }

    pub fn render_timeout_secs(mut self, secs: u64) -> Self {
        self.config.render_timeout_secs = secs;
        self
    }

    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.config.failure_policy = policy;
        self
    }

    pub fn renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.config.renderer = Some(renderer);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PipelineConfig, PipelineError> {
        let c = &self.config;
        if c.output_dir.as_os_str().is_empty() {
            return Err(PipelineError::InvalidConfig(
                "Output directory must not be empty".into(),
            ));
        }
        if c.renderer.is_none() && c.renderer_program.trim().is_empty() {
            return Err(PipelineError::InvalidConfig(
                "Renderer program must not be empty".into(),
            ));
        }
        if c.format.trim().is_empty() {
            return Err(PipelineError::InvalidConfig(
                "Format token must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

/// How a fragment whose render did not succeed is treated.
///
/// Either way both artifacts are written and a line is appended to the
/// failure ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Leave the fragment out of the manifest so the next run retries it. (default)
    #[default]
    Retry,
    /// Record the artifact pair as complete regardless of exit status.
    RecordComplete,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_layout() {
        let config = PipelineConfig::default();
        assert_eq!(config.split_dir(), PathBuf::from("output/split"));
        assert_eq!(config.processed_dir(), PathBuf::from("output/processed"));
        assert_eq!(
            config.manifest_path(),
            PathBuf::from("output/processed_files.txt")
        );
        assert_eq!(
            config.failure_ledger_path(),
            PathBuf::from("output/failed_files.ndjson")
        );
        assert_eq!(config.renderer_program, "go-org");
        assert_eq!(config.render_command, "render");
        assert_eq!(config.format, "org");
        assert_eq!(config.failure_policy, FailurePolicy::Retry);
    }

    #[test]
    fn builder_rejects_empty_format() {
        let err = PipelineConfig::builder().format("  ").build().unwrap_err();
        assert!(matches!(err, PipelineError::InvalidConfig(_)));
    }

    #[test]
    fn builder_rejects_empty_output_dir() {
        let err = PipelineConfig::builder().output_dir("").build().unwrap_err();
        assert!(err.to_string().contains("Output directory"));
    }

    #[test]
    fn debug_hides_trait_objects() {
        let s = format!("{:?}", PipelineConfig::default());
        assert!(s.contains("renderer_program"));
        assert!(s.contains("None"));
    }
}
