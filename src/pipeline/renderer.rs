//! Renderer capability: turn one fragment file into two byte streams.
//!
//! [`Renderer`] is the seam between the pipeline and whatever does the
//! actual conversion. The default [`ExternalRenderer`] launches a program
//! found on `PATH` as `<program> <command> <fragment-path> <format>` and
//! captures its stdout and stderr. Tests and embedders can supply their own
//! implementation through [`crate::config::PipelineConfigBuilder::renderer`].

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;
use tracing::debug;

/// Everything a renderer produced for one fragment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// Process exit code; `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
}

impl RenderOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Something that can render a fragment file into a target format.
///
/// Returning `Err` means the renderer could not run at all and aborts the
/// whole pipeline. A renderer that ran and failed reports it through
/// [`RenderOutput::exit_code`] instead.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Short name used in log lines.
    fn name(&self) -> &str;

    async fn invoke(&self, fragment: &Path, format: &str) -> Result<RenderOutput, PipelineError>;
}

/// Renderer backed by an external executable.
#[derive(Debug, Clone)]
pub struct ExternalRenderer {
    name: String,
    program: PathBuf,
    command: String,
}

impl ExternalRenderer {
    /// Locate `program` on `PATH` (or as given, when it contains a path
    /// separator) and bind it to the sub-command `command`.
    pub fn resolve(program: &str, command: impl Into<String>) -> Result<Self, PipelineError> {
        let resolved = which::which(program).map_err(|e| PipelineError::RendererUnavailable {
            program: program.to_string(),
            detail: e.to_string(),
        })?;
        debug!("Resolved renderer {} → {}", program, resolved.display());
        Ok(Self {
            name: program.to_string(),
            program: resolved,
            command: command.into(),
        })
    }

    /// Full path of the executable that will be launched.
    pub fn program(&self) -> &Path {
        &self.program
    }
}

#[async_trait]
impl Renderer for ExternalRenderer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(&self, fragment: &Path, format: &str) -> Result<RenderOutput, PipelineError> {
        // kill_on_drop: a caller-side timeout drops this future and must not
        // leave the child running.
        let output = Command::new(&self.program)
            .arg(&self.command)
            .arg(fragment)
            .arg(format)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| PipelineError::RendererUnavailable {
                program: self.program.display().to_string(),
                detail: e.to_string(),
            })?;

        Ok(RenderOutput {
            stdout: output.stdout,
            stderr: output.stderr,
            exit_code: output.status.code(),
        })
    }
}

/// Pick the renderer for a run: the injected one, else the configured program.
pub fn resolve_renderer(config: &PipelineConfig) -> Result<Arc<dyn Renderer>, PipelineError> {
    if let Some(ref renderer) = config.renderer {
        return Ok(Arc::clone(renderer));
    }
    let external = ExternalRenderer::resolve(&config.renderer_program, &config.render_command)?;
    Ok(Arc::new(external))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_program_is_unavailable() {
        let err = ExternalRenderer::resolve("splitrender-no-such-renderer-xyz", "render")
            .unwrap_err();
        assert!(
            matches!(err, PipelineError::RendererUnavailable { ref program, .. } if program == "splitrender-no-such-renderer-xyz"),
            "got: {err:?}"
        );
    }

    #[test]
    fn injected_renderer_takes_precedence() {
        struct Fixed;

        #[async_trait]
        impl Renderer for Fixed {
            fn name(&self) -> &str {
                "fixed"
            }

            async fn invoke(&self, _: &Path, _: &str) -> Result<RenderOutput, PipelineError> {
                Ok(RenderOutput::default())
            }
        }

        let config = PipelineConfig::builder()
            .renderer_program("splitrender-no-such-renderer-xyz")
            .renderer(Arc::new(Fixed))
            .build()
            .unwrap();
        assert_eq!(resolve_renderer(&config).unwrap().name(), "fixed");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn external_renderer_passes_command_path_and_format() {
        let echo = ExternalRenderer::resolve("echo", "render").unwrap();
        let out = echo
            .invoke(Path::new("/tmp/000000001.txt"), "org")
            .await
            .unwrap();
        assert!(out.success());
        assert_eq!(
            String::from_utf8(out.stdout).unwrap(),
            "render /tmp/000000001.txt org\n"
        );
        assert!(out.stderr.is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn external_renderer_reports_non_zero_exit() {
        let failing = ExternalRenderer::resolve("false", "render").unwrap();
        let out = failing
            .invoke(Path::new("/tmp/000000001.txt"), "org")
            .await
            .unwrap();
        assert!(!out.success());
        assert_eq!(out.exit_code, Some(1));
    }
}
