//! Headless renderer subprocess
//!
//! Runs an external program that loads a page, executes its scripts and dumps
//! the resulting DOM to a file. The snapshot engine reads that file in place of
//! the raw document.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;

use crate::config::RenderConfig;

/// Errors from the renderer subprocess
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Failed to start renderer '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Renderer '{program}' exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: std::process::ExitStatus,
        stderr: String,
    },

    #[error("Renderer did not produce {}: {source}", .path.display())]
    MissingOutput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Wraps a [`RenderConfig`] and runs it on demand
#[derive(Debug, Clone)]
pub struct HeadlessRenderer {
    config: RenderConfig,
}

impl HeadlessRenderer {
    #[must_use]
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    /// File the rendered document is written to
    #[must_use]
    pub fn dump_file(&self) -> &Path {
        &self.config.dump_file
    }

    /// Render `input` and return the dumped document text
    ///
    /// The program is invoked as `<program> [args...] <input> <dump_file>` and
    /// must exit successfully.
    pub async fn render(&self, input: &str) -> Result<String, RenderError> {
        let program = &self.config.program;
        log::info!("Rendering {input} with {program}");

        let output = Command::new(program)
            .args(&self.config.args)
            .arg(input)
            .arg(&self.config.dump_file)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| RenderError::Spawn {
                program: program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(RenderError::Failed {
                program: program.clone(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        if !output.stdout.is_empty() {
            log::debug!("{program}: {}", String::from_utf8_lossy(&output.stdout).trim());
        }

        tokio::fs::read_to_string(&self.config.dump_file)
            .await
            .map_err(|source| RenderError::MissingOutput {
                path: self.config.dump_file.clone(),
                source,
            })
    }
}
