//! Sphinx invocation.

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, info, trace, warn};

use omnivook_shared::{OmnivookError, Result};

use crate::driver::DocumentBuilder;

/// Runs `sphinx-build` (or a compatible command) against the source tree.
///
/// Environment variables given with [`SphinxBuilder::env`] are passed to the
/// child process only; the parent environment is never modified.
#[derive(Debug, Clone)]
pub struct SphinxBuilder {
    cmd: String,
    target: String,
    envs: Vec<(String, String)>,
}

impl SphinxBuilder {
    pub fn new(cmd: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            cmd: cmd.into(),
            target: target.into(),
            envs: Vec::new(),
        }
    }

    /// Add an environment variable for the builder process.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    /// Directory the artifact for `source_dir` is written to.
    pub fn output_dir(&self, source_dir: &Path) -> PathBuf {
        source_dir.join("_build").join(&self.target)
    }
}

impl DocumentBuilder for SphinxBuilder {
    fn build(&self, source_dir: &Path) -> Result<String> {
        let out_dir = self.output_dir(source_dir);
        info!(cmd = %self.cmd, target = %self.target, out = %out_dir.display(), "invoking builder");

        let output = Command::new(&self.cmd)
            .arg("--keep-going")
            .arg("-Eab")
            .arg(&self.target)
            .arg(source_dir)
            .arg(&out_dir)
            .envs(self.envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .output()
            .map_err(|e| {
                OmnivookError::Build(format!(
                    "failed to run `{}`: {e}. Is it installed?",
                    self.cmd
                ))
            })?;

        for line in String::from_utf8_lossy(&output.stdout).lines() {
            trace!(target: "omnivook_builder::sphinx::stdout", "{line}");
        }

        // Exit status does not change how the output is treated; only the
        // parsed warnings drive the repair loop.
        if !output.status.success() {
            warn!(status = ?output.status.code(), "builder exited unsuccessfully");
        }

        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        debug!(bytes = stderr.len(), "builder diagnostics captured");
        Ok(stderr)
    }
}
