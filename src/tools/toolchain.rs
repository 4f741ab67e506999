// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! The three external collaborators the harness drives

use std::ffi::OsStr;
use std::path::Path;

use super::process::{CancelFlag, ToolError, ToolOutput, ToolRunner};
use crate::config::{HarnessConfig, ToolPaths};

/// Renderer, scene exporter and schema validator
///
/// The command-line implementation is [`CommandToolchain`]; tests substitute
/// an in-process fake.
pub trait Toolchain: Send + Sync {
    /// Rasterize `input` to the image file `output`
    fn render(&self, input: &Path, output: &Path) -> Result<(), ToolError>;

    /// Open `input` through the scene toolkit and write its root layer to `output`
    fn export(&self, input: &Path, output: &Path) -> Result<(), ToolError>;

    /// Run the schema validator on `input` and capture its diagnostics
    fn validate(&self, input: &Path) -> Result<ToolOutput, ToolError>;
}

/// Toolchain backed by `usdrecord`, `usdcat` and `usdchecker` (or configured replacements)
#[derive(Debug, Clone)]
pub struct CommandToolchain {
    tools: ToolPaths,
    runner: ToolRunner,
}

impl CommandToolchain {
    pub fn new(tools: ToolPaths, runner: ToolRunner) -> Self {
        Self { tools, runner }
    }

    pub fn from_config(config: &HarnessConfig, cancel: CancelFlag) -> Self {
        let runner = ToolRunner::new()
            .with_timeout(config.tool_timeout())
            .with_cancel(cancel);
        Self::new(config.tools.clone(), runner)
    }

    /// Run a tool that must exit cleanly and leave a non-empty file behind
    fn run_producing(
        &self,
        program: &str,
        args: &[&OsStr],
        output: &Path,
    ) -> Result<(), ToolError> {
        // A file left by an earlier run must not pass for this run's output.
        match std::fs::remove_file(output) {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(source) => {
                return Err(ToolError::StaleOutput {
                    tool: program.to_string(),
                    path: output.to_path_buf(),
                    source,
                })
            }
        }

        let result = self.runner.run(program, args)?;

        if !result.success {
            return Err(ToolError::Exit {
                tool: program.to_string(),
                status: result.status_str(),
                stderr: result.stderr.trim().to_string(),
            });
        }

        let produced = std::fs::metadata(output)
            .map(|m| m.is_file() && m.len() > 0)
            .unwrap_or(false);
        if !produced {
            return Err(ToolError::MissingOutput {
                tool: program.to_string(),
                path: output.to_path_buf(),
            });
        }

        Ok(())
    }
}

impl Toolchain for CommandToolchain {
    fn render(&self, input: &Path, output: &Path) -> Result<(), ToolError> {
        tracing::info!(input = %input.display(), output = %output.display(), "rendering");
        self.run_producing(
            &self.tools.renderer,
            &[input.as_os_str(), output.as_os_str()],
            output,
        )
    }

    fn export(&self, input: &Path, output: &Path) -> Result<(), ToolError> {
        tracing::info!(input = %input.display(), output = %output.display(), "exporting");
        self.run_producing(
            &self.tools.exporter,
            &[input.as_os_str(), OsStr::new("-o"), output.as_os_str()],
            output,
        )
    }

    fn validate(&self, input: &Path) -> Result<ToolOutput, ToolError> {
        tracing::info!(input = %input.display(), "running schema validator");
        let output = self.runner.run(&self.tools.validator, [input.as_os_str()])?;

        // A failing check still prints diagnostics; silence means the validator itself broke.
        if output.is_silent() {
            return Err(ToolError::Exit {
                tool: self.tools.validator.clone(),
                status: output.status_str(),
                stderr: "validator produced no output".to_string(),
            });
        }

        Ok(output)
    }
}
