// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Subprocess execution with timeout and cooperative cancellation

use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Failure of a single external tool invocation
#[derive(thiserror::Error, Debug)]
pub enum ToolError {
    #[error("failed to launch {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} exited with {status}: {stderr}")]
    Exit {
        tool: String,
        status: String,
        stderr: String,
    },

    #[error("lost track of {tool}: {source}")]
    Wait {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} timed out after {after:?}")]
    Timeout { tool: String, after: Duration },

    #[error("{tool} cancelled")]
    Cancelled { tool: String },

    #[error("{tool} produced no output at {path}")]
    MissingOutput { tool: String, path: PathBuf },

    #[error("could not clear previous output {path} for {tool}: {source}")]
    StaleOutput {
        tool: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Captured result of a finished tool
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn status_str(&self) -> String {
        match self.exit_code {
            Some(code) => format!("exit code {}", code),
            None => "signal".to_string(),
        }
    }

    pub fn is_silent(&self) -> bool {
        self.stdout.trim().is_empty() && self.stderr.trim().is_empty()
    }
}

/// Shared flag checked between and during tool invocations
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Runs external programs and captures their output
#[derive(Debug, Clone, Default)]
pub struct ToolRunner {
    timeout: Option<Duration>,
    cancel: CancelFlag,
}

impl ToolRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Run `program` with `args`, blocking until it exits, times out or is cancelled
    pub fn run<I, S>(&self, program: &str, args: I) -> Result<ToolOutput, ToolError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        if self.cancel.is_cancelled() {
            return Err(ToolError::Cancelled {
                tool: program.to_string(),
            });
        }

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ToolError::Spawn {
                tool: program.to_string(),
                source,
            })?;

        // Drain both pipes concurrently so a chatty tool cannot block on a full pipe.
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let start = Instant::now();
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {}
                Err(source) => {
                    let _ = child.kill();
                    return Err(ToolError::Wait {
                        tool: program.to_string(),
                        source,
                    })
                }
            }

            if self.cancel.is_cancelled() {
                let _ = child.kill();
                let _ = child.wait();
                return Err(ToolError::Cancelled {
                    tool: program.to_string(),
                });
            }

            if let Some(timeout) = self.timeout {
                if start.elapsed() >= timeout {
                    let _ = child.kill();
                    let _ = child.wait();
                    tracing::error!(tool = program, ?timeout, "external tool timed out");
                    return Err(ToolError::Timeout {
                        tool: program.to_string(),
                        after: timeout,
                    });
                }
            }

            thread::sleep(POLL_INTERVAL);
        };

        let output = ToolOutput {
            success: status.success(),
            exit_code: status.code(),
            stdout: collect(stdout),
            stderr: collect(stderr),
        };

        tracing::debug!(
            tool = program,
            status = %output.status_str(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "external tool finished"
        );

        Ok(output)
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<Vec<u8>>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            buf
        })
    })
}

fn collect(handle: Option<JoinHandle<Vec<u8>>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_captures_both_streams() {
        let output = ToolRunner::new()
            .run("sh", ["-c", "printf 'out\\n'; printf 'err\\n' >&2; exit 3"])
            .unwrap();

        assert!(!output.success);
        assert_eq!(output.exit_code, Some(3));
        assert_eq!(output.stdout, "out\n");
        assert_eq!(output.stderr, "err\n");
    }

    #[test]
    fn test_arguments_are_not_shell_interpreted() {
        let output = ToolRunner::new()
            .run("printf", ["%s", "$(echo injected); rm -rf nothing"])
            .unwrap();
        assert_eq!(output.stdout, "$(echo injected); rm -rf nothing");
    }

    #[test]
    fn test_timeout_is_distinct() {
        let err = ToolRunner::new()
            .with_timeout(Some(Duration::from_millis(100)))
            .run("sleep", ["5"])
            .unwrap_err();
        assert!(matches!(err, ToolError::Timeout { .. }));
    }

    #[test]
    fn test_cancelled_before_start() {
        let cancel = CancelFlag::new();
        cancel.cancel();
        let err = ToolRunner::new()
            .with_cancel(cancel)
            .run("true", Vec::<&str>::new())
            .unwrap_err();
        assert!(matches!(err, ToolError::Cancelled { .. }));
    }

    #[test]
    fn test_missing_program() {
        let err = ToolRunner::new()
            .run("definitely-not-a-real-tool-xyz", ["a"])
            .unwrap_err();
        assert!(matches!(err, ToolError::Spawn { .. }));
    }
}
