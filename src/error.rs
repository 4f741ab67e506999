// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Error kinds surfaced by the harness

use std::path::PathBuf;
use std::time::Duration;

pub type HarnessResult<T> = Result<T, HarnessError>;

#[derive(thiserror::Error, Debug)]
pub enum HarnessError {
    #[error("image could not be decoded: {path}: {reason}")]
    AssetUnreadable { path: PathBuf, reason: String },

    #[error("image dimensions differ: {left:?} vs {right:?}")]
    DimensionMismatch {
        left: (u32, u32, u8),
        right: (u32, u32, u8),
    },

    #[error("conversion failed for {path}")]
    ConversionFailure { path: PathBuf },

    #[error("{tool} failed ({status}): {stderr}")]
    ExternalToolFailure {
        tool: String,
        status: String,
        stderr: String,
    },

    #[error("{tool} timed out after {after:?}")]
    ToolTimeout { tool: String, after: Duration },

    #[error("run cancelled")]
    Cancelled,

    #[error("no baseline for {key}")]
    BaselineMissing { key: String },

    #[error("results document {path} is corrupt: {reason}")]
    ResultsDocumentCorrupt { path: PathBuf, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),
}

impl HarnessError {
    /// Whether this failure should trip fail-fast cancellation.
    pub fn is_hard_failure(&self) -> bool {
        !matches!(
            self,
            HarnessError::BaselineMissing { .. }
                | HarnessError::ResultsDocumentCorrupt { .. }
                | HarnessError::Cancelled
        )
    }
}

impl From<crate::tools::ToolError> for HarnessError {
    fn from(err: crate::tools::ToolError) -> Self {
        use crate::tools::ToolError;
        match err {
            ToolError::Timeout { tool, after } => HarnessError::ToolTimeout { tool, after },
            ToolError::Cancelled { .. } => HarnessError::Cancelled,
            ToolError::Spawn { tool, source } => HarnessError::ExternalToolFailure {
                tool,
                status: "spawn failed".to_string(),
                stderr: source.to_string(),
            },
            ToolError::Wait { tool, source } => HarnessError::ExternalToolFailure {
                tool,
                status: "wait failed".to_string(),
                stderr: source.to_string(),
            },
            ToolError::Exit {
                tool,
                status,
                stderr,
            } => HarnessError::ExternalToolFailure {
                tool,
                status,
                stderr,
            },
            ToolError::MissingOutput { tool, path } => HarnessError::ExternalToolFailure {
                tool,
                status: "no output".to_string(),
                stderr: format!("expected output not produced: {}", path.display()),
            },
            ToolError::StaleOutput { tool, path, source } => HarnessError::ExternalToolFailure {
                tool,
                status: "stale output".to_string(),
                stderr: format!("{}: {}", path.display(), source),
            },
        }
    }
}
