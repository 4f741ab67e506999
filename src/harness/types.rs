// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Per-asset and per-run result types

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::path::PathBuf;
use std::time::Duration;

use crate::catalog::Asset;
use crate::compare::ComparisonVerdict;
use crate::config::RunMode;
use crate::error::HarnessError;
use crate::pipeline::ConversionMode;
use crate::results::{DiagnosticResult, RegressionVerdict};

// Custom serialization for Duration
fn serialize_duration<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_f64(duration.as_secs_f64())
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let secs = f64::deserialize(deserializer)?;
    Ok(Duration::from_secs_f64(secs))
}

/// Check status
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CaseStatus {
    Passed,
    Skipped,
    Cancelled,
    Failed,
    Error,
}

impl CaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaseStatus::Passed => "passed",
            CaseStatus::Skipped => "skipped",
            CaseStatus::Cancelled => "cancelled",
            CaseStatus::Failed => "failed",
            CaseStatus::Error => "error",
        }
    }

    /// Status for a check that stopped with `err`
    pub fn from_error(err: &HarnessError) -> Self {
        match err {
            HarnessError::Cancelled => CaseStatus::Cancelled,
            err if !err.is_hard_failure() => CaseStatus::Skipped,
            HarnessError::ToolTimeout { .. }
            | HarnessError::ExternalToolFailure { .. }
            | HarnessError::Io(_)
            | HarnessError::Json(_)
            | HarnessError::Zip(_) => CaseStatus::Error,
            _ => CaseStatus::Failed,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            CaseStatus::Failed | CaseStatus::Error | CaseStatus::Cancelled
        )
    }
}

/// One render pass and its golden-image comparison
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderCheck {
    pub mode: ConversionMode,
    pub status: CaseStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verdict: Option<ComparisonVerdict>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff_image: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl RenderCheck {
    pub fn new(mode: ConversionMode, status: CaseStatus) -> Self {
        Self {
            mode,
            status,
            image: None,
            verdict: None,
            diff_image: None,
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Schema-validator run and its regression gate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaCheck {
    pub status: CaseStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<DiagnosticResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verdict: Option<RegressionVerdict>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SchemaCheck {
    pub fn failed(status: CaseStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            result: None,
            verdict: None,
            message: Some(message.into()),
        }
    }
}

/// Everything that happened to one asset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseReport {
    pub asset: Asset,
    pub status: CaseStatus,
    #[serde(serialize_with = "serialize_duration", deserialize_with = "deserialize_duration")]
    pub duration: Duration,
    pub renders: Vec<RenderCheck>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<SchemaCheck>,
}

impl CaseReport {
    pub fn new(asset: Asset) -> Self {
        Self {
            asset,
            status: CaseStatus::Skipped,
            duration: Duration::ZERO,
            renders: Vec::new(),
            schema: None,
        }
    }

    pub fn cancelled(asset: Asset) -> Self {
        Self {
            status: CaseStatus::Cancelled,
            ..Self::new(asset)
        }
    }

    /// Worst status across all checks; a case with nothing but skips is skipped
    pub fn settle(&mut self) {
        let statuses = self
            .renders
            .iter()
            .map(|r| r.status)
            .chain(self.schema.iter().map(|s| s.status));

        self.status = statuses
            .filter(|s| *s != CaseStatus::Skipped)
            .max()
            .unwrap_or(CaseStatus::Skipped);
    }

    pub fn name(&self) -> String {
        self.asset.display_name()
    }
}

/// Complete run report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarnessReport {
    pub timestamp: String,
    pub mode: RunMode,
    pub platform: String,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub errors: usize,
    pub cancelled: usize,
    #[serde(serialize_with = "serialize_duration", deserialize_with = "deserialize_duration")]
    pub duration: Duration,
    pub cases: Vec<CaseReport>,
}

impl HarnessReport {
    pub fn new(mode: RunMode, platform: &str) -> Self {
        Self {
            timestamp: chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            mode,
            platform: platform.to_string(),
            total: 0,
            passed: 0,
            failed: 0,
            skipped: 0,
            errors: 0,
            cancelled: 0,
            duration: Duration::ZERO,
            cases: Vec::new(),
        }
    }

    pub fn add_case(&mut self, case: CaseReport) {
        self.total += 1;
        match case.status {
            CaseStatus::Passed => self.passed += 1,
            CaseStatus::Failed => self.failed += 1,
            CaseStatus::Skipped => self.skipped += 1,
            CaseStatus::Error => self.errors += 1,
            CaseStatus::Cancelled => self.cancelled += 1,
        }
        self.cases.push(case);
    }

    pub fn pass_rate(&self) -> f32 {
        if self.total == 0 {
            0.0
        } else {
            (self.passed as f32 / self.total as f32) * 100.0
        }
    }

    /// The run fails when any asset failed, errored or never ran
    pub fn has_failures(&self) -> bool {
        self.failed > 0 || self.errors > 0 || self.cancelled > 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &CaseReport> {
        self.cases.iter().filter(|c| c.status.is_failure())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset() -> Asset {
        Asset {
            family: "stl".to_string(),
            path: PathBuf::from("assets/stl/part.stl"),
            extension: ".stl".to_string(),
            relative_path: PathBuf::from("part.stl"),
        }
    }

    #[test]
    fn test_settle_takes_worst_status() {
        let mut case = CaseReport::new(asset());
        case.renders.push(RenderCheck::new(ConversionMode::Basic, CaseStatus::Passed));
        case.renders.push(RenderCheck::new(ConversionMode::Roundtrip, CaseStatus::Skipped));
        case.settle();
        assert_eq!(case.status, CaseStatus::Passed);

        case.schema = Some(SchemaCheck::failed(CaseStatus::Failed, "errors increased"));
        case.settle();
        assert_eq!(case.status, CaseStatus::Failed);
    }

    #[test]
    fn test_only_skips_is_skipped() {
        let mut case = CaseReport::new(asset());
        case.renders.push(RenderCheck::new(ConversionMode::Basic, CaseStatus::Skipped));
        case.settle();
        assert_eq!(case.status, CaseStatus::Skipped);
    }

    #[test]
    fn test_report_counts() {
        let mut report = HarnessReport::new(RunMode::Verify, "Linux");
        let mut ok = CaseReport::new(asset());
        ok.status = CaseStatus::Passed;
        report.add_case(ok);
        report.add_case(CaseReport::cancelled(asset()));

        assert_eq!(report.total, 2);
        assert_eq!(report.pass_rate(), 50.0);
        assert!(report.has_failures());
        assert_eq!(report.failures().count(), 1);

        let json = serde_json::to_string(&report).unwrap();
        let back: HarnessReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back.cancelled, 1);
    }
}
