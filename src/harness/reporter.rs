// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Run report writers

use anyhow::{Context, Result};
use colored::Colorize;
use std::fs;
use std::path::Path;

use super::types::{CaseReport, CaseStatus, HarnessReport};
use crate::compare::ComparisonVerdict;
use crate::results::RegressionVerdict;

pub struct HarnessReporter;

impl HarnessReporter {
    /// Write JSON report
    pub fn write_json(report: &HarnessReport, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        ensure_parent(path)?;
        let json = serde_json::to_string_pretty(report)?;
        fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    /// Write Markdown report
    pub fn write_markdown(report: &HarnessReport, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        ensure_parent(path)?;
        fs::write(path, Self::markdown(report))
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    pub fn markdown(report: &HarnessReport) -> String {
        let mut md = String::new();

        md.push_str("# File Format Plugin Regression Report\n\n");
        md.push_str(&format!("**Generated:** {}\n\n", report.timestamp));
        md.push_str(&format!("**Mode:** {}\n\n", report.mode.as_str()));
        md.push_str(&format!("**Platform:** {}\n\n", report.platform));
        md.push_str("---\n\n");

        md.push_str("## Summary\n\n");
        md.push_str(&format!("- **Total Assets:** {}\n", report.total));
        md.push_str(&format!("- **Passed:** {} ({:.1}%)\n", report.passed, report.pass_rate()));
        md.push_str(&format!("- **Failed:** {}\n", report.failed));
        md.push_str(&format!("- **Errors:** {}\n", report.errors));
        md.push_str(&format!("- **Skipped:** {}\n", report.skipped));
        md.push_str(&format!("- **Cancelled:** {}\n", report.cancelled));
        md.push_str(&format!("- **Total Duration:** {:.2}s\n\n", report.duration.as_secs_f64()));
        md.push_str("---\n\n");

        md.push_str("## Assets\n\n");
        md.push_str("| Asset | Status | Basic | Round trip | Schema |\n");
        md.push_str("|-------|--------|-------|------------|--------|\n");
        for case in &report.cases {
            let render = |i: usize| {
                case.renders
                    .get(i)
                    .map(|r| render_cell(r.status, r.verdict.as_ref()))
                    .unwrap_or_else(|| "-".to_string())
            };
            let schema = case
                .schema
                .as_ref()
                .map(|s| schema_cell(s.status, s.verdict.as_ref()))
                .unwrap_or_else(|| "-".to_string());
            md.push_str(&format!(
                "| `{}` | {} | {} | {} | {} |\n",
                case.name(),
                case.status.as_str(),
                render(0),
                render(1),
                schema
            ));
        }
        md.push('\n');

        let failures: Vec<&CaseReport> = report.failures().collect();
        if !failures.is_empty() {
            md.push_str("## Failures\n\n");
            for case in failures {
                md.push_str(&format!("- `{}`\n", case.name()));
                for message in case_messages(case) {
                    md.push_str(&format!("  - {}\n", message));
                }
                for render in &case.renders {
                    if let Some(ref diff) = render.diff_image {
                        md.push_str(&format!("  - Diff image: `{}`\n", diff.display()));
                    }
                }
            }
            md.push('\n');
        }

        md
    }

    /// Print terminal summary
    pub fn print_summary(report: &HarnessReport) {
        println!("\n{}", "═".repeat(80).white());
        println!("{}", "File Format Plugin Regression".bold());
        println!("{}", "═".repeat(80).white());
        println!("  {} {}", "Timestamp:".white(), report.timestamp.cyan());
        println!("  {} {}", "Mode:".white(), report.mode.as_str().cyan());
        println!("  {} {}", "Platform:".white(), report.platform.cyan());
        println!("  {} {}", "Total Assets:".white(), report.total.to_string().cyan());
        println!(
            "  {} {} ({:.1}%)",
            "Passed:".white(),
            report.passed.to_string().green(),
            report.pass_rate()
        );
        println!("  {} {}", "Failed:".white(), colour_count(report.failed));
        println!("  {} {}", "Errors:".white(), colour_count(report.errors));
        println!("  {} {}", "Skipped:".white(), report.skipped.to_string().yellow());
        println!("  {} {}", "Cancelled:".white(), colour_count(report.cancelled));
        println!(
            "  {} {:.2}s",
            "Duration:".white(),
            report.duration.as_secs_f64()
        );

        if report.has_failures() {
            println!("\n{}", "Failed Assets".red().bold());
            println!("{}", "─".repeat(80).white());
            for case in report.failures() {
                println!("\n  {} {}", "✗".red(), case.name().bold());
                println!("     {}: {}", "Status".white(), case.status.as_str());
                for message in case_messages(case) {
                    println!("     {}", message.white());
                }
            }
        }

        println!("{}", "═".repeat(80).white());
        if report.has_failures() {
            println!("{}", "FAILED".red().bold());
        } else {
            println!("{}", "PASSED".green().bold());
        }
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

fn colour_count(n: usize) -> colored::ColoredString {
    if n > 0 {
        n.to_string().red()
    } else {
        n.to_string().white()
    }
}

fn render_cell(status: CaseStatus, verdict: Option<&ComparisonVerdict>) -> String {
    match verdict.and_then(|v| v.similarity_ratio()) {
        Some(ratio) => format!("{} ({:.4})", status.as_str(), ratio),
        None => status.as_str().to_string(),
    }
}

fn schema_cell(status: CaseStatus, verdict: Option<&RegressionVerdict>) -> String {
    match verdict {
        Some(RegressionVerdict::Pass { errors_delta, .. })
        | Some(RegressionVerdict::Fail { errors_delta, .. }) => {
            format!("{} (errors {:+})", status.as_str(), errors_delta)
        }
        _ => status.as_str().to_string(),
    }
}

/// One line per failing check
fn case_messages(case: &CaseReport) -> Vec<String> {
    let mut messages = Vec::new();
    for render in &case.renders {
        if !render.status.is_failure() {
            continue;
        }
        let detail = match (&render.message, render.verdict.as_ref()) {
            (Some(message), _) => message.clone(),
            (None, Some(ComparisonVerdict::Compared { similarity_ratio, .. })) => {
                format!("similarity {:.4} below threshold", similarity_ratio)
            }
            (None, Some(ComparisonVerdict::Failed { reason })) => format!("{:?}", reason),
            (None, None) => render.status.as_str().to_string(),
        };
        messages.push(format!("{}: {}", render.mode.as_str(), detail));
    }
    if let Some(ref schema) = case.schema {
        if schema.status.is_failure() {
            let detail = schema
                .message
                .clone()
                .unwrap_or_else(|| schema.status.as_str().to_string());
            messages.push(format!("schema: {}", detail));
        }
    }
    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Asset;
    use crate::config::RunMode;
    use crate::harness::types::{RenderCheck, SchemaCheck};
    use crate::pipeline::ConversionMode;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn failing_report() -> HarnessReport {
        let asset = Asset {
            family: "fbx".to_string(),
            path: PathBuf::from("assets/fbx/rig.fbx"),
            extension: ".fbx".to_string(),
            relative_path: PathBuf::from("rig.fbx"),
        };
        let mut case = CaseReport::new(asset);
        let mut basic = RenderCheck::new(ConversionMode::Basic, CaseStatus::Failed);
        basic.verdict = Some(ComparisonVerdict::Compared {
            similarity_ratio: 0.5,
            pass: false,
        });
        case.renders.push(basic);
        case.renders.push(RenderCheck::new(ConversionMode::Roundtrip, CaseStatus::Passed));
        case.schema = Some(SchemaCheck::failed(CaseStatus::Error, "usdchecker timed out"));
        case.settle();

        let mut report = HarnessReport::new(RunMode::Verify, "Linux");
        report.add_case(case);
        report
    }

    #[test]
    fn test_markdown_lists_failures() {
        let md = HarnessReporter::markdown(&failing_report());
        assert!(md.contains("| `fbx/rig.fbx` | error | failed (0.5000) | passed | error |"));
        assert!(md.contains("## Failures"));
        assert!(md.contains("basic: similarity 0.5000 below threshold"));
        assert!(md.contains("schema: usdchecker timed out"));
    }

    #[test]
    fn test_write_reports() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let report = failing_report();
        let json = temp_dir.path().join("out/verify_report.json");
        HarnessReporter::write_json(&report, &json)?;
        HarnessReporter::write_markdown(&report, temp_dir.path().join("out/verify_report.md"))?;

        let back: HarnessReport = serde_json::from_str(&fs::read_to_string(json)?)?;
        assert_eq!(back.errors, 1);
        Ok(())
    }
}
