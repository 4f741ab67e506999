// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! File format plugin regression harness CLI

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use fileformat_harness::{
    CancelFlag, CommandToolchain, FamilyFilter, Harness, HarnessConfig, HarnessReport,
    HarnessReporter, RunMode,
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fileformat-harness")]
#[command(about = "Render, round-trip and schema-check regression tests for USD file-format plugins", long_about = None)]
struct Cli {
    /// Record baseline images and diagnostics instead of verifying against them
    #[arg(long = "generate-baseline", alias = "generate_baseline")]
    generate_baseline: bool,

    /// Only test assets with these extensions (e.g. --extensions .fbx .glb)
    #[arg(long, num_args = 1.., value_delimiter = ',')]
    extensions: Vec<String>,

    /// Config file (defaults to harness.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Test tree root containing assets/, baseline/ and output/
    #[arg(long)]
    root: Option<PathBuf>,

    /// Platform folder name under baseline/ and output/
    #[arg(long)]
    platform: Option<String>,

    /// Minimum similarity ratio for an image comparison to pass
    #[arg(long)]
    threshold: Option<f64>,

    /// Worker threads (defaults to one per core)
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Per-invocation tool timeout in seconds, 0 disables it
    #[arg(long)]
    timeout: Option<u64>,

    /// Cancel remaining assets after the first failure
    #[arg(long)]
    fail_fast: bool,

    /// Write a diff image next to every failing render
    #[arg(long)]
    diff_images: bool,

    /// Print the case table and exit
    #[arg(long)]
    list: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match cli.config {
        Some(ref path) => {
            let mut config = HarnessConfig::from_file(path)?;
            config.apply_env(|key| std::env::var(key).ok());
            config
        }
        None => HarnessConfig::load()?,
    };
    apply_cli(&mut config, &cli);

    let default_level = if config.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    let mode = if cli.generate_baseline {
        RunMode::Generate
    } else {
        RunMode::Verify
    };
    let filter = FamilyFilter::new(&config.extension_filter);

    let cancel = CancelFlag::new();
    let toolchain = CommandToolchain::from_config(&config, cancel.clone());
    let harness = Harness::new(&config, &toolchain, cancel);

    if cli.list {
        let cases = harness.cases(&filter);
        for asset in &cases {
            println!("{}", asset.display_name());
        }
        println!("\n{} {}", cases.len().to_string().cyan(), "assets".white());
        return Ok(());
    }

    let report = harness.run(mode, &filter)?;

    let report_dir = config.root.join(&config.output_dir);
    let stem = format!("{}_{}_report", config.platform, mode.as_str());
    HarnessReporter::write_json(&report, report_dir.join(format!("{}.json", stem)))?;
    HarnessReporter::write_markdown(&report, report_dir.join(format!("{}.md", stem)))?;
    HarnessReporter::print_summary(&report);

    let code = exit_code(&report);
    if code != 0 {
        std::process::exit(code);
    }

    Ok(())
}

/// 1 when any asset failed, errored or was cancelled
fn exit_code(report: &HarnessReport) -> i32 {
    if report.has_failures() {
        1
    } else {
        0
    }
}

/// Command-line flags override file and environment settings
fn apply_cli(config: &mut HarnessConfig, cli: &Cli) {
    if let Some(ref root) = cli.root {
        config.root = root.clone();
    }
    if let Some(ref platform) = cli.platform {
        config.platform = platform.clone();
    }
    if !cli.extensions.is_empty() {
        config.extension_filter = cli.extensions.clone();
    }
    if let Some(threshold) = cli.threshold {
        config.similarity_threshold = threshold;
    }
    if let Some(jobs) = cli.jobs {
        config.parallelism = Some(jobs);
    }
    if let Some(timeout) = cli.timeout {
        config.tool_timeout_secs = Some(timeout).filter(|secs| *secs > 0);
    }
    config.fail_fast |= cli.fail_fast;
    config.write_diff_images |= cli.diff_images;
    config.verbose |= cli.verbose;
}

#[cfg(test)]
mod tests {
    use super::*;
    use fileformat_harness::harness::{CaseReport, CaseStatus};
    use fileformat_harness::Asset;

    fn configured(args: &[&str]) -> HarnessConfig {
        let cli = Cli::parse_from(std::iter::once("fileformat-harness").chain(args.iter().copied()));
        let mut config = HarnessConfig::default();
        apply_cli(&mut config, &cli);
        config
    }

    #[test]
    fn test_flags_override_config() {
        let config = configured(&[
            "--extensions",
            ".glb,.fbx",
            "--jobs",
            "3",
            "--platform",
            "Windows",
            "--threshold",
            "0.9",
            "--fail-fast",
        ]);

        assert_eq!(config.extension_filter, vec![".glb", ".fbx"]);
        assert_eq!(config.parallelism, Some(3));
        assert_eq!(config.platform, "Windows");
        assert_eq!(config.similarity_threshold, 0.9);
        assert!(config.fail_fast);
        assert!(!config.write_diff_images);
    }

    #[test]
    fn test_zero_timeout_disables_it() {
        assert_eq!(configured(&["--timeout", "0"]).tool_timeout_secs, None);
        assert_eq!(configured(&["--timeout", "30"]).tool_timeout_secs, Some(30));
        assert_eq!(
            configured(&[]).tool_timeout_secs,
            HarnessConfig::default().tool_timeout_secs
        );
    }

    #[test]
    fn test_generate_flag_spellings() {
        assert!(Cli::parse_from(["fileformat-harness", "--generate-baseline"]).generate_baseline);
        assert!(Cli::parse_from(["fileformat-harness", "--generate_baseline"]).generate_baseline);
        assert!(!Cli::parse_from(["fileformat-harness"]).generate_baseline);
    }

    #[test]
    fn test_exit_code_follows_failures() {
        let asset = Asset {
            family: "obj".to_string(),
            path: PathBuf::from("assets/obj/box.obj"),
            extension: ".obj".to_string(),
            relative_path: PathBuf::from("box.obj"),
        };
        let mut report = HarnessReport::new(RunMode::Verify, "Linux");
        let mut skipped = CaseReport::new(asset.clone());
        skipped.status = CaseStatus::Skipped;
        report.add_case(skipped);
        assert_eq!(exit_code(&report), 0);

        report.add_case(CaseReport::cancelled(asset));
        assert_eq!(exit_code(&report), 1);
    }
}
