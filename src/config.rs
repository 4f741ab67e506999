// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Harness configuration
//!
//! A single [`HarnessConfig`] is built at startup (file, then environment, then
//! command line) and passed by reference to every component.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::catalog::PluginFamily;

/// Default config file looked up in the working directory
pub const CONFIG_FILE: &str = "harness.toml";

/// Which side of the baseline a run writes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Populate baseline artifacts
    Generate,
    /// Compare the current build against stored baselines
    Verify,
}

impl RunMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunMode::Generate => "generate",
            RunMode::Verify => "verify",
        }
    }
}

/// External programs driven by the harness
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolPaths {
    /// Renderer producing a raster image from a scene file
    pub renderer: String,
    /// Scene toolkit command that opens a layer and writes it back out
    pub exporter: String,
    /// Schema validator
    pub validator: String,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            renderer: "usdrecord".to_string(),
            exporter: "usdcat".to_string(),
            validator: "usdchecker".to_string(),
        }
    }
}

/// Process-wide harness configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Directory holding the assets/baseline/output trees
    pub root: PathBuf,
    pub assets_dir: String,
    pub baseline_dir: String,
    pub output_dir: String,
    /// Platform namespace for baselines and outputs
    pub platform: String,
    /// Plugin families under test
    pub families: Vec<PluginFamily>,
    /// Restricts every family's extensions to this set when non-empty
    pub extension_filter: Vec<String>,
    /// Minimum similarity ratio for an image comparison to pass
    pub similarity_threshold: f64,
    pub render_extension: String,
    pub roundtrip_suffix: String,
    pub checked_suffix: String,
    pub results_file: String,
    pub tools: ToolPaths,
    /// Per-invocation timeout for external tools, in seconds
    pub tool_timeout_secs: Option<u64>,
    /// Maximum parallel workers (None = one per core)
    pub parallelism: Option<usize>,
    /// Cancel outstanding work on the first hard failure
    pub fail_fast: bool,
    /// Write a highlighted diff image next to failing renders
    pub write_diff_images: bool,
    pub verbose: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            assets_dir: "assets".to_string(),
            baseline_dir: "baseline".to_string(),
            output_dir: "output".to_string(),
            platform: host_platform().to_string(),
            families: PluginFamily::defaults(),
            extension_filter: Vec::new(),
            similarity_threshold: crate::compare::DEFAULT_THRESHOLD,
            render_extension: ".jpg".to_string(),
            roundtrip_suffix: "_roundtrip".to_string(),
            checked_suffix: "_usdchecked".to_string(),
            results_file: "usd_checker_results.json".to_string(),
            tools: ToolPaths::default(),
            tool_timeout_secs: Some(600),
            parallelism: None,
            fail_fast: false,
            write_diff_images: false,
            verbose: false,
        }
    }
}

impl HarnessConfig {
    /// Load configuration from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        let config: HarnessConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path.as_ref()))?;
        Ok(config)
    }

    /// Load `harness.toml` if present, then apply environment overrides
    pub fn load() -> Result<Self> {
        let mut config = if PathBuf::from(CONFIG_FILE).exists() {
            Self::from_file(CONFIG_FILE)?
        } else {
            Self::default()
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply environment overrides through a lookup function
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(root) = lookup("USDRECORD_ROOT") {
            self.tools.renderer = Path::new(&root)
                .join("usdrecord")
                .to_string_lossy()
                .into_owned();
        }

        if let Some(parallelism) = lookup("HARNESS_PARALLELISM") {
            self.parallelism = parallelism.parse().ok();
        }

        if let Some(timeout) = lookup("HARNESS_TIMEOUT_SECS") {
            self.tool_timeout_secs = timeout.parse().ok().filter(|secs| *secs > 0);
        }

        if let Some(verbose) = lookup("HARNESS_VERBOSE") {
            self.verbose = verbose.parse().unwrap_or(false);
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path.as_ref(), content)
            .with_context(|| format!("Failed to write config file: {:?}", path.as_ref()))?;
        Ok(())
    }

    pub fn tool_timeout(&self) -> Option<Duration> {
        self.tool_timeout_secs.map(Duration::from_secs)
    }

    pub fn family(&self, name: &str) -> Option<&PluginFamily> {
        self.families.iter().find(|f| f.name == name)
    }

    /// `assets/<family>`
    pub fn family_assets_dir(&self, family: &str) -> PathBuf {
        self.root.join(&self.assets_dir).join(family)
    }

    /// `baseline/<platform>`
    pub fn baseline_platform_dir(&self) -> PathBuf {
        self.root.join(&self.baseline_dir).join(&self.platform)
    }

    /// `baseline/<platform>/<family>`
    pub fn family_baseline_dir(&self, family: &str) -> PathBuf {
        self.baseline_platform_dir().join(family)
    }

    /// `output/<platform>` when verifying, `output/baseline/<platform>` when generating
    pub fn output_platform_dir(&self, mode: RunMode) -> PathBuf {
        let output = self.root.join(&self.output_dir);
        match mode {
            RunMode::Generate => output.join(&self.baseline_dir).join(&self.platform),
            RunMode::Verify => output.join(&self.platform),
        }
    }

    pub fn family_output_dir(&self, family: &str, mode: RunMode) -> PathBuf {
        self.output_platform_dir(mode).join(family)
    }

    /// Where a run writes its diagnostics document
    pub fn results_document(&self, family: &str, mode: RunMode) -> PathBuf {
        match mode {
            RunMode::Generate => self.baseline_document(family),
            RunMode::Verify => self.family_output_dir(family, mode).join(&self.results_file),
        }
    }

    /// The stored baseline diagnostics document
    pub fn baseline_document(&self, family: &str) -> PathBuf {
        self.family_baseline_dir(family).join(&self.results_file)
    }

    /// `<platform>_baseline_images.zip`
    pub fn images_archive(&self) -> PathBuf {
        self.root
            .join(format!("{}_baseline_images.zip", self.platform))
    }

    /// `<platform>_usd_checker_results.zip`
    pub fn results_archive(&self) -> PathBuf {
        self.root
            .join(format!("{}_usd_checker_results.zip", self.platform))
    }
}

/// Host OS name in the capitalised form used for baseline folders
pub fn host_platform() -> &'static str {
    match std::env::consts::OS {
        "linux" => "Linux",
        "macos" => "Darwin",
        "windows" => "Windows",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_layout() {
        let config = HarnessConfig {
            root: PathBuf::from("/work"),
            platform: "Linux".to_string(),
            ..Default::default()
        };

        assert_eq!(
            config.family_output_dir("fbx", RunMode::Verify),
            PathBuf::from("/work/output/Linux/fbx")
        );
        assert_eq!(
            config.family_output_dir("fbx", RunMode::Generate),
            PathBuf::from("/work/output/baseline/Linux/fbx")
        );
        assert_eq!(
            config.results_document("obj", RunMode::Generate),
            PathBuf::from("/work/baseline/Linux/obj/usd_checker_results.json")
        );
        assert_eq!(
            config.images_archive(),
            PathBuf::from("/work/Linux_baseline_images.zip")
        );
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("USDRECORD_ROOT", "/opt/usd/bin"),
            ("HARNESS_PARALLELISM", "3"),
            ("HARNESS_TIMEOUT_SECS", "0"),
        ]
        .into_iter()
        .collect();

        let mut config = HarnessConfig::default();
        config.apply_env(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(
            PathBuf::from(&config.tools.renderer),
            PathBuf::from("/opt/usd/bin").join("usdrecord")
        );
        assert_eq!(config.parallelism, Some(3));
        assert_eq!(config.tool_timeout(), None);
    }

    #[test]
    fn test_toml_roundtrip_keeps_families() -> Result<()> {
        let temp_dir = tempfile::TempDir::new()?;
        let path = temp_dir.path().join(CONFIG_FILE);

        let mut config = HarnessConfig::default();
        config.similarity_threshold = 0.9;
        config.save(&path)?;

        let loaded = HarnessConfig::from_file(&path)?;
        assert_eq!(loaded.similarity_threshold, 0.9);
        assert_eq!(loaded.families.len(), config.families.len());
        assert!(loaded.family("sbsar").is_some_and(|f| !f.roundtrip));
        Ok(())
    }
}
