// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Basic and round-trip conversion passes

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use super::layout::ArtifactPaths;
use crate::catalog::Asset;
use crate::config::{HarnessConfig, RunMode};
use crate::error::{HarnessError, HarnessResult};
use crate::tools::{ToolError, Toolchain};

/// Which pass an asset goes through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionMode {
    /// Render the original asset
    Basic,
    /// Re-export through the scene toolkit, then render the re-exported file
    Roundtrip,
}

impl ConversionMode {
    pub const ALL: [ConversionMode; 2] = [ConversionMode::Basic, ConversionMode::Roundtrip];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConversionMode::Basic => "basic",
            ConversionMode::Roundtrip => "roundtrip",
        }
    }
}

/// Files produced by one pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionOutcome {
    pub asset: Asset,
    pub mode: ConversionMode,
    pub rendered_image: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub converted_asset: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ConversionStatus {
    Rendered(ConversionOutcome),
    Skipped { reason: String },
}

/// Drives the external toolchain for one run mode
pub struct ConversionPipeline<'a> {
    config: &'a HarnessConfig,
    toolchain: &'a dyn Toolchain,
    mode: RunMode,
}

impl<'a> ConversionPipeline<'a> {
    pub fn new(config: &'a HarnessConfig, toolchain: &'a dyn Toolchain, mode: RunMode) -> Self {
        Self {
            config,
            toolchain,
            mode,
        }
    }

    pub fn paths(&self, asset: &Asset) -> ArtifactPaths {
        ArtifactPaths::new(self.config, asset, self.mode)
    }

    /// Run one pass for `asset`
    pub fn run(&self, asset: &Asset, mode: ConversionMode) -> HarnessResult<ConversionStatus> {
        match mode {
            ConversionMode::Basic => self.basic(asset).map(ConversionStatus::Rendered),
            ConversionMode::Roundtrip => self.roundtrip(asset),
        }
    }

    fn basic(&self, asset: &Asset) -> HarnessResult<ConversionOutcome> {
        let paths = self.paths(asset);
        fs::create_dir_all(&paths.output_dir)?;

        self.toolchain.render(&asset.path, &paths.render)?;

        Ok(ConversionOutcome {
            asset: asset.clone(),
            mode: ConversionMode::Basic,
            rendered_image: paths.render,
            converted_asset: None,
        })
    }

    fn roundtrip(&self, asset: &Asset) -> HarnessResult<ConversionStatus> {
        let roundtrip = self
            .config
            .family(&asset.family)
            .map(|f| f.roundtrip)
            .unwrap_or(true);
        if !roundtrip {
            tracing::info!(asset = %asset.display_name(), "round trip not supported for family");
            return Ok(ConversionStatus::Skipped {
                reason: format!("{} round trip is not supported", asset.family),
            });
        }

        let paths = self.paths(asset);
        fs::create_dir_all(&paths.output_dir)?;

        self.try_convert(&asset.path, &paths.roundtrip_asset)?;
        self.toolchain
            .render(&paths.roundtrip_asset, &paths.roundtrip_render)?;

        Ok(ConversionStatus::Rendered(ConversionOutcome {
            asset: asset.clone(),
            mode: ConversionMode::Roundtrip,
            rendered_image: paths.roundtrip_render,
            converted_asset: Some(paths.roundtrip_asset),
        }))
    }

    /// Open `input` through the scene toolkit and export it to `output`.
    /// Returns false when the toolkit could not produce a stage.
    pub fn convert(&self, input: &Path, output: &Path) -> bool {
        match self.try_convert(input, output) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(input = %input.display(), error = %err, "conversion failed");
                false
            }
        }
    }

    /// Like [`convert`](Self::convert) but keeps timeouts and cancellation distinct
    pub fn try_convert(&self, input: &Path, output: &Path) -> HarnessResult<()> {
        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent)?;
        }

        match self.toolchain.export(input, output) {
            Ok(()) => Ok(()),
            Err(err @ (ToolError::Timeout { .. } | ToolError::Cancelled { .. })) => Err(err.into()),
            Err(err) => {
                tracing::debug!(input = %input.display(), error = %err, "export failed");
                Err(HarnessError::ConversionFailure {
                    path: input.to_path_buf(),
                })
            }
        }
    }

    /// Export `asset` to its `_usdchecked.usd` sibling for the schema validator
    pub fn convert_for_check(&self, asset: &Asset) -> HarnessResult<PathBuf> {
        let paths = self.paths(asset);
        self.try_convert(&asset.path, &paths.checked_asset)?;
        Ok(paths.checked_asset)
    }
}
