// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Deterministic artifact paths
//!
//! Outputs mirror the asset's position under `assets/<family>/`, namespaced by
//! platform and family. Paths are keyed by the asset's output stem, which is
//! qualified by extension when siblings share a stem.

use std::path::PathBuf;

use crate::catalog::Asset;
use crate::config::{HarnessConfig, RunMode};

/// Every file one asset produces or is compared against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub output_dir: PathBuf,
    pub render: PathBuf,
    pub roundtrip_asset: PathBuf,
    pub roundtrip_render: PathBuf,
    pub checked_asset: PathBuf,
    pub baseline_render: PathBuf,
    pub baseline_roundtrip_render: PathBuf,
}

impl ArtifactPaths {
    pub fn new(config: &HarnessConfig, asset: &Asset, mode: RunMode) -> Self {
        let rel = asset.relative_dir();
        let output_dir = config.family_output_dir(&asset.family, mode).join(rel);
        let baseline_dir = config.family_baseline_dir(&asset.family).join(rel);

        let extensions = config
            .family(&asset.family)
            .map(|f| f.extensions.as_slice())
            .unwrap_or(&[]);
        let stem = asset.output_stem(extensions);
        let roundtrip_stem = format!("{}{}", stem, config.roundtrip_suffix);
        let image = |name: &str| format!("{}{}", name, config.render_extension);

        Self {
            render: output_dir.join(image(&stem)),
            roundtrip_asset: output_dir.join(format!("{}{}", roundtrip_stem, asset.extension)),
            roundtrip_render: output_dir.join(image(&roundtrip_stem)),
            checked_asset: output_dir.join(format!("{}{}.usd", stem, config.checked_suffix)),
            baseline_render: baseline_dir.join(image(&stem)),
            baseline_roundtrip_render: baseline_dir.join(image(&roundtrip_stem)),
            output_dir,
        }
    }

    /// `<image stem>_diff.png` beside a current render
    pub fn diff_image_for(render: &std::path::Path) -> PathBuf {
        let stem = render
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        render.with_file_name(format!("{}_diff.png", stem))
    }
}
