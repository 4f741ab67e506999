// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Asset discovery

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::family::{FamilyFilter, PluginFamily};
use crate::config::HarnessConfig;

/// A test asset found under `assets/<family>/`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Asset {
    pub family: String,
    pub path: PathBuf,
    /// Extension from the family table that selected this file
    pub extension: String,
    /// Path relative to the family's asset folder
    pub relative_path: PathBuf,
}

impl Asset {
    /// File name without the selecting extension
    pub fn stem(&self) -> String {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        name.strip_suffix(self.extension.as_str())
            .map(str::to_string)
            .unwrap_or(name)
    }

    /// Stem used for every output this asset produces
    ///
    /// When a sibling file shares the stem under another of the family's
    /// `extensions` (`truck.glb` beside `truck.gltf`), the extension is folded
    /// into the stem (`truck_glb`) so neither outputs nor diagnostics keys overlap.
    pub fn output_stem(&self, extensions: &[String]) -> String {
        let stem = self.stem();
        let shared = extensions
            .iter()
            .filter(|ext| **ext != self.extension)
            .any(|ext| self.path.with_file_name(format!("{}{}", stem, ext)).is_file());

        if shared {
            format!("{}_{}", stem, self.extension.trim_start_matches('.'))
        } else {
            stem
        }
    }

    /// Directory of the asset relative to the family folder (empty at top level)
    pub fn relative_dir(&self) -> &Path {
        self.relative_path.parent().unwrap_or_else(|| Path::new(""))
    }

    pub fn display_name(&self) -> String {
        format!("{}/{}", self.family, self.relative_path.display())
    }
}

/// Enumerates test assets per plugin family
pub struct AssetCatalog;

impl AssetCatalog {
    /// Scan every configured family, honouring the caller's extension filter
    pub fn discover(config: &HarnessConfig, filter: &FamilyFilter) -> Vec<Asset> {
        let assets: Vec<Asset> = config
            .families
            .iter()
            .map(|family| filter.narrow(family))
            .flat_map(|family| Self::scan_family(&config.family_assets_dir(&family.name), &family))
            .collect();

        for pair in Self::stem_collisions(&assets) {
            tracing::debug!(
                first = %pair.0.display_name(),
                second = %pair.1.display_name(),
                "shared stem, outputs qualified by extension"
            );
        }
        assets
    }

    /// Pairs of assets in one folder whose stems match
    pub fn stem_collisions(assets: &[Asset]) -> Vec<(&Asset, &Asset)> {
        let mut seen: HashMap<(&str, &Path, String), &Asset> = HashMap::new();
        let mut collisions = Vec::new();
        for asset in assets {
            let key = (asset.family.as_str(), asset.relative_dir(), asset.stem());
            if let Some(first) = seen.insert(key, asset) {
                collisions.push((first, asset));
            }
        }
        collisions
    }

    /// Recursively collect files under `dir` accepted by `family`
    ///
    /// A missing directory yields no assets. Results are sorted by path so the
    /// case table is stable across platforms.
    pub fn scan_family(dir: &Path, family: &PluginFamily) -> Vec<Asset> {
        if !dir.is_dir() || family.extensions.is_empty() {
            return Vec::new();
        }

        let mut assets: Vec<Asset> = WalkDir::new(dir)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter_map(|entry| {
                let name = entry.file_name().to_string_lossy();
                let extension = family
                    .extensions
                    .iter()
                    .find(|ext| name.ends_with(ext.as_str()))?
                    .clone();
                let path = entry.path().to_path_buf();
                let relative_path = path.strip_prefix(dir).ok()?.to_path_buf();

                Some(Asset {
                    family: family.name.clone(),
                    path,
                    extension,
                    relative_path,
                })
            })
            .collect();

        assets.sort();
        assets
    }
}
