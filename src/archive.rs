// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Baseline pruning and packaging

use anyhow::{bail, Context, Result};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::config::RunMode;

/// Prunes baseline trees and packs them for distribution
pub struct BaselineArchiver {
    mode: RunMode,
}

impl BaselineArchiver {
    pub fn new(mode: RunMode) -> Self {
        Self { mode }
    }

    /// Delete every file under `root` whose name does not end with one of `keep`.
    /// Only allowed while generating baselines. Returns the number of files removed.
    pub fn prune(&self, root: &Path, keep: &[&str]) -> Result<usize> {
        if self.mode != RunMode::Generate {
            bail!("refusing to prune {} outside baseline generation", root.display());
        }

        let doomed: Vec<PathBuf> = matching_files(root, |name| !ends_with_any(name, keep));
        for path in &doomed {
            fs::remove_file(path)
                .with_context(|| format!("Failed to remove {}", path.display()))?;
        }

        tracing::info!(root = %root.display(), removed = doomed.len(), "pruned baseline tree");
        Ok(doomed.len())
    }

    /// Copy files under `source` matching `include` into the same relative
    /// location under `dest`. Returns the number of files copied.
    pub fn install(&self, source: &Path, dest: &Path, include: &[&str]) -> Result<usize> {
        if self.mode != RunMode::Generate {
            bail!("refusing to overwrite {} outside baseline generation", dest.display());
        }

        let files = matching_files(source, |name| ends_with_any(name, include));
        for path in &files {
            let rel = path.strip_prefix(source).unwrap_or(path);
            let target = dest.join(rel);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(path, &target).with_context(|| {
                format!("Failed to copy {} to {}", path.display(), target.display())
            })?;
        }

        tracing::info!(
            source = %source.display(),
            dest = %dest.display(),
            copied = files.len(),
            "installed baseline files"
        );
        Ok(files.len())
    }

    /// Zip files under `root` matching `include`, stored relative to `root`'s parent
    /// so extraction recreates a directory named after `root`. Returns the entry count.
    pub fn archive(&self, root: &Path, include: &[&str], archive: &Path) -> Result<usize> {
        let base = root.parent().unwrap_or_else(|| Path::new(""));
        let archive_abs = fs::canonicalize(archive).ok();

        let mut files = matching_files(root, |name| ends_with_any(name, include));
        if let Some(abs) = &archive_abs {
            // Re-archiving into the same tree must not swallow the previous archive.
            files.retain(|p| fs::canonicalize(p).ok().as_ref() != Some(abs));
        }
        files.sort();

        if let Some(parent) = archive.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(archive)
            .with_context(|| format!("Failed to create archive {}", archive.display()))?;
        let mut zip = ZipWriter::new(file);
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for path in &files {
            let name = entry_name(path.strip_prefix(base).unwrap_or(path));
            zip.start_file(name, options)?;
            let mut source =
                File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
            io::copy(&mut source, &mut zip)?;
        }
        zip.finish()?;

        tracing::info!(
            archive = %archive.display(),
            entries = files.len(),
            "wrote archive"
        );
        Ok(files.len())
    }
}

fn ends_with_any(name: &str, suffixes: &[&str]) -> bool {
    suffixes.iter().any(|s| name.ends_with(s))
}

fn matching_files(root: &Path, pred: impl Fn(&str) -> bool) -> Vec<PathBuf> {
    if !root.is_dir() {
        return Vec::new();
    }

    WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| pred(&e.file_name().to_string_lossy()))
        .map(|e| e.into_path())
        .collect()
}

/// Zip entry names always use `/`
fn entry_name(rel: &Path) -> String {
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, path.to_string_lossy().as_bytes()).unwrap();
    }

    #[test]
    fn test_prune_keeps_listed_suffixes() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path().join("baseline");
        touch(&root.join("Linux/fbx/cube.jpg"));
        touch(&root.join("Linux/fbx/usd_checker_results.json"));
        touch(&root.join("Linux/fbx/cube_roundtrip.fbx"));
        touch(&root.join("Linux/fbx/deep/cube_usdchecked.usd"));

        let removed = BaselineArchiver::new(RunMode::Generate).prune(&root, &[".jpg", ".json"])?;

        assert_eq!(removed, 2);
        assert!(root.join("Linux/fbx/cube.jpg").exists());
        assert!(root.join("Linux/fbx/usd_checker_results.json").exists());
        assert!(!root.join("Linux/fbx/cube_roundtrip.fbx").exists());
        Ok(())
    }

    #[test]
    fn test_prune_refused_when_verifying() {
        let temp_dir = TempDir::new().unwrap();
        touch(&temp_dir.path().join("a.usd"));
        assert!(BaselineArchiver::new(RunMode::Verify)
            .prune(temp_dir.path(), &[".jpg"])
            .is_err());
        assert!(temp_dir.path().join("a.usd").exists());
    }

    #[test]
    fn test_install_mirrors_tree() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let source = temp_dir.path().join("output/baseline/Linux");
        let dest = temp_dir.path().join("baseline/Linux");
        touch(&source.join("ply/scan/bunny.jpg"));
        touch(&source.join("ply/scan/bunny_roundtrip.ply"));

        let copied = BaselineArchiver::new(RunMode::Generate).install(&source, &dest, &[".jpg"])?;

        assert_eq!(copied, 1);
        assert!(dest.join("ply/scan/bunny.jpg").exists());
        assert!(!dest.join("ply/scan/bunny_roundtrip.ply").exists());
        Ok(())
    }

    #[test]
    fn test_archive_paths_relative_to_parent() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path().join("Linux");
        touch(&root.join("obj/box.jpg"));
        touch(&root.join("obj/box.obj"));
        touch(&root.join("gltf/cars/truck.jpg"));

        let archive = temp_dir.path().join("Linux_baseline_images.zip");
        let count = BaselineArchiver::new(RunMode::Generate).archive(&root, &[".jpg"], &archive)?;
        assert_eq!(count, 2);

        let mut zip = zip::ZipArchive::new(File::open(&archive)?)?;
        let mut names: Vec<String> = zip.file_names().map(str::to_string).collect();
        names.sort();
        assert_eq!(names, vec!["Linux/gltf/cars/truck.jpg", "Linux/obj/box.jpg"]);

        let mut content = String::new();
        zip.by_name("Linux/obj/box.jpg")?.read_to_string(&mut content)?;
        assert!(content.ends_with("box.jpg"));
        Ok(())
    }
}
