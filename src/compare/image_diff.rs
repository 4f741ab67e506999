// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Pixel-exact image comparison
//!
//! A pixel matches only when every channel is identical; no tolerance for
//! anti-aliasing or colour-space drift is applied.

use anyhow::{Context, Result};
use image::{DynamicImage, GenericImageView, Rgb, RgbImage};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{HarnessError, HarnessResult};

/// Similarity ratio a comparison must reach unless the caller overrides it
pub const DEFAULT_THRESHOLD: f64 = 0.95;

/// Why two images could not be compared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MismatchReason {
    DimensionMismatch,
    Unreadable,
}

/// Outcome of comparing two raster images
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum ComparisonVerdict {
    Compared { similarity_ratio: f64, pass: bool },
    Failed { reason: MismatchReason },
}

impl ComparisonVerdict {
    pub fn pass(&self) -> bool {
        matches!(self, ComparisonVerdict::Compared { pass: true, .. })
    }

    pub fn similarity_ratio(&self) -> Option<f64> {
        match self {
            ComparisonVerdict::Compared {
                similarity_ratio, ..
            } => Some(*similarity_ratio),
            ComparisonVerdict::Failed { .. } => None,
        }
    }
}

/// Compares rendered output against golden images
#[derive(Debug, Clone, Copy)]
pub struct ImageComparator {
    threshold: f64,
}

impl Default for ImageComparator {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}

impl ImageComparator {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Decode both files and compare them
    pub fn compare(&self, path_a: &Path, path_b: &Path) -> ComparisonVerdict {
        let measured = self.measure(path_a, path_b);
        match &measured {
            Ok(similarity_ratio) if *similarity_ratio < self.threshold => tracing::error!(
                baseline = %path_a.display(),
                current = %path_b.display(),
                similarity_ratio,
                threshold = self.threshold,
                "images are not similar enough"
            ),
            Err(err) => tracing::error!(
                baseline = %path_a.display(),
                current = %path_b.display(),
                error = %err,
                "images cannot be compared"
            ),
            _ => {}
        }
        self.verdict(&measured)
    }

    /// Similarity ratio of two image files
    pub fn measure(&self, path_a: &Path, path_b: &Path) -> HarnessResult<f64> {
        let img_a = open(path_a)?;
        let img_b = open(path_b)?;
        similarity(&img_a, &img_b)
    }

    /// Verdict for a measured ratio against this comparator's threshold
    pub fn verdict(&self, measured: &HarnessResult<f64>) -> ComparisonVerdict {
        match measured {
            Ok(ratio) => ComparisonVerdict::Compared {
                similarity_ratio: *ratio,
                pass: *ratio >= self.threshold,
            },
            Err(HarnessError::DimensionMismatch { .. }) => ComparisonVerdict::Failed {
                reason: MismatchReason::DimensionMismatch,
            },
            Err(_) => ComparisonVerdict::Failed {
                reason: MismatchReason::Unreadable,
            },
        }
    }

    /// Compare two decoded images
    pub fn compare_images(&self, a: &DynamicImage, b: &DynamicImage) -> ComparisonVerdict {
        self.verdict(&similarity(a, b))
    }

    /// Write a diff image: differing pixels in red, matching pixels in grayscale.
    /// Returns the fraction of differing pixels.
    pub fn write_diff_image(&self, path_a: &Path, path_b: &Path, output: &Path) -> Result<f64> {
        let img_a = image::open(path_a)
            .with_context(|| format!("Failed to open image: {}", path_a.display()))?;
        let img_b = image::open(path_b)
            .with_context(|| format!("Failed to open image: {}", path_b.display()))?;

        if img_a.dimensions() != img_b.dimensions() {
            anyhow::bail!(
                "cannot diff {} and {}: dimensions differ",
                path_a.display(),
                path_b.display()
            );
        }

        let a = img_a.to_rgb8();
        let b = img_b.to_rgb8();
        let (width, height) = a.dimensions();
        let mut diff_img = RgbImage::new(width, height);
        let mut diff_pixels = 0u64;

        for (x, y, pixel_a) in a.enumerate_pixels() {
            let pixel_b = b.get_pixel(x, y);
            if pixel_a != pixel_b {
                diff_pixels += 1;
                diff_img.put_pixel(x, y, Rgb([255, 0, 0]));
            } else {
                let gray =
                    ((pixel_a[0] as u32 + pixel_a[1] as u32 + pixel_a[2] as u32) / 3) as u8;
                diff_img.put_pixel(x, y, Rgb([gray, gray, gray]));
            }
        }

        diff_img
            .save(output)
            .with_context(|| format!("Failed to save diff image to {}", output.display()))?;

        let total = (width as u64 * height as u64).max(1);
        Ok(diff_pixels as f64 / total as f64)
    }
}

fn open(path: &Path) -> HarnessResult<DynamicImage> {
    image::open(path).map_err(|err| HarnessError::AssetUnreadable {
        path: path.to_path_buf(),
        reason: err.to_string(),
    })
}

/// Width, height and channel count
fn shape(img: &DynamicImage) -> (u32, u32, u8) {
    let (width, height) = img.dimensions();
    (width, height, img.color().channel_count())
}

/// Fraction of pixels whose channels all match
fn similarity(a: &DynamicImage, b: &DynamicImage) -> HarnessResult<f64> {
    let (left, right) = (shape(a), shape(b));
    if left != right {
        return Err(HarnessError::DimensionMismatch { left, right });
    }

    let (width, height, channels) = left;
    let total = width as u64 * height as u64;
    if total == 0 {
        return Ok(1.0);
    }

    let matching = if a.color() == b.color() {
        count_matching(a.as_bytes(), b.as_bytes(), a.color().bytes_per_pixel() as usize)
    } else {
        // Same channel layout at different bit depths: widen both to 16 bits.
        let (a16, b16) = (widen(a, channels), widen(b, channels));
        count_matching(&a16, &b16, channels as usize)
    };

    Ok(matching as f64 / total as f64)
}

fn count_matching<T: PartialEq + Sync>(a: &[T], b: &[T], stride: usize) -> u64 {
    a.par_chunks(stride)
        .zip(b.par_chunks(stride))
        .filter(|(pa, pb)| pa == pb)
        .count() as u64
}

fn widen(img: &DynamicImage, channels: u8) -> Vec<u16> {
    match channels {
        1 => img.to_luma16().into_raw(),
        2 => img.to_luma_alpha16().into_raw(),
        3 => img.to_rgb16().into_raw(),
        _ => img.to_rgba16().into_raw(),
    }
}
