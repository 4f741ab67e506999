// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Render and round-trip conversion of test assets

pub mod conversion;
pub mod layout;

pub use conversion::{ConversionMode, ConversionOutcome, ConversionPipeline, ConversionStatus};
pub use layout::ArtifactPaths;
