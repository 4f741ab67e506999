// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Golden-image comparison

pub mod image_diff;

pub use image_diff::{ComparisonVerdict, ImageComparator, MismatchReason, DEFAULT_THRESHOLD};
