// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Schema validator runs and diagnostic classification

pub mod classify;
pub mod runner;

pub use classify::{classify, join_key, truncate_banner, IGNORABLE_MESSAGES};
pub use runner::SchemaCheckRunner;
