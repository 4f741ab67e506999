// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! File Format Plugin Regression Harness
//!
//! Discovers test assets per plugin family, renders them directly and after a
//! round trip through the scene toolkit, compares the renders to golden images
//! and gates schema-validator diagnostics against a stored baseline.

pub mod archive;
pub mod catalog;
pub mod checker;
pub mod compare;
pub mod config;
pub mod error;
pub mod harness;
pub mod pipeline;
pub mod results;
pub mod tools;

pub use catalog::{Asset, AssetCatalog, FamilyFilter, PluginFamily};
pub use compare::{ComparisonVerdict, ImageComparator};
pub use config::{HarnessConfig, RunMode};
pub use error::{HarnessError, HarnessResult};
pub use harness::{Harness, HarnessReport, HarnessReporter};
pub use results::{DiagnosticResult, DiagnosticsDocument, RegressionVerdict, ResultStore};
pub use tools::{CancelFlag, CommandToolchain, Toolchain};

use anyhow::Result;

/// Run the full case table in `mode` with the command-line toolchain
pub fn run(config: &HarnessConfig, mode: RunMode) -> Result<HarnessReport> {
    let cancel = CancelFlag::new();
    let toolchain = CommandToolchain::from_config(config, cancel.clone());
    let filter = FamilyFilter::new(&config.extension_filter);
    Harness::new(config, &toolchain, cancel).run(mode, &filter)
}
