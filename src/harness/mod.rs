// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Run orchestration: case table, generate/verify passes and reporting

pub mod orchestrator;
pub mod reporter;
pub mod types;

pub use orchestrator::Harness;
pub use reporter::HarnessReporter;
pub use types::{CaseReport, CaseStatus, HarnessReport, RenderCheck, SchemaCheck};
