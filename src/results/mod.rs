// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Schema-check diagnostics persistence and baseline comparison

pub mod diagnostics;
pub mod store;

pub use diagnostics::{DiagnosticResult, DiagnosticsDocument};
pub use store::{RegressionVerdict, ResultStore};
