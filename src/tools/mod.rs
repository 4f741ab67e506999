// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! External tool invocation
//!
//! Every external program (renderer, scene exporter, schema validator) is run
//! with an argument vector, never through a shell, under an optional timeout
//! and a shared cancellation flag.

pub mod process;
pub mod toolchain;

pub use process::{CancelFlag, ToolError, ToolOutput, ToolRunner};
pub use toolchain::{CommandToolchain, Toolchain};
