// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Test asset discovery per plugin family

pub mod discovery;
pub mod family;

pub use discovery::{Asset, AssetCatalog};
pub use family::{FamilyFilter, PluginFamily};
