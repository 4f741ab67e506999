// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Runs the schema validator and records its verdict

use std::path::Path;

use super::classify::classify;
use crate::error::HarnessResult;
use crate::results::{DiagnosticResult, ResultStore};
use crate::tools::Toolchain;

/// Validates converted assets and appends results to a diagnostics document
pub struct SchemaCheckRunner<'a> {
    toolchain: &'a dyn Toolchain,
    store: &'a ResultStore,
}

impl<'a> SchemaCheckRunner<'a> {
    pub fn new(toolchain: &'a dyn Toolchain, store: &'a ResultStore) -> Self {
        Self { toolchain, store }
    }

    /// Validate `file` and append the classified result to the document at `document`
    pub fn check(&self, file: &Path, document: &Path) -> HarnessResult<DiagnosticResult> {
        let output = self.toolchain.validate(file)?;
        let result = classify(file, &output.stdout, &output.stderr);

        tracing::debug!(
            filename = %result.filename,
            pass = result.pass,
            warnings = result.warnings.len(),
            errors = result.errors.len(),
            "schema check classified"
        );

        self.store.append(document, result.clone())?;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HarnessError;
    use crate::results::DiagnosticsDocument;
    use crate::tools::{ToolError, ToolOutput};
    use tempfile::TempDir;

    struct CannedValidator(Option<ToolOutput>);

    impl Toolchain for CannedValidator {
        fn render(&self, _: &Path, _: &Path) -> Result<(), ToolError> {
            unreachable!()
        }

        fn export(&self, _: &Path, _: &Path) -> Result<(), ToolError> {
            unreachable!()
        }

        fn validate(&self, _: &Path) -> Result<ToolOutput, ToolError> {
            self.0.clone().ok_or_else(|| ToolError::Timeout {
                tool: "usdchecker".to_string(),
                after: std::time::Duration::from_secs(1),
            })
        }
    }

    #[test]
    fn test_check_appends_to_document() -> HarnessResult<()> {
        let temp_dir = TempDir::new()?;
        let document = temp_dir.path().join("usd_checker_results.json");
        let store = ResultStore::new();
        let validator = CannedValidator(Some(ToolOutput {
            success: false,
            exit_code: Some(1),
            stdout: "Total time: 1s\nbad prim\nFailed!\n".to_string(),
            stderr: String::new(),
        }));

        let runner = SchemaCheckRunner::new(&validator, &store);
        let result = runner.check(Path::new("out/Linux/obj/box_usdchecked.usd"), &document)?;

        assert_eq!(result.filename, "Linux/obj/box_usdchecked.usd");
        assert_eq!(result.errors, vec!["bad prim"]);
        assert_eq!(DiagnosticsDocument::load(&document)?.results, vec![result]);
        Ok(())
    }

    #[test]
    fn test_validator_timeout_surfaces() {
        let temp_dir = TempDir::new().unwrap();
        let store = ResultStore::new();
        let validator = CannedValidator(None);

        let err = SchemaCheckRunner::new(&validator, &store)
            .check(Path::new("a.usd"), &temp_dir.path().join("r.json"))
            .unwrap_err();
        assert!(matches!(err, HarnessError::ToolTimeout { .. }));
    }
}
