// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Results store and the schema-check regression gate

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::diagnostics::{DiagnosticResult, DiagnosticsDocument};
use crate::error::HarnessResult;

/// Outcome of comparing one asset's diagnostics to its baseline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum RegressionVerdict {
    /// No baseline entry for this key; new assets never fail
    Skip { filename: String },
    Pass {
        warnings_delta: i64,
        errors_delta: i64,
    },
    Fail {
        warnings_delta: i64,
        errors_delta: i64,
    },
}

impl RegressionVerdict {
    pub fn is_failure(&self) -> bool {
        matches!(self, RegressionVerdict::Fail { .. })
    }
}

/// Owns the on-disk diagnostics documents written during a run
///
/// Appends to the same document are serialized through a per-document lock and
/// each append rewrites the document atomically, so concurrent workers never
/// lose updates and an interrupted run leaves valid JSON behind.
#[derive(Debug, Default)]
pub struct ResultStore {
    locks: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn document_lock(&self, path: &Path) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks
            .entry(path.to_path_buf())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn hold(lock: &Mutex<()>) -> MutexGuard<'_, ()> {
        lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Delete a document so the run starts a fresh collection
    pub fn reset(&self, path: &Path) -> HarnessResult<()> {
        let lock = self.document_lock(path);
        let _guard = Self::hold(&lock);
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Add a result to the document at `path`, creating it if absent
    pub fn append(&self, path: &Path, result: DiagnosticResult) -> HarnessResult<()> {
        let lock = self.document_lock(path);
        let _guard = Self::hold(&lock);

        let mut document = DiagnosticsDocument::load_or_reset(path);
        document.upsert(result);
        document.save_atomic(path)
    }

    /// Load a stored baseline document; unreadable baselines are reported and treated as absent
    pub fn load_baseline(path: &Path) -> Option<DiagnosticsDocument> {
        if !path.exists() {
            tracing::warn!(path = %path.display(), "no baseline results document");
            return None;
        }

        match DiagnosticsDocument::load(path) {
            Ok(doc) => Some(doc),
            Err(err) => {
                tracing::error!(path = %path.display(), error = %err, "invalid baseline results document");
                None
            }
        }
    }

    /// Gate: fail only when the error count grew; warning changes are logged
    pub fn compare_to_baseline(
        current: &DiagnosticResult,
        baseline: &DiagnosticsDocument,
    ) -> RegressionVerdict {
        let Some(base) = baseline.find(&current.filename) else {
            tracing::warn!(filename = %current.filename, "no baseline found");
            return RegressionVerdict::Skip {
                filename: current.filename.clone(),
            };
        };

        let warnings_delta = current.warnings.len() as i64 - base.warnings.len() as i64;
        let errors_delta = current.errors.len() as i64 - base.errors.len() as i64;

        tracing::info!(
            filename = %current.filename,
            baseline = base.warnings.len(),
            current = current.warnings.len(),
            delta = warnings_delta,
            "warning count"
        );
        tracing::info!(
            filename = %current.filename,
            baseline = base.errors.len(),
            current = current.errors.len(),
            delta = errors_delta,
            "error count"
        );
        if !current.errors.is_empty() {
            tracing::error!(
                filename = %current.filename,
                count = current.errors.len(),
                "errors still exist"
            );
        }

        if current.errors.len() > base.errors.len() {
            RegressionVerdict::Fail {
                warnings_delta,
                errors_delta,
            }
        } else {
            RegressionVerdict::Pass {
                warnings_delta,
                errors_delta,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn result(name: &str, warnings: &[&str], errors: &[&str]) -> DiagnosticResult {
        DiagnosticResult {
            filename: name.to_string(),
            pass: errors.is_empty(),
            warnings: warnings.iter().map(|w| w.to_string()).collect(),
            errors: errors.iter().map(|e| e.to_string()).collect(),
        }
    }

    fn baseline(entries: Vec<DiagnosticResult>) -> DiagnosticsDocument {
        DiagnosticsDocument { results: entries }
    }

    #[test]
    fn test_improvement_never_fails() {
        let base = baseline(vec![result("k", &[], &["E1"])]);
        let verdict = ResultStore::compare_to_baseline(&result("k", &[], &[]), &base);
        assert_eq!(
            verdict,
            RegressionVerdict::Pass {
                warnings_delta: 0,
                errors_delta: -1
            }
        );
    }

    #[test]
    fn test_error_increase_fails() {
        let base = baseline(vec![result("k", &[], &["E1"])]);
        let verdict = ResultStore::compare_to_baseline(&result("k", &[], &["E1", "E2"]), &base);
        assert!(verdict.is_failure());
    }

    #[test]
    fn test_warning_increase_only_logged() {
        let base = baseline(vec![result("k", &[], &[])]);
        let verdict = ResultStore::compare_to_baseline(&result("k", &["W1", "W2"], &[]), &base);
        assert_eq!(
            verdict,
            RegressionVerdict::Pass {
                warnings_delta: 2,
                errors_delta: 0
            }
        );
    }

    #[test]
    fn test_missing_baseline_entry_skips() {
        let base = baseline(vec![result("other", &[], &["E1"])]);
        let verdict = ResultStore::compare_to_baseline(&result("new", &[], &["E9"]), &base);
        assert_eq!(
            verdict,
            RegressionVerdict::Skip {
                filename: "new".to_string()
            }
        );
        assert!(!verdict.is_failure());
    }

    #[test]
    fn test_concurrent_appends_keep_every_record() -> HarnessResult<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("Linux/fbx/usd_checker_results.json");
        let store = ResultStore::new();

        std::thread::scope(|scope| {
            for i in 0..16 {
                let store = &store;
                let path = &path;
                scope.spawn(move || {
                    store
                        .append(path, result(&format!("fbx/asset_{:02}", i), &[], &[]))
                        .unwrap();
                });
            }
        });

        let doc = DiagnosticsDocument::load(&path)?;
        assert_eq!(doc.len(), 16);
        assert_eq!(doc.results[0].filename, "fbx/asset_00");
        Ok(())
    }

    #[test]
    fn test_append_recovers_from_corrupt_document() -> HarnessResult<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("usd_checker_results.json");
        fs::write(&path, "not json")?;

        let store = ResultStore::new();
        store.append(&path, result("a", &[], &[]))?;
        assert_eq!(DiagnosticsDocument::load(&path)?.len(), 1);

        store.reset(&path)?;
        assert!(!path.exists());
        store.reset(&path)?;
        Ok(())
    }
}
