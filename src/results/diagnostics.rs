// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Diagnostics documents
//!
//! On disk a document is one pretty-printed JSON array of records; the same
//! representation is used for reading and writing.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::Path;
use tempfile::NamedTempFile;

use crate::error::{HarnessError, HarnessResult};

/// Validator outcome for one asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticResult {
    /// Last three path segments of the checked file, the join key against baselines
    pub filename: String,
    pub pass: bool,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

/// Ordered collection of results for one (platform, family)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DiagnosticsDocument {
    pub results: Vec<DiagnosticResult>,
}

impl DiagnosticsDocument {
    /// Read a document; a missing file is an empty document
    pub fn load(path: &Path) -> HarnessResult<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
        };

        serde_json::from_str(&content).map_err(|e| HarnessError::ResultsDocumentCorrupt {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Read a document, starting fresh (with a warning) when the existing one is unusable
    pub fn load_or_reset(path: &Path) -> Self {
        match Self::load(path) {
            Ok(doc) => doc,
            Err(err) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %err,
                    "discarding unreadable results document and starting a new one"
                );
                Self::default()
            }
        }
    }

    /// Write via a temporary sibling and rename so readers never see a partial document
    pub fn save_atomic(&self, path: &Path) -> HarnessResult<()> {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir)?;

        let json = serde_json::to_string_pretty(self)?;
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| HarnessError::Io(e.error))?;
        Ok(())
    }

    /// Insert a result, replacing any earlier record with the same key.
    /// Records are left sorted by key so documents are stable under parallel runs,
    /// whatever order a loaded document arrived in.
    pub fn upsert(&mut self, result: DiagnosticResult) {
        match self.results.iter().position(|r| r.filename == result.filename) {
            Some(idx) => self.results[idx] = result,
            None => self.results.push(result),
        }
        self.results.sort_by(|a, b| a.filename.cmp(&b.filename));
    }

    pub fn find(&self, filename: &str) -> Option<&DiagnosticResult> {
        self.results.iter().find(|r| r.filename == filename)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn result(name: &str, errors: &[&str]) -> DiagnosticResult {
        DiagnosticResult {
            filename: name.to_string(),
            pass: errors.is_empty(),
            warnings: Vec::new(),
            errors: errors.iter().map(|e| e.to_string()).collect(),
        }
    }

    #[test]
    fn test_document_is_a_json_array() -> HarnessResult<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("nested/usd_checker_results.json");

        let mut doc = DiagnosticsDocument::default();
        doc.upsert(result("Linux/obj/b_usdchecked.usd", &["E1"]));
        doc.upsert(result("Linux/obj/a_usdchecked.usd", &[]));
        doc.save_atomic(&path)?;

        let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path)?)?;
        assert!(raw.is_array());
        assert_eq!(raw[0]["filename"], "Linux/obj/a_usdchecked.usd");
        assert_eq!(raw[1]["errors"][0], "E1");

        assert_eq!(DiagnosticsDocument::load(&path)?, doc);
        Ok(())
    }

    #[test]
    fn test_upsert_replaces_same_key() {
        let mut doc = DiagnosticsDocument::default();
        doc.upsert(result("a", &["E1"]));
        doc.upsert(result("a", &[]));
        assert_eq!(doc.len(), 1);
        assert!(doc.find("a").unwrap().pass);
    }

    #[test]
    fn test_missing_and_corrupt_documents() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing.json");
        assert!(DiagnosticsDocument::load(&missing).unwrap().is_empty());

        let corrupt = temp_dir.path().join("corrupt.json");
        fs::write(&corrupt, "{\"filename\": ").unwrap();
        assert!(matches!(
            DiagnosticsDocument::load(&corrupt),
            Err(HarnessError::ResultsDocumentCorrupt { .. })
        ));
        assert!(DiagnosticsDocument::load_or_reset(&corrupt).is_empty());
    }

    #[test]
    fn test_upsert_into_unsorted_document() {
        let mut doc = DiagnosticsDocument {
            results: vec![result("b", &[]), result("a", &["error: x"])],
        };

        doc.upsert(result("a", &[]));
        doc.upsert(result("c", &[]));

        let keys: Vec<&str> = doc.results.iter().map(|r| r.filename.as_str()).collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
        assert!(doc.find("a").unwrap().pass);
    }
}
