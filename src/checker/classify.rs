// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Validator output classification
//!
//! Lines exactly equal to a known-benign message are dropped; lines that merely
//! mention one (typically wrapped in a checker prefix) are warnings; every
//! other non-sentinel line is an error.

use std::path::{Component, Path};

use crate::results::DiagnosticResult;

/// Banner lines after which the validator's diagnostic content starts, in priority order
const BANNER_MARKERS: [&str; 2] = ["Total time:", "Write layer via Sdf API:"];

/// Verdict lines the validator prints on its own
const SENTINELS: [&str; 2] = ["Success!", "Failed!"];

/// Known-benign diagnostics that never count against an asset
pub const IGNORABLE_MESSAGES: [&str; 2] = [
    "Stage does not specify an upAxis.",
    "Stage does not specify its linear scale in metersPerUnit.",
];

/// Drop everything up to and including the first banner marker line
pub fn truncate_banner(stdout: &str) -> &str {
    for marker in BANNER_MARKERS {
        if let Some(idx) = stdout.find(marker) {
            return match stdout[idx..].find('\n') {
                Some(nl) => &stdout[idx + nl + 1..],
                None => stdout,
            };
        }
    }
    stdout
}

/// Classify validator output for the checked file `path`
pub fn classify(path: &Path, stdout: &str, stderr: &str) -> DiagnosticResult {
    let combined = format!("{}{}", truncate_banner(stdout), stderr);

    let mut warnings = Vec::new();
    let mut errors = Vec::new();

    for line in combined.split('\n').map(|l| l.trim_end_matches('\r')) {
        if line.is_empty() || SENTINELS.contains(&line) || IGNORABLE_MESSAGES.contains(&line) {
            continue;
        }
        if IGNORABLE_MESSAGES.iter().any(|msg| line.contains(msg)) {
            warnings.push(line.to_string());
        } else {
            errors.push(line.to_string());
        }
    }

    DiagnosticResult {
        filename: join_key(path),
        pass: errors.is_empty(),
        warnings,
        errors,
    }
}

/// Last three path segments joined with `/`, stable across machines and checkouts
pub fn join_key(path: &Path) -> String {
    let names: Vec<String> = path
        .components()
        .filter_map(|c| match c {
            Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    let start = names.len().saturating_sub(3);
    names[start..].join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_after_timing_banner() {
        let result = classify(Path::new("/a/b/c/d.usd"), "Total time: 1s\nSuccess!\r\n", "");
        assert_eq!(
            result,
            DiagnosticResult {
                filename: "b/c/d.usd".to_string(),
                pass: true,
                warnings: vec![],
                errors: vec![],
            }
        );
    }

    #[test]
    fn test_banner_priority() {
        let out = "Write layer via Sdf API: 2ms\nnoise\nTotal time: 3ms\nreal\n";
        assert_eq!(truncate_banner(out), "real\n");

        let out = "Opening\nWrite layer via Sdf API: 2ms\nreal\n";
        assert_eq!(truncate_banner(out), "real\n");

        assert_eq!(truncate_banner("plain\n"), "plain\n");
        assert_eq!(truncate_banner("Total time: 1s"), "Total time: 1s");
    }

    #[test]
    fn test_ignorable_lines_never_counted() {
        let stdout = "Total time: 1s\nStage does not specify an upAxis.\nStage does not specify its linear scale in metersPerUnit.\r\nFailed!\n";
        let result = classify(Path::new("x/y/z.usd"), stdout, "");
        assert!(result.warnings.is_empty());
        assert!(result.errors.is_empty());
        assert!(result.pass);
    }

    #[test]
    fn test_wrapped_benign_message_is_warning() {
        let stdout = "Total time: 1s\nStage does not specify an upAxis. (fails 'StageMetadataChecker')\nFailed!\n";
        let stderr = "Error: missing texture 'wood.png'\n";
        let result = classify(Path::new("Linux/fbx/chair_usdchecked.usd"), stdout, stderr);

        assert_eq!(
            result.warnings,
            vec!["Stage does not specify an upAxis. (fails 'StageMetadataChecker')"]
        );
        assert_eq!(result.errors, vec!["Error: missing texture 'wood.png'"]);
        assert!(!result.pass);
    }

    #[test]
    fn test_join_key() {
        assert_eq!(join_key(Path::new("/root/output/Linux/fbx/a.usd")), "Linux/fbx/a.usd");
        assert_eq!(join_key(Path::new("fbx/a.usd")), "fbx/a.usd");
        assert_eq!(join_key(Path::new("a.usd")), "a.usd");
    }
}
