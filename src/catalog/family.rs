// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Plugin families and their extension filters

use serde::{Deserialize, Serialize};

/// A file-format plugin under test
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginFamily {
    /// Family name, also the folder name under assets/baseline/output
    pub name: String,
    /// File name suffixes selected from the family's asset folder
    pub extensions: Vec<String>,
    /// Whether the family has an export path for the round-trip pass
    #[serde(default = "default_true")]
    pub roundtrip: bool,
    /// Whether converted assets go through the schema validator
    #[serde(default = "default_true")]
    pub schema_check: bool,
}

fn default_true() -> bool {
    true
}

impl PluginFamily {
    pub fn new(name: &str, extensions: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            extensions: extensions.iter().map(|e| e.to_string()).collect(),
            roundtrip: true,
            schema_check: true,
        }
    }

    /// The families shipped with the plugin repository
    pub fn defaults() -> Vec<Self> {
        let mut sbsar = Self::new("sbsar", &[".usd"]);
        // Procedural-texture archives have no inverse export path.
        sbsar.roundtrip = false;
        sbsar.schema_check = false;

        vec![
            Self::new("fbx", &[".fbx"]),
            Self::new("gltf", &[".gltf", ".glb"]),
            Self::new("obj", &[".obj"]),
            Self::new("ply", &[".ply"]),
            sbsar,
            Self::new("spz", &[".spz"]),
            Self::new("stl", &[".stl"]),
        ]
    }

    /// Whether a file name ends with one of this family's extensions
    pub fn accepts(&self, file_name: &str) -> bool {
        self.extensions.iter().any(|ext| file_name.ends_with(ext.as_str()))
    }
}

/// Caller-supplied narrowing of each family's extension set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FamilyFilter {
    extensions: Vec<String>,
}

impl FamilyFilter {
    pub fn new<S: AsRef<str>>(extensions: &[S]) -> Self {
        Self {
            extensions: extensions
                .iter()
                .map(|e| normalize_extension(e.as_ref()))
                .filter(|e| e.len() > 1)
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }

    /// Intersect a family's extensions with the filter
    pub fn narrow(&self, family: &PluginFamily) -> PluginFamily {
        if self.extensions.is_empty() {
            return family.clone();
        }

        PluginFamily {
            extensions: family
                .extensions
                .iter()
                .filter(|ext| self.extensions.contains(ext))
                .cloned()
                .collect(),
            ..family.clone()
        }
    }
}

/// Accept `fbx`, `.fbx` and `.FBX` alike
fn normalize_extension(ext: &str) -> String {
    let ext = ext.trim().to_lowercase();
    if ext.starts_with('.') {
        ext
    } else {
        format!(".{}", ext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_suffix() {
        let gltf = PluginFamily::new("gltf", &[".gltf", ".glb"]);
        assert!(gltf.accepts("duck.glb"));
        assert!(gltf.accepts("scene.gltf"));
        assert!(!gltf.accepts("scene.gltf.bak"));
    }

    #[test]
    fn test_filter_narrows() {
        let gltf = PluginFamily::new("gltf", &[".gltf", ".glb"]);
        let filter = FamilyFilter::new(&["glb", ".fbx"]);

        assert_eq!(filter.narrow(&gltf).extensions, vec![".glb".to_string()]);
        assert!(FamilyFilter::new(&[".stl"]).narrow(&gltf).extensions.is_empty());
        assert_eq!(FamilyFilter::default().narrow(&gltf), gltf);
    }

    #[test]
    fn test_sbsar_defaults() {
        let families = PluginFamily::defaults();
        let sbsar = families.iter().find(|f| f.name == "sbsar").unwrap();
        assert!(!sbsar.roundtrip);
        assert!(!sbsar.schema_check);
        assert!(families.iter().filter(|f| f.name != "sbsar").all(|f| f.roundtrip));
    }
}
