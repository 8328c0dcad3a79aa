//! Ordered build manifest.
//!
//! [`Manifest`] only records what the walker decided to emit. Modules stay in
//! the order they were appended, which is the order the walk finalized them
//! (dependencies before dependents).

use crate::model::Module;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("Manifest serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Ordered list of build modules, serialized as a bare JSON array.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest {
    modules: Vec<Module>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `module` at the tail.
    pub fn append(&mut self, module: Module) {
        self.modules.push(module);
    }

    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Module> {
        self.modules.iter()
    }

    /// Renders the manifest; compact unless `pretty` is set.
    pub fn serialize(&self, pretty: bool) -> Result<Vec<u8>, ManifestError> {
        let bytes = if pretty {
            serde_json::to_vec_pretty(self)?
        } else {
            serde_json::to_vec(self)?
        };
        Ok(bytes)
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self, ManifestError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

impl<'a> IntoIterator for &'a Manifest {
    type Item = &'a Module;
    type IntoIter = std::slice::Iter<'a, Module>;

    fn into_iter(self) -> Self::IntoIter {
        self.modules.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Checksum, PackageName, SourceArtifact, SourceKind};

    fn module(name: &str, checksum: Checksum) -> Module {
        Module::new(
            PackageName::new(name),
            SourceArtifact {
                kind: SourceKind::File,
                url: format!("http://mirror/{name}.deb"),
                sha256: checksum,
            },
        )
    }

    #[test]
    fn test_append_preserves_order() {
        let mut manifest = Manifest::new();
        manifest.append(module("c", Checksum::unknown()));
        manifest.append(module("b", Checksum::unknown()));
        manifest.append(module("a", Checksum::unknown()));

        let names: Vec<_> = manifest.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["c", "b", "a"]);
    }

    #[test]
    fn test_serialized_shape() {
        let mut manifest = Manifest::new();
        manifest.append(module("zlib", Checksum::sha256("00".repeat(32))));

        let bytes = manifest.serialize(false).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(
            text,
            format!(
                r#"[{{"name":"zlib","config-opts":"","sources":[{{"type":"file","url":"http://mirror/zlib.deb","sha256":"{}"}}]}}]"#,
                "00".repeat(32)
            )
        );
    }

    #[test]
    fn test_deserialize_reconstructs_manifest() {
        let mut manifest = Manifest::new();
        manifest.append(module("libc6", Checksum::sha256("ff".repeat(32))));
        manifest.append(module("libfoo", Checksum::unknown()));

        let bytes = manifest.serialize(true).unwrap();
        let back = Manifest::deserialize(&bytes).unwrap();
        assert_eq!(back, manifest);
    }

    #[test]
    fn test_upper_case_digest_survives_round_trip() {
        let mut manifest = Manifest::new();
        manifest.append(module("libssl3", Checksum::sha256("AB".repeat(32))));
        manifest.append(module("libblank", Checksum::sha256("")));

        let bytes = manifest.serialize(false).unwrap();
        let back = Manifest::deserialize(&bytes).unwrap();
        assert_eq!(back, manifest);
    }

    #[test]
    fn test_empty_manifest_is_empty_array() {
        let manifest = Manifest::new();
        assert!(manifest.is_empty());
        assert_eq!(manifest.serialize(false).unwrap(), b"[]");
    }
}
