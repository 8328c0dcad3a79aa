use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Serialized form of a checksum that could not be resolved.
pub const UNKNOWN_CHECKSUM: &str = "NONE";

static UNKNOWN: Checksum = Checksum(None);

/// Package identifier as it appears on the package site.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackageName(String);

impl PackageName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Kind of source material backing a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// A single file staged as-is (e.g. a `.deb`)
    File,
    /// An archive unpacked before the build (e.g. an `.orig.tar.*`)
    Archive,
}

/// Content checksum of a source artifact.
///
/// The digest is normalized (trimmed, lower-case hex) by [`Checksum::sha256`],
/// the only way to build a known checksum, so equal digests always compare
/// equal and a serialized checksum reads back unchanged. The unknown sentinel
/// never compares as the same artifact as another unknown checksum.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Checksum(Option<String>);

impl Checksum {
    /// Builds a checksum from a digest, mapping blank input and `"NONE"` to
    /// the unknown sentinel.
    pub fn sha256(hex: impl AsRef<str>) -> Self {
        let trimmed = hex.as_ref().trim();
        if trimmed.is_empty() || trimmed == UNKNOWN_CHECKSUM {
            Self(None)
        } else {
            Self(Some(trimmed.to_ascii_lowercase()))
        }
    }

    pub fn unknown() -> Self {
        Self(None)
    }

    pub fn is_unknown(&self) -> bool {
        self.0.is_none()
    }

    /// Key used for overlap detection; `None` for the unknown sentinel.
    pub fn key(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

impl From<String> for Checksum {
    fn from(value: String) -> Self {
        Checksum::sha256(value)
    }
}

impl From<Checksum> for String {
    fn from(value: Checksum) -> Self {
        value.0.unwrap_or_else(|| UNKNOWN_CHECKSUM.to_string())
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key().unwrap_or(UNKNOWN_CHECKSUM))
    }
}

/// One piece of source material: `{ "type", "url", "sha256" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceArtifact {
    #[serde(rename = "type")]
    pub kind: SourceKind,
    pub url: String,
    pub sha256: Checksum,
}

impl SourceArtifact {
    /// An artifact whose location and checksum could not be found.
    pub fn unresolved(kind: SourceKind) -> Self {
        Self {
            kind,
            url: String::new(),
            sha256: Checksum::unknown(),
        }
    }
}

/// A build module: one package and the sources needed to build it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub name: PackageName,
    #[serde(rename = "config-opts")]
    pub config_opts: String,
    pub sources: Vec<SourceArtifact>,
}

impl Module {
    pub fn new(name: PackageName, source: SourceArtifact) -> Self {
        Self {
            name,
            config_opts: String::new(),
            sources: vec![source],
        }
    }

    /// Checksum of the primary source, used for overlap detection.
    pub fn checksum(&self) -> &Checksum {
        self.sources
            .first()
            .map(|s| &s.sha256)
            .unwrap_or(&UNKNOWN)
    }
}

/// A dependency link as found on a page, before resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyLink {
    pub name: PackageName,
    pub href: String,
}

/// Parent depends on child; `url` is the child's resolved page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyEdge {
    pub parent: PackageName,
    pub child: PackageName,
    pub url: Url,
}
