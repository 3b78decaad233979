//! Read-only sources of versioned schema documents

use crate::{DEFAULT_VERSION, Error, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::trace;

/// Read-only access to schema documents keyed by `(version, name)`.
///
/// Stores return raw document text; parsing and caching belong to
/// [`crate::SchemaRegistry`].
pub trait SchemaStore: Send + Sync + fmt::Debug {
    /// Version used when the caller does not specify one
    fn default_version(&self) -> &str;

    /// Load the raw text of a schema document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no document exists for the pair.
    fn load(&self, version: &str, name: &str) -> Result<String>;

    /// Whether a document exists for the pair
    fn contains(&self, version: &str, name: &str) -> bool;

    /// All versions in the store, sorted
    fn versions(&self) -> Vec<String>;

    /// All schema names for a version, sorted
    fn schema_names(&self, version: &str) -> Vec<String>;
}

/// Schemas shipped inside the binary.
const BUNDLED: &[(&str, &str, &str)] = &[
    (
        "1.0.0",
        "defs.json",
        include_str!("../schemas/1.0.0/defs.json"),
    ),
    (
        "1.0.0",
        "jsonpatch.json",
        include_str!("../schemas/1.0.0/jsonpatch.json"),
    ),
    (
        "1.0.0",
        "measurement.json",
        include_str!("../schemas/1.0.0/measurement.json"),
    ),
    (
        "1.0.0",
        "model.json",
        include_str!("../schemas/1.0.0/model.json"),
    ),
    (
        "1.0.0",
        "patchset.json",
        include_str!("../schemas/1.0.0/patchset.json"),
    ),
    (
        "1.0.0",
        "workspace.json",
        include_str!("../schemas/1.0.0/workspace.json"),
    ),
];

/// The fixed schema collection compiled into the crate
#[derive(Debug, Clone, Default)]
pub struct BundledStore;

impl BundledStore {
    pub fn new() -> Self {
        Self
    }

    fn find(version: &str, name: &str) -> Option<&'static str> {
        BUNDLED
            .iter()
            .find(|(v, n, _)| *v == version && *n == name)
            .map(|(_, _, text)| *text)
    }
}

impl SchemaStore for BundledStore {
    fn default_version(&self) -> &str {
        DEFAULT_VERSION
    }

    fn load(&self, version: &str, name: &str) -> Result<String> {
        trace!("Loading bundled schema {}/{}", version, name);
        Self::find(version, name)
            .map(str::to_string)
            .ok_or_else(|| Error::not_found(version, name))
    }

    fn contains(&self, version: &str, name: &str) -> bool {
        Self::find(version, name).is_some()
    }

    fn versions(&self) -> Vec<String> {
        let versions: BTreeSet<&str> = BUNDLED.iter().map(|(v, _, _)| *v).collect();
        versions.into_iter().map(str::to_string).collect()
    }

    fn schema_names(&self, version: &str) -> Vec<String> {
        let names: BTreeSet<&str> = BUNDLED
            .iter()
            .filter(|(v, _, _)| *v == version)
            .map(|(_, n, _)| *n)
            .collect();
        names.into_iter().map(str::to_string).collect()
    }
}

/// Schemas laid out on disk as `<root>/<version>/<name>`
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
    default_version: String,
}

impl DirectoryStore {
    /// Create a store rooted at `root`, defaulting to [`DEFAULT_VERSION`]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            default_version: DEFAULT_VERSION.to_string(),
        }
    }

    /// Override the default version
    #[must_use]
    pub fn with_default_version(mut self, version: impl Into<String>) -> Self {
        self.default_version = version.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// A single path component; anything that could escape the root is refused.
    fn is_plain_component(part: &str) -> bool {
        !part.is_empty()
            && part != "."
            && part != ".."
            && !part.contains('/')
            && !part.contains('\\')
    }

    fn path_for(&self, version: &str, name: &str) -> Option<PathBuf> {
        if Self::is_plain_component(version) && Self::is_plain_component(name) {
            Some(self.root.join(version).join(name))
        } else {
            None
        }
    }
}

impl SchemaStore for DirectoryStore {
    fn default_version(&self) -> &str {
        &self.default_version
    }

    fn load(&self, version: &str, name: &str) -> Result<String> {
        let path = self
            .path_for(version, name)
            .ok_or_else(|| Error::not_found(version, name))?;

        if !path.is_file() {
            return Err(Error::not_found(version, name));
        }

        trace!("Found schema file: {:?}", path);
        Ok(std::fs::read_to_string(&path)?)
    }

    fn contains(&self, version: &str, name: &str) -> bool {
        self.path_for(version, name).is_some_and(|p| p.is_file())
    }

    fn versions(&self) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(&self.root) else {
            return Vec::new();
        };
        let mut versions: Vec<String> = entries
            .filter_map(std::result::Result::ok)
            .filter(|e| e.path().is_dir())
            .filter_map(|e| e.file_name().to_str().map(str::to_string))
            .collect();
        versions.sort();
        versions
    }

    fn schema_names(&self, version: &str) -> Vec<String> {
        if !Self::is_plain_component(version) {
            return Vec::new();
        }
        let Ok(entries) = std::fs::read_dir(self.root.join(version)) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .filter_map(std::result::Result::ok)
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "json"))
            .filter_map(|e| e.file_name().to_str().map(str::to_string))
            .collect();
        names.sort();
        names
    }
}

/// In-memory schema collection for embedding and tests
#[derive(Debug, Clone)]
pub struct MemoryStore {
    default_version: String,
    documents: BTreeMap<(String, String), String>,
}

impl MemoryStore {
    pub fn new(default_version: impl Into<String>) -> Self {
        Self {
            default_version: default_version.into(),
            documents: BTreeMap::new(),
        }
    }

    /// Add a raw document
    pub fn insert(
        &mut self,
        version: impl Into<String>,
        name: impl Into<String>,
        text: impl Into<String>,
    ) -> &mut Self {
        self.documents
            .insert((version.into(), name.into()), text.into());
        self
    }

    /// Add a document given as JSON
    #[must_use]
    pub fn with_schema(
        mut self,
        version: impl Into<String>,
        name: impl Into<String>,
        document: &serde_json::Value,
    ) -> Self {
        self.insert(version, name, document.to_string());
        self
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_VERSION)
    }
}

impl SchemaStore for MemoryStore {
    fn default_version(&self) -> &str {
        &self.default_version
    }

    fn load(&self, version: &str, name: &str) -> Result<String> {
        self.documents
            .get(&(version.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| Error::not_found(version, name))
    }

    fn contains(&self, version: &str, name: &str) -> bool {
        self.documents
            .contains_key(&(version.to_string(), name.to_string()))
    }

    fn versions(&self) -> Vec<String> {
        let versions: BTreeSet<&String> = self.documents.keys().map(|(v, _)| v).collect();
        versions.into_iter().cloned().collect()
    }

    fn schema_names(&self, version: &str) -> Vec<String> {
        self.documents
            .keys()
            .filter(|(v, _)| v == version)
            .map(|(_, n)| n.clone())
            .collect()
    }
}
