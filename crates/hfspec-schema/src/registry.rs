//! Caching schema registry with `$ref` resolution

use crate::model::{SchemaDocument, SchemaIdentifier};
use crate::reference::{ResolvedReference, fragment_to_pointer, join_uri, split_reference};
use crate::store::{BundledStore, SchemaStore};
use crate::{DEFAULT_BASE_URI, DEFS_SCHEMA, Result};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

/// Process-local cache of parsed schema documents.
///
/// Documents are loaded lazily from the [`SchemaStore`] on first use, stored
/// under their declared `$id`, and never replaced afterwards. The registry is
/// `Send + Sync`; concurrent first loads of the same identifier settle on
/// whichever insert lands first.
#[derive(Debug)]
pub struct SchemaRegistry {
    store: Arc<dyn SchemaStore>,
    base_uri: String,
    cache: DashMap<SchemaIdentifier, Arc<SchemaDocument>>,
}

impl SchemaRegistry {
    /// Create a registry over `store` using [`DEFAULT_BASE_URI`].
    ///
    /// # Errors
    ///
    /// Fails if the store's `defs.json` exists but cannot be parsed.
    pub fn new(store: impl SchemaStore + 'static) -> Result<Self> {
        Self::with_base_uri(Arc::new(store), DEFAULT_BASE_URI)
    }

    /// Registry over the schemas compiled into the crate
    ///
    /// # Errors
    ///
    /// Fails only if a bundled schema is malformed.
    pub fn bundled() -> Result<Self> {
        Self::new(BundledStore::new())
    }

    /// Create a registry with an explicit namespace.
    ///
    /// The shared definitions document is resolved eagerly when the store
    /// has one, so relative references to it never trigger a late first load.
    ///
    /// # Errors
    ///
    /// Fails if the store's `defs.json` exists but cannot be parsed.
    pub fn with_base_uri(store: Arc<dyn SchemaStore>, base_uri: impl Into<String>) -> Result<Self> {
        let registry = Self {
            store,
            base_uri: base_uri.into(),
            cache: DashMap::new(),
        };

        let version = registry.store.default_version().to_string();
        if registry.store.contains(&version, DEFS_SCHEMA) {
            registry.load_schema(DEFS_SCHEMA, Some(&version))?;
        } else {
            debug!("Store has no {} for version {}", DEFS_SCHEMA, version);
        }

        Ok(registry)
    }

    pub fn store(&self) -> &dyn SchemaStore {
        self.store.as_ref()
    }

    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }

    /// Version used when callers do not pass one
    pub fn default_version(&self) -> &str {
        self.store.default_version()
    }

    /// Identifier for `name` at `version` (or the default version)
    pub fn identifier(&self, name: &str, version: Option<&str>) -> SchemaIdentifier {
        let version = version.unwrap_or_else(|| self.default_version());
        SchemaIdentifier::new(self.base_uri.clone(), version, name)
    }

    /// Look up a schema by name, loading it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] if the pair is absent from the store.
    pub fn load_schema(&self, name: &str, version: Option<&str>) -> Result<Arc<SchemaDocument>> {
        self.resolve(&self.identifier(name, version))
    }

    /// Return the cached document for `id`, loading it from the store on a miss.
    ///
    /// # Errors
    ///
    /// Propagates [`crate::Error::NotFound`] from the store and
    /// [`crate::Error::InvalidFormat`] for unparsable documents.
    pub fn resolve(&self, id: &SchemaIdentifier) -> Result<Arc<SchemaDocument>> {
        if let Some(cached) = self.cache.get(id) {
            debug!("Cache hit for schema: {}", id);
            return Ok(Arc::clone(cached.value()));
        }

        trace!("Cache miss for schema: {}", id);

        let text = self.store.load(id.version(), id.name())?;
        let document = SchemaDocument::from_json(&text, &self.base_uri)?;
        let declared = document.id().clone();

        if &declared != id {
            warn!("Schema requested as {} declares $id {}", id, declared);
        }

        // First insert wins; documents are never replaced once cached.
        let cached = self
            .cache
            .entry(declared)
            .or_insert_with(|| {
                info!("Loaded schema: {}", document.id());
                Arc::new(document)
            })
            .value()
            .clone();

        Ok(cached)
    }

    /// Resolve a `$ref` string found in the document identified by `base`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] for documents missing from the
    /// store, [`crate::Error::OutsideNamespace`] for URIs outside the
    /// namespace and [`crate::Error::InvalidReference`] for unsupported
    /// fragments.
    pub fn resolve_reference(
        &self,
        reference: &str,
        base: &SchemaIdentifier,
    ) -> Result<ResolvedReference> {
        let (document_part, fragment) = split_reference(reference);
        let pointer = fragment_to_pointer(reference, fragment)?;

        let target_id = if document_part.is_empty() {
            base.clone()
        } else {
            let uri = join_uri(&base.uri(), document_part);
            SchemaIdentifier::parse(&uri, &self.base_uri)?
        };

        trace!("Resolving $ref {} from {} -> {}", reference, base, target_id);

        let document = self.resolve(&target_id)?;
        Ok(ResolvedReference::new(document, pointer))
    }

    /// Number of cached documents
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Whether `id` is already cached (does not load)
    pub fn contains(&self, id: &SchemaIdentifier) -> bool {
        self.cache.contains_key(id)
    }

    /// Cached identifiers, sorted
    pub fn identifiers(&self) -> Vec<SchemaIdentifier> {
        let mut ids: Vec<SchemaIdentifier> =
            self.cache.iter().map(|entry| entry.key().clone()).collect();
        ids.sort();
        ids
    }
}
