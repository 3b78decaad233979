#![deny(warnings)]
#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # hfspec-schema
//!
//! Versioned schema store and caching registry for statistical model
//! specifications.
//!
//! Schemas are JSON Schema (draft-06) documents addressed by
//! `{base}{version}/{name}`. A [`SchemaStore`] hands out raw documents for a
//! `(version, name)` pair; a [`SchemaRegistry`] parses them, caches them
//! under their declared `$id`, and resolves `$ref` strings against the
//! referring document.

pub mod model;
pub mod reference;
pub mod registry;
pub mod store;

pub use model::{SchemaDocument, SchemaIdentifier};
pub use reference::ResolvedReference;
pub use registry::SchemaRegistry;
pub use store::{BundledStore, DirectoryStore, MemoryStore, SchemaStore};

use thiserror::Error;

/// Namespace every bundled schema identifier lives under
pub const DEFAULT_BASE_URI: &str = "https://scikit-hep.org/pyhf/schemas/";

/// Schema version used when a caller does not ask for one
pub const DEFAULT_VERSION: &str = "1.0.0";

/// Shared definitions referenced by most other schemas
pub const DEFS_SCHEMA: &str = "defs.json";

/// Errors that can occur when working with schemas
#[derive(Error, Debug)]
pub enum Error {
    #[error("Schema not found: {name} (version {version})")]
    NotFound { version: String, name: String },

    #[error("Schema {uri} is outside the namespace {base}")]
    OutsideNamespace { uri: String, base: String },

    #[error("Invalid schema format: {0}")]
    InvalidFormat(String),

    #[error("Invalid reference '{reference}': {reason}")]
    InvalidReference { reference: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build a not-found error for a `(version, name)` pair.
    pub fn not_found(version: impl Into<String>, name: impl Into<String>) -> Self {
        Self::NotFound {
            version: version.into(),
            name: name.into(),
        }
    }

    /// Build an error for a URI that does not name `{base}{version}/{name}`.
    pub fn outside_namespace(uri: impl Into<String>, base: impl Into<String>) -> Self {
        Self::OutsideNamespace {
            uri: uri.into(),
            base: base.into(),
        }
    }

    /// Build an invalid-reference error with the offending `$ref` string.
    pub fn invalid_reference(reference: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidReference {
            reference: reference.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
