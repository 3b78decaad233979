//! `$ref` string handling: URI joining and JSON-pointer fragments

use crate::model::SchemaDocument;
use crate::{Error, Result};
use serde_json::Value;
use std::sync::Arc;

/// A `$ref` resolved to a cached document plus a pointer into it
#[derive(Debug, Clone)]
pub struct ResolvedReference {
    document: Arc<SchemaDocument>,
    pointer: String,
}

impl ResolvedReference {
    pub(crate) fn new(document: Arc<SchemaDocument>, pointer: String) -> Self {
        Self { document, pointer }
    }

    /// The document the reference lands in
    pub fn document(&self) -> &Arc<SchemaDocument> {
        &self.document
    }

    /// Decoded JSON pointer inside the document (empty for the whole document)
    pub fn pointer(&self) -> &str {
        &self.pointer
    }

    /// The referenced schema node.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidReference`] when the pointer does not exist in
    /// the document.
    pub fn target(&self) -> Result<&Value> {
        self.document.root().pointer(&self.pointer).ok_or_else(|| {
            Error::invalid_reference(
                format!("{}#{}", self.document.id(), self.pointer),
                "pointer does not exist in the target document",
            )
        })
    }
}

/// Split a reference into its document part and fragment.
pub fn split_reference(reference: &str) -> (&str, &str) {
    reference.split_once('#').unwrap_or((reference, ""))
}

/// Resolve `relative` against the absolute URI `base` (RFC 3986, for the
/// path forms schemas use in practice).
pub fn join_uri(base: &str, relative: &str) -> String {
    if relative.is_empty() {
        return base.to_string();
    }
    if relative.contains("://") {
        return relative.to_string();
    }

    // scheme://authority prefix of the base
    let authority_end = base
        .find("://")
        .and_then(|i| base[i + 3..].find('/').map(|j| i + 3 + j))
        .unwrap_or(base.len());
    let (origin, base_path) = base.split_at(authority_end);

    let mut segments: Vec<&str> = if relative.starts_with('/') {
        Vec::new()
    } else {
        let dir = base_path.rfind('/').map_or("", |i| &base_path[..i]);
        dir.split('/').filter(|s| !s.is_empty()).collect()
    };

    for part in relative.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    let mut joined = String::from(origin);
    for segment in &segments {
        joined.push('/');
        joined.push_str(segment);
    }
    if relative.ends_with('/') {
        joined.push('/');
    }
    joined
}

/// Turn a URI fragment into a JSON pointer usable with [`Value::pointer`].
///
/// Percent-escapes are decoded; `~0`/`~1` are left for the pointer lookup.
///
/// # Errors
///
/// Returns [`Error::InvalidReference`] for plain-name fragments (anchors)
/// and malformed percent-escapes.
pub fn fragment_to_pointer(reference: &str, fragment: &str) -> Result<String> {
    if fragment.is_empty() {
        return Ok(String::new());
    }
    if !fragment.starts_with('/') {
        return Err(Error::invalid_reference(
            reference,
            "only JSON-pointer fragments are supported",
        ));
    }

    let bytes = fragment.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = fragment
                .get(i + 1..i + 3)
                .and_then(|h| u8::from_str_radix(h, 16).ok())
                .ok_or_else(|| Error::invalid_reference(reference, "malformed percent-escape"))?;
            decoded.push(hex);
            i += 3;
        } else {
            decoded.push(bytes[i]);
            i += 1;
        }
    }

    String::from_utf8(decoded)
        .map_err(|_| Error::invalid_reference(reference, "fragment is not valid UTF-8"))
}
