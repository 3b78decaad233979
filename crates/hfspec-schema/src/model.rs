//! Schema identifiers and parsed schema documents

use crate::{Error, Result};
use serde_json::Value;
use std::fmt;

/// Canonical key of a schema document: `(base, version, name)`.
///
/// Two identifiers are equal iff all three components match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchemaIdentifier {
    base: String,
    version: String,
    name: String,
}

impl SchemaIdentifier {
    /// Create an identifier from its components
    pub fn new(
        base: impl Into<String>,
        version: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            base: base.into(),
            version: version.into(),
            name: name.into(),
        }
    }

    /// Split a full URI such as `https://.../schemas/1.0.0/model.json` into
    /// its components relative to `base`.
    ///
    /// A fragment (`#...`) on the URI is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutsideNamespace`] when the URI does not live under
    /// `base` or lacks a version or name.
    pub fn parse(uri: &str, base: &str) -> Result<Self> {
        let without_fragment = uri.split_once('#').map_or(uri, |(doc, _)| doc);
        let rest = without_fragment
            .strip_prefix(base)
            .ok_or_else(|| Error::outside_namespace(without_fragment, base))?;

        match rest.split_once('/') {
            Some((version, name)) if !version.is_empty() && !name.is_empty() => {
                Ok(Self::new(base, version, name))
            }
            _ => Err(Error::outside_namespace(without_fragment, base)),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Full URI form, `{base}{version}/{name}`
    pub fn uri(&self) -> String {
        format!("{}{}/{}", self.base, self.version, self.name)
    }

    /// Another schema in the same namespace and version
    #[must_use]
    pub fn sibling(&self, name: impl Into<String>) -> Self {
        Self::new(self.base.clone(), self.version.clone(), name)
    }
}

impl fmt::Display for SchemaIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}/{}", self.base, self.version, self.name)
    }
}

/// A parsed, immutable schema document.
#[derive(Debug)]
pub struct SchemaDocument {
    id: SchemaIdentifier,
    root: Value,
}

impl SchemaDocument {
    /// Wrap a parsed JSON document, reading its declared `$id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidFormat`] if the document is not an object,
    /// has no string `$id`, or declares an id outside `base`.
    pub fn from_value(root: Value, base: &str) -> Result<Self> {
        if !root.is_object() {
            return Err(Error::InvalidFormat(
                "schema document must be a JSON object".to_string(),
            ));
        }

        let declared = root
            .get("$id")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::InvalidFormat("schema document has no \"$id\"".to_string()))?;

        let id = SchemaIdentifier::parse(declared, base).map_err(|_| {
            Error::InvalidFormat(format!(
                "declared \"$id\" {declared} is outside the namespace {base}"
            ))
        })?;

        Ok(Self { id, root })
    }

    /// Parse a JSON string into a document
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidFormat`] on malformed JSON or a bad `$id`.
    pub fn from_json(text: &str, base: &str) -> Result<Self> {
        let root: Value = serde_json::from_str(text)
            .map_err(|e| Error::InvalidFormat(format!("JSON parse error: {e}")))?;
        Self::from_value(root, base)
    }

    /// The declared identifier
    pub fn id(&self) -> &SchemaIdentifier {
        &self.id
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    /// The `$schema` dialect the document declares, if any
    pub fn dialect(&self) -> Option<&str> {
        self.root.get("$schema").and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DEFAULT_BASE_URI;
    use serde_json::json;

    #[test]
    fn test_identifier_uri() {
        let id = SchemaIdentifier::new(DEFAULT_BASE_URI, "1.0.0", "model.json");
        assert_eq!(
            id.uri(),
            "https://scikit-hep.org/pyhf/schemas/1.0.0/model.json"
        );
        assert_eq!(id.to_string(), id.uri());
    }

    #[test]
    fn test_identifier_parse() {
        let id = SchemaIdentifier::parse(
            "https://scikit-hep.org/pyhf/schemas/1.0.0/defs.json#/definitions/channel",
            DEFAULT_BASE_URI,
        )
        .unwrap();
        assert_eq!(id.version(), "1.0.0");
        assert_eq!(id.name(), "defs.json");
        assert_eq!(id.base(), DEFAULT_BASE_URI);
    }

    #[test]
    fn test_identifier_parse_outside_base() {
        let err = SchemaIdentifier::parse("https://example.com/1.0.0/a.json", DEFAULT_BASE_URI)
            .unwrap_err();
        assert!(matches!(err, Error::OutsideNamespace { .. }));
        assert_eq!(
            err.to_string(),
            "Schema https://example.com/1.0.0/a.json is outside the namespace https://scikit-hep.org/pyhf/schemas/"
        );
    }

    #[test]
    fn test_identifier_parse_missing_name() {
        assert!(SchemaIdentifier::parse(
            "https://scikit-hep.org/pyhf/schemas/1.0.0/",
            DEFAULT_BASE_URI
        )
        .is_err());
    }

    #[test]
    fn test_identifier_equality_uses_all_components() {
        let a = SchemaIdentifier::new(DEFAULT_BASE_URI, "1.0.0", "model.json");
        let b = SchemaIdentifier::new(DEFAULT_BASE_URI, "1.0.1", "model.json");
        let c = SchemaIdentifier::new("https://other/", "1.0.0", "model.json");
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(a, a.sibling("model.json"));
    }

    #[test]
    fn test_document_from_value() {
        let doc = SchemaDocument::from_value(
            json!({
                "$schema": "http://json-schema.org/draft-06/schema#",
                "$id": "https://scikit-hep.org/pyhf/schemas/1.0.0/model.json",
                "type": "object"
            }),
            DEFAULT_BASE_URI,
        )
        .unwrap();
        assert_eq!(doc.id().name(), "model.json");
        assert_eq!(
            doc.dialect(),
            Some("http://json-schema.org/draft-06/schema#")
        );
    }

    #[test]
    fn test_document_requires_id() {
        let err = SchemaDocument::from_value(json!({"type": "object"}), DEFAULT_BASE_URI)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidFormat(_)));
    }

    #[test]
    fn test_document_rejects_foreign_id() {
        let err = SchemaDocument::from_value(
            json!({"$id": "https://example.com/x.json"}),
            DEFAULT_BASE_URI,
        )
        .unwrap_err();
        assert!(err.to_string().contains("outside the namespace"));
    }

    #[test]
    fn test_document_from_json_invalid() {
        let err = SchemaDocument::from_json("not json", DEFAULT_BASE_URI).unwrap_err();
        assert!(matches!(err, Error::InvalidFormat(_)));
    }
}
