#![deny(warnings)]
#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # hfspec-validation
//!
//! Validation of statistical model specifications against registered
//! schemas.
//!
//! The engine walks a schema document keyword by keyword, resolving `$ref`
//! through a [`hfspec_schema::SchemaRegistry`] and asking a
//! [`TypeExtensionPolicy`] whether a value counts as an `array`. Every
//! violation found is collected before the call returns.
//!
//! ## Example Usage
//!
//! ```rust
//! use hfspec_ir::Value;
//! use hfspec_schema::SchemaRegistry;
//! use hfspec_validation::{ArrayBackendRegistry, ValidationEngine};
//! use serde_json::json;
//!
//! let registry = SchemaRegistry::bundled().unwrap();
//! let engine = ValidationEngine::new(&registry, ArrayBackendRegistry::new());
//!
//! let model = Value::from(json!({
//!     "channels": [{"name": "SR", "samples": [{"name": "sig", "data": [1, 2]}]}]
//! }));
//! engine.validate(&model, "model.json", None, true).unwrap();
//! ```

pub mod arrays;
pub mod engine;
pub mod keywords;
pub mod reporter;

// Re-export main types
pub use arrays::{
    ArrayBackend, ArrayBackendRegistry, PredicateBackend, TensorBackend, TypeExtensionPolicy,
};
pub use engine::{ValidationConfig, ValidationContext, ValidationEngine};
pub use keywords::{Keyword, KeywordKind};
pub use reporter::{ValidationFailure, Violation};

use hfspec_ir::Value;
use hfspec_schema::SchemaRegistry;
use thiserror::Error;

/// Errors that can occur during validation
#[derive(Error, Debug)]
pub enum Error {
    #[error("Schema not found: {name} (version {version})")]
    SchemaNotFound { name: String, version: String },

    #[error("Schema error: {0}")]
    Schema(hfspec_schema::Error),

    #[error("{0}")]
    InvalidSpecification(ValidationFailure),

    #[error("Array backend registry error: {0}")]
    Backends(String),
}

impl From<hfspec_schema::Error> for Error {
    fn from(err: hfspec_schema::Error) -> Self {
        match err {
            hfspec_schema::Error::NotFound { version, name } => {
                Error::SchemaNotFound { name, version }
            }
            other => Error::Schema(other),
        }
    }
}

impl Error {
    /// The failure details when the instance itself was invalid
    pub fn as_failure(&self) -> Option<&ValidationFailure> {
        match self {
            Error::InvalidSpecification(failure) => Some(failure),
            _ => None,
        }
    }
}

/// Name used for this crate's error in downstream signatures
pub type ValidationError = Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Convenience function to validate an instance against a named schema
///
/// With `allow_tensors`, values from any backend currently registered in
/// `backends` satisfy `"type": "array"`.
///
/// # Errors
///
/// Returns [`Error::SchemaNotFound`] for unknown schemas and
/// [`Error::InvalidSpecification`] when the instance does not validate.
pub fn validate(
    registry: &SchemaRegistry,
    backends: &ArrayBackendRegistry,
    instance: &Value,
    schema_name: &str,
    version: Option<&str>,
    allow_tensors: bool,
) -> Result<()> {
    ValidationEngine::new(registry, backends.clone()).validate(
        instance,
        schema_name,
        version,
        allow_tensors,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use hfspec_ir::Tensor;
    use serde_json::json;

    #[test]
    fn test_convenience_validate() {
        let registry = SchemaRegistry::bundled().unwrap();
        let backends = ArrayBackendRegistry::new();
        let instance = Value::from(json!({
            "channels": [{"name": "SR", "samples": [{"name": "sig", "data": [1, 2]}]}]
        }));
        validate(&registry, &backends, &instance, "model.json", None, true).unwrap();
    }

    #[test]
    fn test_convenience_validate_tensor_flag() {
        let registry = SchemaRegistry::bundled().unwrap();
        let backends = ArrayBackendRegistry::new();
        backends.register(TensorBackend::new("numpy")).unwrap();

        let sample: Value = [
            ("name".to_string(), Value::from("sig")),
            (
                "data".to_string(),
                Value::from(Tensor::from_vec("numpy", vec![1.0, 2.0])),
            ),
        ]
        .into_iter()
        .collect();
        let channel: Value = [
            ("name".to_string(), Value::from("SR")),
            ("samples".to_string(), Value::Array(vec![sample])),
        ]
        .into_iter()
        .collect();
        let model: Value = [("channels".to_string(), Value::Array(vec![channel]))]
            .into_iter()
            .collect();

        assert!(validate(&registry, &backends, &model, "model.json", None, true).is_ok());
        let err = validate(&registry, &backends, &model, "model.json", None, false).unwrap_err();
        assert!(matches!(err, Error::InvalidSpecification(_)));
    }

    #[test]
    fn test_schema_error_mapping() {
        let err: Error = hfspec_schema::Error::not_found("0.0.0", "defs.json").into();
        assert!(matches!(err, Error::SchemaNotFound { .. }));

        let err: Error = hfspec_schema::Error::InvalidFormat("bad".to_string()).into();
        assert!(matches!(err, Error::Schema(_)));
        assert!(err.as_failure().is_none());
    }
}
