#![deny(warnings)]
#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # hfspec-utils
//!
//! Stateless helpers used around specification handling:
//!
//! - [`digest`]: content hash of any serializable value, stable across key
//!   order and compatible with digests produced by pyhf.
//! - [`citation`]: the BibTeX entry to cite.
//! - [`options_from_eqdelimstring`]: `key=value` strings to a typed mapping.

pub mod citation;
pub mod digest;
pub mod options;

pub use citation::citation;
pub use digest::{DigestAlgorithm, canonical_json, digest, digest_sha256};
pub use options::{options_from_eqdelimstring, parse_eqdelim};

use thiserror::Error;

/// Errors that can occur in the helpers
#[derive(Error, Debug)]
pub enum Error {
    #[error("The supplied object is not JSON-serializable for calculating a hash: {0}")]
    Unserializable(String),

    #[error("Unsupported digest algorithm: {0}")]
    UnknownAlgorithm(String),

    #[error("{0} is not a valid equal-delimited string")]
    MissingDelimiter(String),

    #[error("Invalid value for option '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

pub type Result<T> = std::result::Result<T, Error>;
