#![deny(warnings)]
#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # hfspec-ir
//!
//! Instance representation for statistical model specifications.
//!
//! Documents arrive as JSON or YAML but may also be assembled in memory by a
//! numeric backend, in which case some "lists" are really tensors. [`Value`]
//! models both so that validation can decide per call whether a tensor is
//! acceptable where a schema asks for an array.

/// Instance paths used to locate values inside a document.
pub mod path;
/// Value tree and tensor primitives.
pub mod value;

pub use path::{InstancePath, PathSegment};
pub use value::{Tensor, Value};

use thiserror::Error;

/// Errors that can occur when working with instance values
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid tensor: expected {expected} elements, found {found}")]
    InvalidTensor { expected: usize, found: usize },
}

/// Crate-local result type for IR operations.
pub type Result<T> = std::result::Result<T, Error>;
