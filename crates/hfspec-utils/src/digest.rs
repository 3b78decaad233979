//! Content digests of serializable values
//!
//! Values are rendered as JSON with sorted keys, `", "` and `": "`
//! separators, non-ASCII text left as is and floats written the way Python's
//! `repr` writes them. Hashing that text gives the same digest pyhf computes
//! for the same object.

use crate::{Error, Result};
use md5::Md5;
use serde::Serialize;
use serde_json::Value;
use serde_json::ser::{CompactFormatter, Formatter, Serializer};
use sha1::Sha1;
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512, Sha512_224, Sha512_256};
use sha3::{Sha3_224, Sha3_256, Sha3_384, Sha3_512};
use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::str::FromStr;
use tracing::trace;

/// Supported hash algorithms, named as Python's `hashlib` names them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DigestAlgorithm {
    Md5,
    Sha1,
    Sha224,
    #[default]
    Sha256,
    Sha384,
    Sha512,
    Sha512_224,
    Sha512_256,
    Sha3_224,
    Sha3_256,
    Sha3_384,
    Sha3_512,
}

impl DigestAlgorithm {
    pub const ALL: [DigestAlgorithm; 12] = [
        DigestAlgorithm::Md5,
        DigestAlgorithm::Sha1,
        DigestAlgorithm::Sha224,
        DigestAlgorithm::Sha256,
        DigestAlgorithm::Sha384,
        DigestAlgorithm::Sha512,
        DigestAlgorithm::Sha512_224,
        DigestAlgorithm::Sha512_256,
        DigestAlgorithm::Sha3_224,
        DigestAlgorithm::Sha3_256,
        DigestAlgorithm::Sha3_384,
        DigestAlgorithm::Sha3_512,
    ];

    /// Algorithm name as accepted by [`digest`]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Md5 => "md5",
            Self::Sha1 => "sha1",
            Self::Sha224 => "sha224",
            Self::Sha256 => "sha256",
            Self::Sha384 => "sha384",
            Self::Sha512 => "sha512",
            Self::Sha512_224 => "sha512_224",
            Self::Sha512_256 => "sha512_256",
            Self::Sha3_224 => "sha3_224",
            Self::Sha3_256 => "sha3_256",
            Self::Sha3_384 => "sha3_384",
            Self::Sha3_512 => "sha3_512",
        }
    }

    /// Lowercase hex hash of `bytes`
    pub fn hex(self, bytes: &[u8]) -> String {
        match self {
            Self::Md5 => to_hex(&Md5::digest(bytes)),
            Self::Sha1 => to_hex(&Sha1::digest(bytes)),
            Self::Sha224 => to_hex(&Sha224::digest(bytes)),
            Self::Sha256 => to_hex(&Sha256::digest(bytes)),
            Self::Sha384 => to_hex(&Sha384::digest(bytes)),
            Self::Sha512 => to_hex(&Sha512::digest(bytes)),
            Self::Sha512_224 => to_hex(&Sha512_224::digest(bytes)),
            Self::Sha512_256 => to_hex(&Sha512_256::digest(bytes)),
            Self::Sha3_224 => to_hex(&Sha3_224::digest(bytes)),
            Self::Sha3_256 => to_hex(&Sha3_256::digest(bytes)),
            Self::Sha3_384 => to_hex(&Sha3_384::digest(bytes)),
            Self::Sha3_512 => to_hex(&Sha3_512::digest(bytes)),
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DigestAlgorithm {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|alg| alg.as_str() == name)
            .ok_or_else(|| Error::UnknownAlgorithm(name.to_string()))
    }
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Digest of `obj` with the named algorithm, as lowercase hex.
///
/// # Errors
///
/// Returns [`Error::UnknownAlgorithm`] for names outside
/// [`DigestAlgorithm::ALL`] and [`Error::Unserializable`] when `obj` has no
/// JSON form (tensors, non-finite floats, non-string map keys).
pub fn digest(obj: &impl Serialize, algorithm: &str) -> Result<String> {
    let algorithm: DigestAlgorithm = algorithm.parse()?;
    let canonical = canonical_json(obj)?;
    trace!("Hashing {} canonical bytes with {}", canonical.len(), algorithm);
    Ok(algorithm.hex(canonical.as_bytes()))
}

/// [`digest`] with sha256
///
/// # Errors
///
/// Returns [`Error::Unserializable`] when `obj` has no JSON form.
pub fn digest_sha256(obj: &impl Serialize) -> Result<String> {
    digest(obj, DigestAlgorithm::Sha256.as_str())
}

/// The exact text that [`digest`] hashes.
///
/// # Errors
///
/// Returns [`Error::Unserializable`] when `obj` has no JSON form.
pub fn canonical_json(obj: &impl Serialize) -> Result<String> {
    let value = serde_json::to_value(obj).map_err(|e| Error::Unserializable(e.to_string()))?;
    let sorted = sort_keys(value);

    let mut buf = Vec::new();
    let mut serializer = Serializer::with_formatter(&mut buf, PythonFormatter);
    sorted
        .serialize(&mut serializer)
        .map_err(|e| Error::Unserializable(e.to_string()))?;

    String::from_utf8(buf).map_err(|e| Error::Unserializable(e.to_string()))
}

/// Rebuild objects with their keys in sorted order
fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<String, Value> =
                map.into_iter().map(|(k, v)| (k, sort_keys(v))).collect();
            Value::Object(sorted.into_iter().collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

/// `json.dumps` default layout: `", "` between items, `": "` after keys
struct PythonFormatter;

impl Formatter for PythonFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }

    fn write_f64<W>(&mut self, writer: &mut W, value: f64) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if value.is_finite() {
            writer.write_all(python_float_repr(value).as_bytes())
        } else {
            CompactFormatter.write_f64(writer, value)
        }
    }
}

/// Shortest round-trip rendering of a finite float, laid out like Python's
/// `repr`: positional for exponents in `-4..16`, otherwise scientific with a
/// signed, two-digit exponent.
fn python_float_repr(value: f64) -> String {
    let sign = if value.is_sign_negative() { "-" } else { "" };
    let scientific = format!("{:e}", value.abs());
    let (mantissa, exponent) = scientific
        .split_once('e')
        .unwrap_or((scientific.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let digits: String = mantissa.chars().filter(char::is_ascii_digit).collect();

    if (-4..16).contains(&exponent) {
        if exponent >= 0 {
            let int_len = usize::try_from(exponent).unwrap_or(0) + 1;
            if digits.len() <= int_len {
                format!("{sign}{digits}{}.0", "0".repeat(int_len - digits.len()))
            } else {
                format!("{sign}{}.{}", &digits[..int_len], &digits[int_len..])
            }
        } else {
            let zeros = usize::try_from(-exponent - 1).unwrap_or(0);
            format!("{sign}0.{}{digits}", "0".repeat(zeros))
        }
    } else {
        let mantissa = if digits.len() == 1 {
            digits
        } else {
            format!("{}.{}", &digits[..1], &digits[1..])
        };
        let exp_sign = if exponent < 0 { '-' } else { '+' };
        format!("{sign}{mantissa}e{exp_sign}{:02}", exponent.abs())
    }
}
