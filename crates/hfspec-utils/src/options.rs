//! `key=value` option strings
//!
//! Values are read as YAML scalars or flow collections, so `1` becomes an
//! integer, `true` a boolean, `[1, 2]` a list and anything else a string.

use crate::{Error, Result};
use serde_json::Value;
use std::collections::BTreeMap;

/// Parse `key=value` entries into a mapping.
///
/// Each entry is split on its first `=`. An empty value maps to `null`;
/// later keys overwrite earlier ones.
///
/// # Errors
///
/// Returns [`Error::MissingDelimiter`] for an entry without `=` and
/// [`Error::InvalidValue`] when a value is not valid YAML.
pub fn options_from_eqdelimstring<S: AsRef<str>>(opts: &[S]) -> Result<BTreeMap<String, Value>> {
    opts.iter()
        .map(|opt| parse_eqdelim(opt.as_ref()))
        .collect()
}

/// Parse a single `key=value` argument; usable as a clap `value_parser`.
///
/// # Errors
///
/// See [`options_from_eqdelimstring`].
pub fn parse_eqdelim(opt: &str) -> Result<(String, Value)> {
    let (key, raw) = opt
        .split_once('=')
        .ok_or_else(|| Error::MissingDelimiter(opt.to_string()))?;
    let key = key.trim().to_string();
    let value = parse_value(&key, raw)?;
    Ok((key, value))
}

fn parse_value(key: &str, raw: &str) -> Result<Value> {
    if raw.trim().is_empty() {
        return Ok(Value::Null);
    }

    let invalid = |e: &dyn std::fmt::Display| Error::InvalidValue {
        key: key.to_string(),
        message: e.to_string(),
    };

    let yaml: serde_yaml::Value = serde_yaml::from_str(raw).map_err(|e| invalid(&e))?;
    serde_json::to_value(yaml).map_err(|e| invalid(&e))
}
