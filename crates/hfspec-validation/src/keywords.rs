//! Schema keywords and the checks that need no recursion
//!
//! A schema object is parsed into a list of [`Keyword`]s, one per keyword the
//! engine understands. Keywords that only look at the current instance
//! (`type`, `minItems`, `pattern`, ...) are checked by the functions in this
//! module; keywords holding sub-schemas are walked by the engine.

use crate::arrays::TypeExtensionPolicy;
use hfspec_ir::Value;
use regex::Regex;
use serde_json::{Map, Value as JsonValue};
use std::fmt;
use tracing::trace;

/// Longest rendering of an instance inside a message
const MAX_RENDERED: usize = 120;

/// The closed set of keywords the engine evaluates.
///
/// Declaration order is evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeywordKind {
    Ref,
    FalseSchema,
    Type,
    Enum,
    Const,
    Required,
    MinProperties,
    MaxProperties,
    Properties,
    PatternProperties,
    AdditionalProperties,
    MinItems,
    MaxItems,
    UniqueItems,
    Items,
    AdditionalItems,
    Minimum,
    Maximum,
    ExclusiveMinimum,
    ExclusiveMaximum,
    MultipleOf,
    MinLength,
    MaxLength,
    Pattern,
    AllOf,
    AnyOf,
    OneOf,
    Not,
}

impl KeywordKind {
    /// Keyword as spelled in a schema document
    pub fn as_str(self) -> &'static str {
        match self {
            KeywordKind::Ref => "$ref",
            KeywordKind::FalseSchema => "false",
            KeywordKind::Type => "type",
            KeywordKind::Enum => "enum",
            KeywordKind::Const => "const",
            KeywordKind::Required => "required",
            KeywordKind::MinProperties => "minProperties",
            KeywordKind::MaxProperties => "maxProperties",
            KeywordKind::Properties => "properties",
            KeywordKind::PatternProperties => "patternProperties",
            KeywordKind::AdditionalProperties => "additionalProperties",
            KeywordKind::MinItems => "minItems",
            KeywordKind::MaxItems => "maxItems",
            KeywordKind::UniqueItems => "uniqueItems",
            KeywordKind::Items => "items",
            KeywordKind::AdditionalItems => "additionalItems",
            KeywordKind::Minimum => "minimum",
            KeywordKind::Maximum => "maximum",
            KeywordKind::ExclusiveMinimum => "exclusiveMinimum",
            KeywordKind::ExclusiveMaximum => "exclusiveMaximum",
            KeywordKind::MultipleOf => "multipleOf",
            KeywordKind::MinLength => "minLength",
            KeywordKind::MaxLength => "maxLength",
            KeywordKind::Pattern => "pattern",
            KeywordKind::AllOf => "allOf",
            KeywordKind::AnyOf => "anyOf",
            KeywordKind::OneOf => "oneOf",
            KeywordKind::Not => "not",
        }
    }
}

impl fmt::Display for KeywordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One parsed keyword, borrowing its arguments from the schema document
#[derive(Debug, Clone, PartialEq)]
pub enum Keyword<'s> {
    Ref(&'s str),
    Type(Vec<&'s str>),
    Enum(&'s [JsonValue]),
    Const(&'s JsonValue),
    Required(Vec<&'s str>),
    MinProperties(usize),
    MaxProperties(usize),
    Properties(&'s Map<String, JsonValue>),
    PatternProperties(&'s Map<String, JsonValue>),
    /// Carries its sibling `properties` and `patternProperties`, which decide
    /// what counts as additional.
    AdditionalProperties {
        schema: &'s JsonValue,
        properties: Option<&'s Map<String, JsonValue>>,
        patterns: Option<&'s Map<String, JsonValue>>,
    },
    MinItems(usize),
    MaxItems(usize),
    UniqueItems,
    Items(&'s JsonValue),
    /// Only present when `items` is a list; `prefix` is that list's length.
    AdditionalItems {
        schema: &'s JsonValue,
        prefix: usize,
    },
    Minimum(f64),
    Maximum(f64),
    ExclusiveMinimum(f64),
    ExclusiveMaximum(f64),
    MultipleOf(f64),
    MinLength(usize),
    MaxLength(usize),
    Pattern(&'s str),
    AllOf(&'s [JsonValue]),
    AnyOf(&'s [JsonValue]),
    OneOf(&'s [JsonValue]),
    Not(&'s JsonValue),
}

impl<'s> Keyword<'s> {
    pub fn kind(&self) -> KeywordKind {
        match self {
            Keyword::Ref(_) => KeywordKind::Ref,
            Keyword::Type(_) => KeywordKind::Type,
            Keyword::Enum(_) => KeywordKind::Enum,
            Keyword::Const(_) => KeywordKind::Const,
            Keyword::Required(_) => KeywordKind::Required,
            Keyword::MinProperties(_) => KeywordKind::MinProperties,
            Keyword::MaxProperties(_) => KeywordKind::MaxProperties,
            Keyword::Properties(_) => KeywordKind::Properties,
            Keyword::PatternProperties(_) => KeywordKind::PatternProperties,
            Keyword::AdditionalProperties { .. } => KeywordKind::AdditionalProperties,
            Keyword::MinItems(_) => KeywordKind::MinItems,
            Keyword::MaxItems(_) => KeywordKind::MaxItems,
            Keyword::UniqueItems => KeywordKind::UniqueItems,
            Keyword::Items(_) => KeywordKind::Items,
            Keyword::AdditionalItems { .. } => KeywordKind::AdditionalItems,
            Keyword::Minimum(_) => KeywordKind::Minimum,
            Keyword::Maximum(_) => KeywordKind::Maximum,
            Keyword::ExclusiveMinimum(_) => KeywordKind::ExclusiveMinimum,
            Keyword::ExclusiveMaximum(_) => KeywordKind::ExclusiveMaximum,
            Keyword::MultipleOf(_) => KeywordKind::MultipleOf,
            Keyword::MinLength(_) => KeywordKind::MinLength,
            Keyword::MaxLength(_) => KeywordKind::MaxLength,
            Keyword::Pattern(_) => KeywordKind::Pattern,
            Keyword::AllOf(_) => KeywordKind::AllOf,
            Keyword::AnyOf(_) => KeywordKind::AnyOf,
            Keyword::OneOf(_) => KeywordKind::OneOf,
            Keyword::Not(_) => KeywordKind::Not,
        }
    }

    /// Parse the keywords of a schema object.
    ///
    /// A `$ref` hides every sibling keyword. Unknown keywords, annotations
    /// and `format` are skipped, as are keywords whose argument has the
    /// wrong shape.
    pub fn parse(schema: &'s Map<String, JsonValue>) -> Vec<Keyword<'s>> {
        if let Some(reference) = schema.get("$ref").and_then(JsonValue::as_str) {
            return vec![Keyword::Ref(reference)];
        }

        let mut keywords: Vec<Keyword<'s>> = schema
            .iter()
            .filter_map(|(name, value)| {
                let keyword = Self::parse_one(name, value, schema);
                if keyword.is_none() {
                    trace!("Skipping schema keyword: {}", name);
                }
                keyword
            })
            .collect();

        keywords.sort_by_key(Keyword::kind);
        keywords
    }

    fn parse_one(
        name: &str,
        value: &'s JsonValue,
        schema: &'s Map<String, JsonValue>,
    ) -> Option<Keyword<'s>> {
        let count = || value.as_u64().and_then(|n| usize::try_from(n).ok());

        let keyword = match name {
            "type" => Keyword::Type(match value {
                JsonValue::String(s) => vec![s.as_str()],
                JsonValue::Array(items) => items.iter().filter_map(JsonValue::as_str).collect(),
                _ => return None,
            }),
            "enum" => Keyword::Enum(value.as_array()?),
            "const" => Keyword::Const(value),
            "required" => Keyword::Required(
                value
                    .as_array()?
                    .iter()
                    .filter_map(JsonValue::as_str)
                    .collect(),
            ),
            "minProperties" => Keyword::MinProperties(count()?),
            "maxProperties" => Keyword::MaxProperties(count()?),
            "properties" => Keyword::Properties(value.as_object()?),
            "patternProperties" => Keyword::PatternProperties(value.as_object()?),
            "additionalProperties" => Keyword::AdditionalProperties {
                schema: value,
                properties: schema.get("properties").and_then(JsonValue::as_object),
                patterns: schema
                    .get("patternProperties")
                    .and_then(JsonValue::as_object),
            },
            "minItems" => Keyword::MinItems(count()?),
            "maxItems" => Keyword::MaxItems(count()?),
            "uniqueItems" if value.as_bool() == Some(true) => Keyword::UniqueItems,
            "items" => Keyword::Items(value),
            "additionalItems" => Keyword::AdditionalItems {
                schema: value,
                prefix: schema.get("items")?.as_array()?.len(),
            },
            "minimum" => Keyword::Minimum(value.as_f64()?),
            "maximum" => Keyword::Maximum(value.as_f64()?),
            "exclusiveMinimum" => Keyword::ExclusiveMinimum(value.as_f64()?),
            "exclusiveMaximum" => Keyword::ExclusiveMaximum(value.as_f64()?),
            "multipleOf" => Keyword::MultipleOf(value.as_f64().filter(|m| *m > 0.0)?),
            "minLength" => Keyword::MinLength(count()?),
            "maxLength" => Keyword::MaxLength(count()?),
            "pattern" => Keyword::Pattern(value.as_str()?),
            "allOf" => Keyword::AllOf(value.as_array()?),
            "anyOf" => Keyword::AnyOf(value.as_array()?),
            "oneOf" => Keyword::OneOf(value.as_array()?),
            "not" => Keyword::Not(value),
            _ => return None,
        };
        Some(keyword)
    }
}

/// Outcome of a single keyword check
#[derive(Debug, Clone)]
pub struct RuleResult {
    pub is_valid: bool,
    pub message: Option<String>,
}

impl RuleResult {
    #[must_use]
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            message: None,
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            message: Some(message.into()),
        }
    }
}

/// Render an instance for a message, shortened when large
pub fn render(value: &Value) -> String {
    truncate(value.to_string())
}

/// Render a schema fragment for a message
pub fn render_schema(value: &JsonValue) -> String {
    truncate(value.to_string())
}

fn truncate(text: String) -> String {
    if text.chars().count() <= MAX_RENDERED {
        return text;
    }
    let mut short: String = text.chars().take(MAX_RENDERED).collect();
    short.push_str("...");
    short
}

/// Quote a list of names as `'a', 'b'`
pub fn quote_all<S: AsRef<str>>(names: &[S]) -> String {
    names
        .iter()
        .map(|n| format!("'{}'", n.as_ref()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Whether `instance` has the JSON Schema type `type_name`.
///
/// `array` is answered by the policy; `integer` accepts integral floats.
#[must_use]
pub fn is_type(instance: &Value, type_name: &str, policy: &TypeExtensionPolicy) -> bool {
    match type_name {
        "array" => policy.is_array_like(instance),
        "object" => matches!(instance, Value::Object(_)),
        "string" => matches!(instance, Value::String(_)),
        "boolean" => matches!(instance, Value::Bool(_)),
        "null" => instance.is_null(),
        "number" => instance.as_f64().is_some(),
        "integer" => instance.is_integral(),
        _ => false,
    }
}

#[must_use]
pub fn validate_type(instance: &Value, types: &[&str], policy: &TypeExtensionPolicy) -> RuleResult {
    if types.iter().any(|t| is_type(instance, t, policy)) {
        return RuleResult::valid();
    }
    RuleResult::invalid(format!(
        "{} is not of type {}",
        render(instance),
        quote_all(types)
    ))
}

#[must_use]
pub fn validate_enum(instance: &Value, allowed: &[JsonValue]) -> RuleResult {
    if allowed.iter().any(|candidate| instance == candidate) {
        return RuleResult::valid();
    }
    RuleResult::invalid(format!(
        "{} is not one of {}",
        render(instance),
        truncate(JsonValue::Array(allowed.to_vec()).to_string())
    ))
}

#[must_use]
pub fn validate_const(instance: &Value, expected: &JsonValue) -> RuleResult {
    if instance == expected {
        return RuleResult::valid();
    }
    RuleResult::invalid(format!("{} was expected", render_schema(expected)))
}

/// One result per missing property, in the order the schema lists them
#[must_use]
pub fn validate_required(instance: &Value, required: &[&str]) -> Vec<RuleResult> {
    let Some(object) = instance.as_object() else {
        return Vec::new();
    };
    required
        .iter()
        .filter(|name| !object.contains_key(**name))
        .map(|name| RuleResult::invalid(format!("'{name}' is a required property")))
        .collect()
}

#[must_use]
pub fn validate_min_properties(instance: &Value, min: usize) -> RuleResult {
    match instance.as_object() {
        Some(object) if object.len() < min => {
            if min == 1 {
                RuleResult::invalid(format!("{} should be non-empty", render(instance)))
            } else {
                RuleResult::invalid(format!(
                    "{} does not have enough properties",
                    render(instance)
                ))
            }
        }
        _ => RuleResult::valid(),
    }
}

#[must_use]
pub fn validate_max_properties(instance: &Value, max: usize) -> RuleResult {
    match instance.as_object() {
        Some(object) if object.len() > max => {
            RuleResult::invalid(format!("{} has too many properties", render(instance)))
        }
        _ => RuleResult::valid(),
    }
}

/// `items` are the array view of `instance` (the elements of a list, or of a
/// tensor accepted as an array).
#[must_use]
pub fn validate_min_items(instance: &Value, items: &[Value], min: usize) -> RuleResult {
    if items.len() >= min {
        RuleResult::valid()
    } else if min == 1 {
        RuleResult::invalid(format!("{} should be non-empty", render(instance)))
    } else {
        RuleResult::invalid(format!("{} is too short", render(instance)))
    }
}

#[must_use]
pub fn validate_max_items(instance: &Value, items: &[Value], max: usize) -> RuleResult {
    if items.len() <= max {
        RuleResult::valid()
    } else if max == 0 {
        RuleResult::invalid(format!("{} is expected to be empty", render(instance)))
    } else {
        RuleResult::invalid(format!("{} is too long", render(instance)))
    }
}

#[must_use]
pub fn validate_unique_items(instance: &Value, items: &[Value]) -> RuleResult {
    for (i, a) in items.iter().enumerate() {
        if items[i + 1..].iter().any(|b| a.equivalent(b)) {
            return RuleResult::invalid(format!("{} has non-unique elements", render(instance)));
        }
    }
    RuleResult::valid()
}

/// Numeric bounds; non-numbers always pass.
#[must_use]
pub fn validate_bound(instance: &Value, kind: KeywordKind, limit: f64) -> RuleResult {
    let Some(number) = instance.as_f64() else {
        return RuleResult::valid();
    };

    let (ok, relation) = match kind {
        KeywordKind::Minimum => (number >= limit, "is less than the minimum of"),
        KeywordKind::Maximum => (number <= limit, "is greater than the maximum of"),
        KeywordKind::ExclusiveMinimum => {
            (number > limit, "is less than or equal to the minimum of")
        }
        KeywordKind::ExclusiveMaximum => {
            (number < limit, "is greater than or equal to the maximum of")
        }
        _ => return RuleResult::valid(),
    };

    if ok {
        RuleResult::valid()
    } else {
        RuleResult::invalid(format!(
            "{} {} {}",
            render(instance),
            relation,
            format_number(limit)
        ))
    }
}

#[must_use]
pub fn validate_multiple_of(instance: &Value, divisor: f64) -> RuleResult {
    let Some(number) = instance.as_f64() else {
        return RuleResult::valid();
    };

    let quotient = number / divisor;
    let ok = quotient.is_finite() && (quotient - quotient.round()).abs() < 1e-9;
    if ok {
        RuleResult::valid()
    } else {
        RuleResult::invalid(format!(
            "{} is not a multiple of {}",
            render(instance),
            format_number(divisor)
        ))
    }
}

/// Length in Unicode scalar values; non-strings always pass.
#[must_use]
pub fn validate_length(instance: &Value, kind: KeywordKind, limit: usize) -> RuleResult {
    let Some(text) = instance.as_str() else {
        return RuleResult::valid();
    };
    let len = text.chars().count();

    match kind {
        KeywordKind::MinLength if len < limit => {
            if limit == 1 {
                RuleResult::invalid(format!("{} should be non-empty", render(instance)))
            } else {
                RuleResult::invalid(format!("{} is too short", render(instance)))
            }
        }
        KeywordKind::MaxLength if len > limit => {
            RuleResult::invalid(format!("{} is too long", render(instance)))
        }
        _ => RuleResult::valid(),
    }
}

/// Unanchored regex search, as JSON Schema patterns are; non-strings pass.
#[must_use]
pub fn validate_pattern(instance: &Value, pattern: &str, regex: &Regex) -> RuleResult {
    match instance.as_str() {
        Some(text) if !regex.is_match(text) => {
            RuleResult::invalid(format!("{} does not match '{}'", render(instance), pattern))
        }
        _ => RuleResult::valid(),
    }
}

/// Integral limits print without a trailing `.0`
#[allow(clippy::cast_possible_truncation, clippy::float_cmp)]
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hfspec_ir::Tensor;
    use serde_json::json;

    fn object(value: JsonValue) -> Map<String, JsonValue> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_parse_ref_hides_siblings() {
        let schema = object(json!({"$ref": "#/definitions/a", "type": "string"}));
        let keywords = Keyword::parse(&schema);
        assert_eq!(keywords, vec![Keyword::Ref("#/definitions/a")]);
    }

    #[test]
    fn test_parse_orders_by_kind_and_skips_unknown() {
        let schema = object(json!({
            "required": ["a"],
            "type": "object",
            "description": "ignored",
            "format": "uri",
            "minItems": 1
        }));
        let kinds: Vec<KeywordKind> = Keyword::parse(&schema).iter().map(Keyword::kind).collect();
        assert_eq!(
            kinds,
            vec![KeywordKind::Type, KeywordKind::Required, KeywordKind::MinItems]
        );
    }

    #[test]
    fn test_parse_additional_items_needs_item_list() {
        let schema = object(json!({"items": {"type": "number"}, "additionalItems": false}));
        let kinds: Vec<KeywordKind> = Keyword::parse(&schema).iter().map(Keyword::kind).collect();
        assert_eq!(kinds, vec![KeywordKind::Items]);

        let schema = object(json!({"items": [{}, {}], "additionalItems": false}));
        assert!(Keyword::parse(&schema).contains(&Keyword::AdditionalItems {
            schema: &JsonValue::Bool(false),
            prefix: 2
        }));
    }

    #[test]
    fn test_parse_malformed_arguments_skipped() {
        let schema = object(json!({"minItems": "one", "uniqueItems": false, "multipleOf": 0}));
        assert!(Keyword::parse(&schema).is_empty());
    }

    #[test]
    fn test_type_checks() {
        let strict = TypeExtensionPolicy::strict();
        assert!(is_type(&Value::Integer(1), "number", &strict));
        assert!(is_type(&Value::Float(2.0), "integer", &strict));
        assert!(!is_type(&Value::Float(2.5), "integer", &strict));
        assert!(!is_type(&Value::Bool(true), "integer", &strict));
        assert!(is_type(&Value::Array(vec![]), "array", &strict));
        assert!(!is_type(
            &Value::from(Tensor::from_vec("numpy", vec![1.0])),
            "array",
            &strict
        ));
    }

    #[test]
    fn test_type_message() {
        let strict = TypeExtensionPolicy::strict();
        let result = validate_type(&Value::from("x"), &["array", "null"], &strict);
        assert!(!result.is_valid);
        assert_eq!(
            result.message.unwrap(),
            "\"x\" is not of type 'array', 'null'"
        );
    }

    #[test]
    fn test_enum_and_const() {
        assert!(validate_enum(&Value::Integer(1), &[json!(1.0), json!("a")]).is_valid);
        assert!(!validate_enum(&Value::Integer(2), &[json!(1), json!("a")]).is_valid);
        assert!(validate_const(&Value::from("lumi"), &json!("lumi")).is_valid);

        let result = validate_const(&Value::from("x"), &json!("histosys"));
        assert_eq!(result.message.unwrap(), "\"histosys\" was expected");
    }

    #[test]
    fn test_required() {
        let instance = Value::from(json!({"name": "SR"}));
        let results = validate_required(&instance, &["name", "samples", "data"]);
        let messages: Vec<String> = results.into_iter().filter_map(|r| r.message).collect();
        assert_eq!(
            messages,
            vec![
                "'samples' is a required property",
                "'data' is a required property"
            ]
        );
        assert!(validate_required(&Value::Integer(1), &["a"]).is_empty());
    }

    #[test]
    fn test_item_counts() {
        let empty = Value::Array(vec![]);
        let result = validate_min_items(&empty, &[], 1);
        assert_eq!(result.message.unwrap(), "[] should be non-empty");

        let one = Value::from(json!([1]));
        let items = one.as_array().unwrap();
        assert_eq!(
            validate_min_items(&one, items, 2).message.unwrap(),
            "[1] is too short"
        );
        assert!(validate_max_items(&one, items, 1).is_valid);
        assert_eq!(
            validate_max_items(&one, items, 0).message.unwrap(),
            "[1] is expected to be empty"
        );
    }

    #[test]
    fn test_unique_items_numeric_equivalence() {
        let value = Value::from(json!([1, 1.0]));
        let result = validate_unique_items(&value, value.as_array().unwrap());
        assert_eq!(result.message.unwrap(), "[1, 1.0] has non-unique elements");

        let value = Value::from(json!([{"a": 1}, {"a": 2}]));
        assert!(validate_unique_items(&value, value.as_array().unwrap()).is_valid);
    }

    #[test]
    fn test_bounds() {
        let result = validate_bound(&Value::Integer(-1), KeywordKind::Minimum, 0.0);
        assert_eq!(result.message.unwrap(), "-1 is less than the minimum of 0");
        assert!(validate_bound(&Value::Integer(0), KeywordKind::Minimum, 0.0).is_valid);
        assert!(!validate_bound(&Value::Integer(0), KeywordKind::ExclusiveMinimum, 0.0).is_valid);
        assert!(!validate_bound(&Value::Float(1.5), KeywordKind::Maximum, 1.0).is_valid);
        assert!(validate_bound(&Value::from("x"), KeywordKind::Maximum, 1.0).is_valid);
    }

    #[test]
    fn test_multiple_of() {
        assert!(validate_multiple_of(&Value::Integer(4), 2.0).is_valid);
        assert!(validate_multiple_of(&Value::Float(0.3), 0.1).is_valid);
        let result = validate_multiple_of(&Value::Integer(3), 2.0);
        assert_eq!(result.message.unwrap(), "3 is not a multiple of 2");
    }

    #[test]
    fn test_length_counts_chars() {
        assert!(validate_length(&Value::from("héllo"), KeywordKind::MaxLength, 5).is_valid);
        let result = validate_length(&Value::from(""), KeywordKind::MinLength, 1);
        assert_eq!(result.message.unwrap(), "\"\" should be non-empty");
    }

    #[test]
    fn test_pattern_is_search() {
        let regex = Regex::new("b").unwrap();
        assert!(validate_pattern(&Value::from("abc"), "b", &regex).is_valid);
        let regex = Regex::new("^a").unwrap();
        let result = validate_pattern(&Value::from("b"), "^a", &regex);
        assert_eq!(result.message.unwrap(), "\"b\" does not match '^a'");
    }

    #[test]
    fn test_render_truncates() {
        let long = Value::from("x".repeat(500));
        let rendered = render(&long);
        assert!(rendered.ends_with("..."));
        assert_eq!(rendered.chars().count(), MAX_RENDERED + 3);
    }
}
