//! Validation engine

use crate::arrays::{ArrayBackendRegistry, TypeExtensionPolicy};
use crate::keywords::{
    Keyword, KeywordKind, RuleResult, quote_all, render, render_schema, validate_bound,
    validate_const, validate_enum, validate_length, validate_max_items, validate_max_properties,
    validate_min_items, validate_min_properties, validate_multiple_of, validate_pattern,
    validate_required, validate_type, validate_unique_items,
};
use crate::reporter::{ValidationFailure, Violation};
use crate::{Error, Result};
use hfspec_ir::{InstancePath, Value};
use hfspec_schema::{SchemaIdentifier, SchemaRegistry};
use regex::Regex;
use serde_json::{Map, Value as JsonValue};
use std::collections::{HashMap, HashSet};
use tracing::{debug, trace};

/// Validation configuration
#[derive(Debug, Clone)]
pub struct ValidationConfig {
    /// Let registered array backends satisfy `"type": "array"`
    pub allow_extended_arrays: bool,
    /// Schema version used when a call does not name one
    /// (`None` defers to the registry's store)
    pub default_version: Option<String>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            allow_extended_arrays: true,
            default_version: None,
        }
    }
}

/// Main validation engine
///
/// Borrows a [`SchemaRegistry`] for schema lookup and shares an
/// [`ArrayBackendRegistry`] from which each call builds its
/// [`TypeExtensionPolicy`].
#[derive(Debug, Clone)]
pub struct ValidationEngine<'r> {
    registry: &'r SchemaRegistry,
    backends: ArrayBackendRegistry,
    config: ValidationConfig,
}

impl<'r> ValidationEngine<'r> {
    /// Create a new validation engine
    pub fn new(registry: &'r SchemaRegistry, backends: ArrayBackendRegistry) -> Self {
        Self::with_config(registry, backends, ValidationConfig::default())
    }

    /// Create with specific configuration
    pub fn with_config(
        registry: &'r SchemaRegistry,
        backends: ArrayBackendRegistry,
        config: ValidationConfig,
    ) -> Self {
        Self {
            registry,
            backends,
            config,
        }
    }

    pub fn registry(&self) -> &SchemaRegistry {
        self.registry
    }

    pub fn backends(&self) -> &ArrayBackendRegistry {
        &self.backends
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Policy for one call, frozen over the backends registered right now.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Backends`] if the backend registry lock is poisoned.
    pub fn policy(&self, allow_extended_arrays: bool) -> Result<TypeExtensionPolicy> {
        if allow_extended_arrays {
            TypeExtensionPolicy::extended(&self.backends)
        } else {
            Ok(TypeExtensionPolicy::strict())
        }
    }

    /// Validate `instance` against the named schema.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SchemaNotFound`] when the schema is unknown,
    /// [`Error::InvalidSpecification`] with every violation when the
    /// instance does not conform, and [`Error::Schema`] for broken schemas.
    pub fn validate(
        &self,
        instance: &Value,
        schema_name: &str,
        version: Option<&str>,
        allow_extended_arrays: bool,
    ) -> Result<()> {
        let policy = self.policy(allow_extended_arrays)?;
        self.validate_with_policy(instance, schema_name, version, &policy)
    }

    /// Validate using the engine's [`ValidationConfig`].
    ///
    /// # Errors
    ///
    /// See [`ValidationEngine::validate`].
    pub fn validate_default(&self, instance: &Value, schema_name: &str) -> Result<()> {
        self.validate(
            instance,
            schema_name,
            None,
            self.config.allow_extended_arrays,
        )
    }

    /// Validate with an explicit type-extension policy.
    ///
    /// # Errors
    ///
    /// See [`ValidationEngine::validate`].
    pub fn validate_with_policy(
        &self,
        instance: &Value,
        schema_name: &str,
        version: Option<&str>,
        policy: &TypeExtensionPolicy,
    ) -> Result<()> {
        let version = version.or(self.config.default_version.as_deref());
        let document = self.registry.load_schema(schema_name, version)?;
        let schema_id = document.id().clone();

        debug!(
            "Validating against {} (extended arrays: {:?})",
            schema_id,
            policy.accepted_backends()
        );

        let mut context = ValidationContext::new(self.registry, policy, schema_id.clone());
        let violations = context.validate(document.root(), instance)?;

        if violations.is_empty() {
            debug!("Instance is valid against {}", schema_id);
            return Ok(());
        }

        debug!(
            "Instance has {} violation(s) against {}",
            violations.len(),
            schema_id
        );
        Err(Error::InvalidSpecification(ValidationFailure::new(
            schema_name,
            schema_id,
            violations,
        )))
    }
}

/// State of one validation call.
///
/// Holds the frozen policy, the stack of documents that relative `$ref`s
/// resolve against, the references currently being followed and the
/// compiled patterns seen so far.
#[derive(Debug)]
pub struct ValidationContext<'a> {
    registry: &'a SchemaRegistry,
    policy: &'a TypeExtensionPolicy,
    target: SchemaIdentifier,
    bases: Vec<SchemaIdentifier>,
    active: HashSet<(String, InstancePath)>,
    patterns: HashMap<String, Regex>,
}

impl<'a> ValidationContext<'a> {
    pub fn new(
        registry: &'a SchemaRegistry,
        policy: &'a TypeExtensionPolicy,
        target: SchemaIdentifier,
    ) -> Self {
        Self {
            registry,
            policy,
            bases: vec![target.clone()],
            target,
            active: HashSet::new(),
            patterns: HashMap::new(),
        }
    }

    /// The schema the call validates against
    pub fn target(&self) -> &SchemaIdentifier {
        &self.target
    }

    pub fn policy(&self) -> &TypeExtensionPolicy {
        self.policy
    }

    /// Document that relative references currently resolve against
    pub fn base(&self) -> &SchemaIdentifier {
        self.bases.last().unwrap_or(&self.target)
    }

    /// Validate `instance` against `schema`, a node of the target document.
    ///
    /// # Errors
    ///
    /// Fails on unresolvable references and invalid patterns; instance
    /// problems are returned as violations.
    pub fn validate(&mut self, schema: &JsonValue, instance: &Value) -> Result<Vec<Violation>> {
        self.walk(schema, instance, &InstancePath::root())
    }

    fn walk(
        &mut self,
        schema: &JsonValue,
        instance: &Value,
        path: &InstancePath,
    ) -> Result<Vec<Violation>> {
        let object = match schema {
            JsonValue::Bool(true) => return Ok(Vec::new()),
            JsonValue::Bool(false) => {
                return Ok(vec![self.violation(
                    path,
                    KeywordKind::FalseSchema,
                    format!("False schema does not allow {}", render(instance)),
                )]);
            }
            JsonValue::Object(object) => object,
            other => {
                trace!("Ignoring non-schema value {} at {}", other, path);
                return Ok(Vec::new());
            }
        };

        let mut violations = Vec::new();
        for keyword in Keyword::parse(object) {
            self.apply(keyword, instance, path, &mut violations)?;
        }
        Ok(violations)
    }

    fn apply(
        &mut self,
        keyword: Keyword<'_>,
        instance: &Value,
        path: &InstancePath,
        out: &mut Vec<Violation>,
    ) -> Result<()> {
        let kind = keyword.kind();

        match keyword {
            Keyword::Ref(reference) => out.extend(self.follow_ref(reference, instance, path)?),
            Keyword::Type(types) => {
                self.push(out, path, kind, validate_type(instance, &types, self.policy));
            }
            Keyword::Enum(allowed) => self.push(out, path, kind, validate_enum(instance, allowed)),
            Keyword::Const(expected) => {
                self.push(out, path, kind, validate_const(instance, expected));
            }
            Keyword::Required(names) => {
                for result in validate_required(instance, &names) {
                    self.push(out, path, kind, result);
                }
            }
            Keyword::MinProperties(min) => {
                self.push(out, path, kind, validate_min_properties(instance, min));
            }
            Keyword::MaxProperties(max) => {
                self.push(out, path, kind, validate_max_properties(instance, max));
            }
            Keyword::Properties(properties) => {
                if let Some(object) = instance.as_object() {
                    for (name, schema) in properties {
                        if let Some(child) = object.get(name) {
                            out.extend(self.walk(schema, child, &path.key(name.as_str()))?);
                        }
                    }
                }
            }
            Keyword::PatternProperties(patterns) => {
                if let Some(object) = instance.as_object() {
                    for (pattern, schema) in patterns {
                        let regex = self.regex(pattern)?;
                        for (name, child) in object {
                            if regex.is_match(name) {
                                out.extend(self.walk(schema, child, &path.key(name.as_str()))?);
                            }
                        }
                    }
                }
            }
            Keyword::AdditionalProperties {
                schema,
                properties,
                patterns,
            } => self.additional_properties(schema, properties, patterns, instance, path, out)?,
            Keyword::MinItems(min) => {
                if let Some(items) = self.policy.elements(instance) {
                    self.push(out, path, kind, validate_min_items(instance, &items, min));
                }
            }
            Keyword::MaxItems(max) => {
                if let Some(items) = self.policy.elements(instance) {
                    self.push(out, path, kind, validate_max_items(instance, &items, max));
                }
            }
            Keyword::UniqueItems => {
                if let Some(items) = self.policy.elements(instance) {
                    self.push(out, path, kind, validate_unique_items(instance, &items));
                }
            }
            Keyword::Items(schema) => {
                if let Some(items) = self.policy.elements(instance) {
                    match schema {
                        JsonValue::Array(prefix) => {
                            for (i, (schema, item)) in prefix.iter().zip(items.iter()).enumerate() {
                                out.extend(self.walk(schema, item, &path.index(i))?);
                            }
                        }
                        schema => {
                            for (i, item) in items.iter().enumerate() {
                                out.extend(self.walk(schema, item, &path.index(i))?);
                            }
                        }
                    }
                }
            }
            Keyword::AdditionalItems { schema, prefix } => {
                if let Some(items) = self.policy.elements(instance) {
                    self.additional_items(schema, &items, prefix, path, out)?;
                }
            }
            Keyword::Minimum(limit)
            | Keyword::Maximum(limit)
            | Keyword::ExclusiveMinimum(limit)
            | Keyword::ExclusiveMaximum(limit) => {
                self.push(out, path, kind, validate_bound(instance, kind, limit));
            }
            Keyword::MultipleOf(divisor) => {
                self.push(out, path, kind, validate_multiple_of(instance, divisor));
            }
            Keyword::MinLength(limit) | Keyword::MaxLength(limit) => {
                self.push(out, path, kind, validate_length(instance, kind, limit));
            }
            Keyword::Pattern(pattern) => {
                let regex = self.regex(pattern)?;
                self.push(out, path, kind, validate_pattern(instance, pattern, &regex));
            }
            Keyword::AllOf(branches) => {
                for branch in branches {
                    out.extend(self.walk(branch, instance, path)?);
                }
            }
            Keyword::AnyOf(branches) => {
                let mut context = Vec::new();
                for branch in branches {
                    let failures = self.walk(branch, instance, path)?;
                    if failures.is_empty() {
                        return Ok(());
                    }
                    context.extend(failures);
                }
                let message = format!(
                    "{} is not valid under any of the given schemas",
                    render(instance)
                );
                out.push(self.violation(path, kind, message).with_context(context));
            }
            Keyword::OneOf(branches) => {
                let mut passing = Vec::new();
                let mut context = Vec::new();
                for branch in branches {
                    let failures = self.walk(branch, instance, path)?;
                    if failures.is_empty() {
                        passing.push(branch);
                        if passing.len() > 1 {
                            break;
                        }
                    } else {
                        context.extend(failures);
                    }
                }
                match passing.len() {
                    1 => {}
                    0 => {
                        let message = format!(
                            "{} is not valid under any of the given schemas",
                            render(instance)
                        );
                        out.push(self.violation(path, kind, message).with_context(context));
                    }
                    _ => {
                        let schemas: Vec<String> =
                            passing.iter().map(|s| render_schema(s)).collect();
                        let message = format!(
                            "{} is valid under each of {}",
                            render(instance),
                            schemas.join(", ")
                        );
                        out.push(self.violation(path, kind, message));
                    }
                }
            }
            Keyword::Not(schema) => {
                if self.walk(schema, instance, path)?.is_empty() {
                    let message = format!(
                        "{} should not be valid under {}",
                        render(instance),
                        render_schema(schema)
                    );
                    out.push(self.violation(path, kind, message));
                }
            }
        }

        Ok(())
    }

    /// Evaluate the referenced schema in place, relative to its own document.
    fn follow_ref(
        &mut self,
        reference: &str,
        instance: &Value,
        path: &InstancePath,
    ) -> Result<Vec<Violation>> {
        let resolved = self.registry.resolve_reference(reference, self.base())?;
        let location = format!("{}#{}", resolved.document().id(), resolved.pointer());
        let key = (location, path.clone());

        if self.active.contains(&key) {
            trace!("Reference cycle at {} for {:?}", key.0, path.to_string());
            return Ok(Vec::new());
        }

        trace!("Following $ref {} -> {}", reference, key.0);
        let target = resolved.target()?;

        self.active.insert(key.clone());
        self.bases.push(resolved.document().id().clone());
        let result = self.walk(target, instance, path);
        self.bases.pop();
        self.active.remove(&key);

        result
    }

    fn additional_properties(
        &mut self,
        schema: &JsonValue,
        properties: Option<&Map<String, JsonValue>>,
        patterns: Option<&Map<String, JsonValue>>,
        instance: &Value,
        path: &InstancePath,
        out: &mut Vec<Violation>,
    ) -> Result<()> {
        let Some(object) = instance.as_object() else {
            return Ok(());
        };

        let mut regexes = Vec::new();
        for pattern in patterns.into_iter().flat_map(Map::keys) {
            regexes.push(self.regex(pattern)?);
        }

        let extras: Vec<&String> = object
            .keys()
            .filter(|name| {
                !properties.is_some_and(|p| p.contains_key(name.as_str()))
                    && !regexes.iter().any(|r| r.is_match(name))
            })
            .collect();

        if extras.is_empty() {
            return Ok(());
        }

        if schema == &JsonValue::Bool(false) {
            let message = match patterns.filter(|p| !p.is_empty()) {
                Some(patterns) => {
                    let verb = if extras.len() == 1 { "does" } else { "do" };
                    let names: Vec<&String> = patterns.keys().collect();
                    format!(
                        "{} {} not match any of the regexes: {}",
                        quote_all(&extras),
                        verb,
                        quote_all(&names)
                    )
                }
                None => {
                    let verb = if extras.len() == 1 { "was" } else { "were" };
                    format!(
                        "Additional properties are not allowed ({} {} unexpected)",
                        quote_all(&extras),
                        verb
                    )
                }
            };
            out.push(self.violation(path, KeywordKind::AdditionalProperties, message));
            return Ok(());
        }

        for name in extras {
            if let Some(child) = object.get(name) {
                out.extend(self.walk(schema, child, &path.key(name.as_str()))?);
            }
        }
        Ok(())
    }

    fn additional_items(
        &mut self,
        schema: &JsonValue,
        items: &[Value],
        prefix: usize,
        path: &InstancePath,
        out: &mut Vec<Violation>,
    ) -> Result<()> {
        if items.len() <= prefix {
            return Ok(());
        }

        if schema == &JsonValue::Bool(false) {
            let extras: Vec<String> = items[prefix..].iter().map(render).collect();
            let verb = if extras.len() == 1 { "was" } else { "were" };
            let message = format!(
                "Additional items are not allowed ({} {} unexpected)",
                extras.join(", "),
                verb
            );
            out.push(self.violation(path, KeywordKind::AdditionalItems, message));
            return Ok(());
        }

        for (i, item) in items.iter().enumerate().skip(prefix) {
            out.extend(self.walk(schema, item, &path.index(i))?);
        }
        Ok(())
    }

    /// Compiled pattern, cached for the rest of the call
    fn regex(&mut self, pattern: &str) -> Result<Regex> {
        if let Some(regex) = self.patterns.get(pattern) {
            return Ok(regex.clone());
        }

        let regex = Regex::new(pattern).map_err(|e| {
            Error::Schema(hfspec_schema::Error::InvalidFormat(format!(
                "Invalid regex pattern '{pattern}' in {}: {e}",
                self.base()
            )))
        })?;
        self.patterns.insert(pattern.to_string(), regex.clone());
        Ok(regex)
    }

    fn violation(
        &self,
        path: &InstancePath,
        keyword: KeywordKind,
        message: impl Into<String>,
    ) -> Violation {
        Violation::new(path.clone(), keyword, message, self.base().clone())
    }

    fn push(
        &self,
        out: &mut Vec<Violation>,
        path: &InstancePath,
        keyword: KeywordKind,
        result: RuleResult,
    ) {
        if !result.is_valid {
            out.push(self.violation(path, keyword, result.message.unwrap_or_default()));
        }
    }
}
