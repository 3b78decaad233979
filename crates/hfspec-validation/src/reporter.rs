//! Violation reporting

use crate::keywords::KeywordKind;
use hfspec_ir::InstancePath;
use hfspec_schema::SchemaIdentifier;
use std::fmt;

/// A single keyword failure at one location of the instance
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    /// Where in the instance the failure occurred
    pub instance_path: InstancePath,
    /// Keyword that failed
    pub keyword: KeywordKind,
    pub message: String,
    /// Document the failing keyword belongs to
    pub schema_id: SchemaIdentifier,
    /// Branch failures behind an `anyOf` or `oneOf` violation
    pub context: Vec<Violation>,
}

impl Violation {
    pub fn new(
        instance_path: InstancePath,
        keyword: KeywordKind,
        message: impl Into<String>,
        schema_id: SchemaIdentifier,
    ) -> Self {
        Self {
            instance_path,
            keyword,
            message: message.into(),
            schema_id,
            context: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_context(mut self, context: Vec<Violation>) -> Self {
        self.context = context;
        self
    }

    /// Instance path for display; the root renders as `(root)`
    pub fn location(&self) -> String {
        if self.instance_path.is_root() {
            "(root)".to_string()
        } else {
            self.instance_path.to_string()
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} [{}]", self.location(), self.message, self.keyword)
    }
}

/// Every violation found while validating one instance
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationFailure {
    schema_name: String,
    schema_id: SchemaIdentifier,
    violations: Vec<Violation>,
}

impl ValidationFailure {
    pub fn new(
        schema_name: impl Into<String>,
        schema_id: SchemaIdentifier,
        violations: Vec<Violation>,
    ) -> Self {
        Self {
            schema_name: schema_name.into(),
            schema_id,
            violations,
        }
    }

    pub fn schema_name(&self) -> &str {
        &self.schema_name
    }

    pub fn schema_id(&self) -> &SchemaIdentifier {
        &self.schema_id
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn into_violations(self) -> Vec<Violation> {
        self.violations
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    /// The violation with the deepest instance path.
    ///
    /// Ties go to the violation reported first.
    pub fn deepest(&self) -> Option<&Violation> {
        self.violations.iter().fold(None, |best: Option<&Violation>, v| match best {
            Some(b) if b.instance_path.depth() >= v.instance_path.depth() => Some(b),
            _ => Some(v),
        })
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plural = if self.violations.len() == 1 { "" } else { "s" };
        write!(
            f,
            "Invalid specification for {} ({} violation{}):",
            self.schema_name,
            self.violations.len(),
            plural
        )?;
        for violation in &self.violations {
            write!(f, "\n  {violation}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model_id() -> SchemaIdentifier {
        SchemaIdentifier::new(hfspec_schema::DEFAULT_BASE_URI, "1.0.0", "model.json")
    }

    fn violation(path: InstancePath, keyword: KeywordKind, message: &str) -> Violation {
        Violation::new(path, keyword, message, model_id())
    }

    #[test]
    fn test_root_violation_display() {
        let v = violation(
            InstancePath::root(),
            KeywordKind::Required,
            "'channels' is a required property",
        );
        assert_eq!(
            v.to_string(),
            "(root): 'channels' is a required property [required]"
        );
    }

    #[test]
    fn test_deepest() {
        let shallow = InstancePath::root().key("channels").index(0);
        let deep = shallow.key("samples");
        let failure = ValidationFailure::new(
            "model.json",
            model_id(),
            vec![
                violation(shallow.clone(), KeywordKind::Required, "a"),
                violation(deep.clone(), KeywordKind::MinItems, "b"),
                violation(deep, KeywordKind::Type, "c"),
            ],
        );
        let deepest = failure.deepest().unwrap();
        assert_eq!(deepest.message, "b");
        assert_eq!(deepest.location(), "channels[0].samples");
    }

    #[test]
    fn test_failure_display_lists_violations() {
        let failure = ValidationFailure::new(
            "model.json",
            model_id(),
            vec![violation(
                InstancePath::root().key("channels"),
                KeywordKind::MinItems,
                "[] should be non-empty",
            )],
        );
        assert_eq!(
            failure.to_string(),
            "Invalid specification for model.json (1 violation):\n  channels: [] should be non-empty [minItems]"
        );
        assert_eq!(failure.len(), 1);
        assert!(!failure.is_empty());
    }

    #[test]
    fn test_empty_failure_has_no_deepest() {
        let failure = ValidationFailure::new("model.json", model_id(), Vec::new());
        assert!(failure.deepest().is_none());
    }
}
