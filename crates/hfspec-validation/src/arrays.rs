//! Array-like type extension
//!
//! Schemas say `"type": "array"`, but specifications built in memory may
//! carry numeric tensors where a plain list is expected. Backends registered
//! in an [`ArrayBackendRegistry`] decide which extra values count as arrays,
//! and a [`TypeExtensionPolicy`] freezes that decision for one validation.

use crate::{Error, Result};
use hfspec_ir::Value;
use std::borrow::Cow;
use std::fmt;
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

/// A provider of array-like values.
///
/// A backend that accepts a value must also expose its elements, so item
/// keywords see every value that passes `"type": "array"`.
pub trait ArrayBackend: Send + Sync + fmt::Debug {
    /// Unique backend name, e.g. `numpy`
    fn name(&self) -> &str;

    /// Elements of `value` when it is one of this backend's array types
    fn elements(&self, value: &Value) -> Option<Vec<Value>>;

    /// Whether `value` is one of this backend's array types
    fn is_array(&self, value: &Value) -> bool {
        self.elements(value).is_some()
    }
}

/// Matches [`Value::Tensor`] values of at least one dimension produced by
/// the named backend
#[derive(Debug, Clone)]
pub struct TensorBackend {
    name: String,
}

impl TensorBackend {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl ArrayBackend for TensorBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn elements(&self, value: &Value) -> Option<Vec<Value>> {
        if !self.is_array(value) {
            return None;
        }
        match value.as_tensor().map(hfspec_ir::Tensor::to_value) {
            Some(Value::Array(items)) => Some(items),
            _ => None,
        }
    }

    // Scalars (zero dimensions) have no elements and are not arrays.
    fn is_array(&self, value: &Value) -> bool {
        value
            .as_tensor()
            .is_some_and(|tensor| tensor.backend() == self.name && tensor.ndim() > 0)
    }
}

/// Element function type for [`PredicateBackend`]
pub type ArrayPredicate = Arc<dyn Fn(&Value) -> Option<Vec<Value>> + Send + Sync>;

/// Backend defined by a function returning the elements of the values it
/// accepts (`None` for everything else)
#[derive(Clone)]
pub struct PredicateBackend {
    name: String,
    predicate: ArrayPredicate,
}

impl PredicateBackend {
    pub fn new<F>(name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Value) -> Option<Vec<Value>> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            predicate: Arc::new(predicate),
        }
    }
}

impl fmt::Debug for PredicateBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PredicateBackend")
            .field("name", &self.name)
            .field("predicate", &"<fn>")
            .finish()
    }
}

impl ArrayBackend for PredicateBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn elements(&self, value: &Value) -> Option<Vec<Value>> {
        (self.predicate)(value)
    }
}

/// Shared, append-only list of array backends.
///
/// Cloning the registry shares the underlying list, so a backend registered
/// through any clone is visible to all of them from the next validation
/// call onwards.
#[derive(Debug, Clone, Default)]
pub struct ArrayBackendRegistry {
    backends: Arc<RwLock<Vec<Arc<dyn ArrayBackend>>>>,
}

impl ArrayBackendRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a backend.
    ///
    /// Returns `Ok(false)` and keeps the existing entry when a backend with
    /// the same name is already registered.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Backends`] if the lock is poisoned.
    pub fn register(&self, backend: impl ArrayBackend + 'static) -> Result<bool> {
        let mut backends = self
            .backends
            .write()
            .map_err(|e| Error::Backends(e.to_string()))?;

        if backends.iter().any(|b| b.name() == backend.name()) {
            warn!("Array backend already registered: {}", backend.name());
            return Ok(false);
        }

        debug!("Registered array backend: {}", backend.name());
        backends.push(Arc::new(backend));
        Ok(true)
    }

    /// Names of registered backends in registration order
    pub fn names(&self) -> Vec<String> {
        self.backends
            .read()
            .map(|backends| backends.iter().map(|b| b.name().to_string()).collect())
            .unwrap_or_default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.backends
            .read()
            .is_ok_and(|backends| backends.iter().any(|b| b.name() == name))
    }

    pub fn len(&self) -> usize {
        self.backends.read().map_or(0, |backends| backends.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the current backend list.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Backends`] if the lock is poisoned.
    pub fn snapshot(&self) -> Result<Vec<Arc<dyn ArrayBackend>>> {
        self.backends
            .read()
            .map(|backends| backends.clone())
            .map_err(|e| Error::Backends(e.to_string()))
    }
}

/// Per-call answer to "is this value an array?"
#[derive(Debug, Clone, Default)]
pub struct TypeExtensionPolicy {
    extended: Option<Vec<Arc<dyn ArrayBackend>>>,
}

impl TypeExtensionPolicy {
    /// Only [`Value::Array`] counts as an array
    pub fn strict() -> Self {
        Self { extended: None }
    }

    /// Plain arrays plus anything a backend registered right now accepts.
    ///
    /// Backends registered after this call are not seen by the policy.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Backends`] if the registry lock is poisoned.
    pub fn extended(registry: &ArrayBackendRegistry) -> Result<Self> {
        Ok(Self {
            extended: Some(registry.snapshot()?),
        })
    }

    #[must_use]
    pub fn is_extended(&self) -> bool {
        self.extended.is_some()
    }

    #[must_use]
    pub fn is_array_like(&self, value: &Value) -> bool {
        if matches!(value, Value::Array(_)) {
            return true;
        }
        self.extended
            .as_ref()
            .is_some_and(|backends| backends.iter().any(|b| b.is_array(value)))
    }

    /// Elements of an array-like value: lists as they are, backend values
    /// as their first accepting backend expands them.
    #[must_use]
    pub fn elements<'v>(&self, value: &'v Value) -> Option<Cow<'v, [Value]>> {
        if let Value::Array(items) = value {
            return Some(Cow::Borrowed(items.as_slice()));
        }
        self.extended
            .as_ref()?
            .iter()
            .find_map(|b| b.elements(value))
            .map(Cow::Owned)
    }

    /// Names of the backends this policy accepts (empty when strict)
    #[must_use]
    pub fn accepted_backends(&self) -> Vec<&str> {
        self.extended
            .as_ref()
            .map(|backends| backends.iter().map(|b| b.name()).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hfspec_ir::Tensor;

    fn numpy_tensor() -> Value {
        Value::from(Tensor::from_vec("numpy", vec![1.0, 2.0]))
    }

    #[test]
    fn test_strict_policy() {
        let policy = TypeExtensionPolicy::strict();
        assert!(!policy.is_extended());
        assert!(policy.is_array_like(&Value::Array(vec![])));
        assert!(!policy.is_array_like(&numpy_tensor()));
        assert!(!policy.is_array_like(&Value::from("abc")));
        assert!(policy.accepted_backends().is_empty());
    }

    #[test]
    fn test_extended_policy_with_tensor_backend() {
        let registry = ArrayBackendRegistry::new();
        registry.register(TensorBackend::new("numpy")).unwrap();

        let policy = TypeExtensionPolicy::extended(&registry).unwrap();
        assert!(policy.is_extended());
        assert!(policy.is_array_like(&numpy_tensor()));
        assert!(!policy.is_array_like(&Value::from(Tensor::from_vec("torch", vec![1.0]))));
        assert_eq!(policy.accepted_backends(), vec!["numpy"]);
    }

    #[test]
    fn test_extended_policy_without_backends() {
        let policy = TypeExtensionPolicy::extended(&ArrayBackendRegistry::new()).unwrap();
        assert!(policy.is_extended());
        assert!(!policy.is_array_like(&numpy_tensor()));
    }

    #[test]
    fn test_policy_snapshot_ignores_later_registration() {
        let registry = ArrayBackendRegistry::new();
        let policy = TypeExtensionPolicy::extended(&registry).unwrap();

        registry.register(TensorBackend::new("numpy")).unwrap();
        assert!(!policy.is_array_like(&numpy_tensor()));
        assert!(TypeExtensionPolicy::extended(&registry)
            .unwrap()
            .is_array_like(&numpy_tensor()));
    }

    #[test]
    fn test_scalar_tensor_is_not_array() {
        let registry = ArrayBackendRegistry::new();
        registry.register(TensorBackend::new("numpy")).unwrap();
        let policy = TypeExtensionPolicy::extended(&registry).unwrap();

        let scalar = Value::from(Tensor::new("numpy", vec![], vec![7.0]).unwrap());
        assert!(!policy.is_array_like(&scalar));
        assert!(policy.elements(&scalar).is_none());
    }

    #[test]
    fn test_tensor_elements() {
        let registry = ArrayBackendRegistry::new();
        registry.register(TensorBackend::new("numpy")).unwrap();
        let policy = TypeExtensionPolicy::extended(&registry).unwrap();

        let matrix = Value::from(Tensor::new("numpy", vec![2, 1], vec![1.0, 2.0]).unwrap());
        let rows = policy.elements(&matrix).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1], Value::Array(vec![Value::Float(2.0)]));

        assert!(TypeExtensionPolicy::strict().elements(&matrix).is_none());
        assert_eq!(
            TypeExtensionPolicy::strict()
                .elements(&Value::Array(vec![Value::Null]))
                .map(|items| items.len()),
            Some(1)
        );
    }

    #[test]
    fn test_duplicate_registration() {
        let registry = ArrayBackendRegistry::new();
        assert!(registry.register(TensorBackend::new("numpy")).unwrap());
        assert!(!registry.register(TensorBackend::new("numpy")).unwrap());
        assert_eq!(registry.len(), 1);
        assert!(registry.contains("numpy"));
        assert!(!registry.contains("jax"));
    }

    #[test]
    fn test_clones_share_registrations() {
        let registry = ArrayBackendRegistry::new();
        let shared = registry.clone();
        shared.register(TensorBackend::new("jax")).unwrap();
        assert_eq!(registry.names(), vec!["jax".to_string()]);
    }

    #[test]
    fn test_predicate_backend() {
        let registry = ArrayBackendRegistry::new();
        registry
            .register(PredicateBackend::new("csv-row", |v: &Value| {
                v.as_str()
                    .filter(|s| s.contains(','))
                    .map(|s| s.split(',').map(Value::from).collect())
            }))
            .unwrap();

        let policy = TypeExtensionPolicy::extended(&registry).unwrap();
        assert!(policy.is_array_like(&Value::from("1,2,3")));
        assert!(!policy.is_array_like(&Value::from("123")));
        assert_eq!(
            policy.elements(&Value::from("a,b")).map(Cow::into_owned),
            Some(vec![Value::from("a"), Value::from("b")])
        );

        let backend = PredicateBackend::new("p", |_: &Value| None);
        assert!(format!("{backend:?}").contains("<fn>"));
    }
}
