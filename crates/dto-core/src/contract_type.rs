//! Contract type definitions.
//!
//! A [`ContractType`] is built once and then only read. It owns its
//! attribute registry, normalizers, value validators and schema policy, plus
//! one piece of shared mutable state: the cache that memoizes deferred
//! contract-name lookups.

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use tracing::debug;

use crate::catalog::Catalog;
use crate::config::EngineConfig;
use crate::instance::Contract;
use crate::kind::{Computed, ContractRef, Kind};
use crate::registry::{AttributeRegistry, Descriptor};
use crate::validation::{SharedValidator, ValueErrors};
use crate::value::{Map, Value};

/// Value-transforming hook run after coercion.
pub type Normalizer = Arc<dyn Fn(Value) -> Value + Send + Sync>;

// ═══════════════════════════════════════════════════════════════════════════
// SCHEMA POLICY
// ═══════════════════════════════════════════════════════════════════════════

/// Structural validation policy, fixed when the type is defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SchemaPolicy {
    suppress_unexpected: bool,
}

impl SchemaPolicy {
    /// Missing and undeclared keys are both reported.
    #[must_use]
    pub const fn strict() -> Self {
        Self {
            suppress_unexpected: false,
        }
    }

    /// Undeclared keys are tolerated; missing keys and nested checks still apply.
    #[must_use]
    pub const fn permissive() -> Self {
        Self {
            suppress_unexpected: true,
        }
    }

    #[must_use]
    pub const fn suppresses_unexpected(self) -> bool {
        self.suppress_unexpected
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// CONTRACT TYPE
// ═══════════════════════════════════════════════════════════════════════════

struct TypeInner {
    name: String,
    registry: AttributeRegistry,
    normalizers: Vec<(String, Normalizer)>,
    validators: Vec<SharedValidator>,
    policy: SchemaPolicy,
    config: EngineConfig,
    catalog: Weak<Catalog>,
    resolved: Mutex<HashMap<String, Weak<TypeInner>>>,
}

/// Shared handle to a defined contract type.
#[derive(Clone)]
pub struct ContractType(Arc<TypeInner>);

impl ContractType {
    /// Start defining a new contract type.
    pub fn builder(name: impl Into<String>) -> ContractTypeBuilder {
        ContractTypeBuilder::new(name)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.0.name
    }

    #[must_use]
    pub fn registry(&self) -> &AttributeRegistry {
        &self.0.registry
    }

    #[must_use]
    pub fn policy(&self) -> SchemaPolicy {
        self.0.policy
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.0.config
    }

    /// Build an instance from raw input. Never fails.
    #[must_use]
    pub fn construct(&self, input: Map) -> Contract {
        Contract::new(self, input)
    }

    /// Resolve a contract reference to a type handle.
    ///
    /// Direct handles are returned as-is. Deferred names are looked up in
    /// this type's cache first, then in the owning catalog; a hit is stored
    /// for later calls. Returns `None` when the name is unknown.
    #[must_use]
    pub fn resolve(&self, reference: &ContractRef) -> Option<Self> {
        match reference {
            ContractRef::Direct(ty) => Some(ty.clone()),
            ContractRef::Deferred(name) => self.resolve_deferred(name),
        }
    }

    fn resolve_deferred(&self, name: &str) -> Option<Self> {
        let mut cache = self
            .0
            .resolved
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(hit) = cache.get(name).and_then(Weak::upgrade) {
            return Some(Self(hit));
        }

        let found = self
            .0
            .catalog
            .upgrade()
            .and_then(|catalog| catalog.get(name))
            .or_else(|| (name == self.name()).then(|| self.clone()))?;
        debug!(contract = %self.name(), reference = name, "cached deferred contract reference");
        cache.insert(name.to_string(), Arc::downgrade(&found.0));
        Some(found)
    }

    /// Number of memoized deferred references.
    #[must_use]
    pub fn resolved_count(&self) -> usize {
        self.0
            .resolved
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub(crate) fn normalizers(&self) -> impl Iterator<Item = (&str, &Normalizer)> {
        self.0
            .normalizers
            .iter()
            .map(|(name, normalizer)| (name.as_str(), normalizer))
    }

    pub(crate) fn run_validators(&self, contract: &Contract, errors: &mut ValueErrors) {
        for validator in &self.0.validators {
            validator.validate(contract, errors);
        }
    }

    #[must_use]
    pub fn same_type(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for ContractType {
    fn eq(&self, other: &Self) -> bool {
        self.same_type(other)
    }
}

impl fmt::Debug for ContractType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContractType")
            .field("name", &self.name())
            .field("attributes", &self.registry().declared_names())
            .field("policy", &self.policy())
            .finish_non_exhaustive()
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// BUILDER
// ═══════════════════════════════════════════════════════════════════════════

/// Fluent definition of a contract type.
///
/// # Example
///
/// ```rust,ignore
/// let address = ContractType::builder("Address")
///     .required("city", Kind::text())
///     .required("state", Kind::text())
///     .build();
/// ```
pub struct ContractTypeBuilder {
    name: String,
    registry: AttributeRegistry,
    normalizers: Vec<(String, Normalizer)>,
    validators: Vec<SharedValidator>,
    policy: Option<SchemaPolicy>,
    config: Option<EngineConfig>,
    catalog: Weak<Catalog>,
}

impl ContractTypeBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            registry: AttributeRegistry::new(),
            normalizers: Vec::new(),
            validators: Vec::new(),
            policy: None,
            config: None,
            catalog: Weak::new(),
        }
    }

    /// Derive from `parent`: copies its registry, normalizers, validators,
    /// policy, config and catalog link. The resolution cache starts empty.
    pub fn inherit(parent: &ContractType, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            registry: AttributeRegistry::inherit_from(parent.registry()),
            normalizers: parent.0.normalizers.clone(),
            validators: parent.0.validators.clone(),
            policy: Some(parent.policy()),
            config: Some(parent.config().clone()),
            catalog: parent.0.catalog.clone(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn attribute(mut self, descriptor: Descriptor) -> Self {
        self.registry.declare(descriptor);
        self
    }

    #[must_use]
    pub fn required(self, name: impl Into<String>, kind: Kind) -> Self {
        self.attribute(Descriptor::new(name, kind))
    }

    #[must_use]
    pub fn optional(self, name: impl Into<String>, kind: Kind) -> Self {
        self.attribute(Descriptor::new(name, kind).optional())
    }

    #[must_use]
    pub fn computed(
        self,
        name: impl Into<String>,
        f: impl Fn(&Contract) -> Value + Send + Sync + 'static,
    ) -> Self {
        self.attribute(Descriptor::new(name, Kind::Computed(Computed::new(f))))
    }

    /// Register a normalization hook for `name`. Hooks run in registration
    /// order after coercion and are skipped for nil values.
    #[must_use]
    pub fn normalize(
        mut self,
        name: impl Into<String>,
        f: impl Fn(Value) -> Value + Send + Sync + 'static,
    ) -> Self {
        self.normalizers.push((name.into(), Arc::new(f)));
        self
    }

    #[must_use]
    pub fn validator(mut self, validator: SharedValidator) -> Self {
        self.validators.push(validator);
        self
    }

    #[must_use]
    pub const fn permissive(mut self) -> Self {
        self.policy = Some(SchemaPolicy::permissive());
        self
    }

    #[must_use]
    pub const fn strict(mut self) -> Self {
        self.policy = Some(SchemaPolicy::strict());
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub(crate) fn attach(mut self, catalog: &Arc<Catalog>) -> Self {
        self.catalog = Arc::downgrade(catalog);
        if self.config.is_none() {
            self.config = Some(catalog.config().clone());
        }
        self
    }

    #[must_use]
    pub fn build(self) -> ContractType {
        let config = self.config.unwrap_or_default();
        let policy = self.policy.unwrap_or(if config.schema.permissive.as_bool() {
            SchemaPolicy::permissive()
        } else {
            SchemaPolicy::strict()
        });
        ContractType(Arc::new(TypeInner {
            name: self.name,
            registry: self.registry,
            normalizers: self.normalizers,
            validators: self.validators,
            policy,
            config,
            catalog: self.catalog,
            resolved: Mutex::new(HashMap::new()),
        }))
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// UNIT TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_reference_resolves_to_itself() {
        let address = ContractType::builder("Address").build();
        let user = ContractType::builder("User").build();
        let resolved = user.resolve(&ContractRef::from(&address));
        assert!(resolved.is_some_and(|ty| ty.same_type(&address)));
        assert_eq!(user.resolved_count(), 0);
    }

    #[test]
    fn test_self_reference_resolves_without_catalog() {
        let node = ContractType::builder("Node").build();
        let resolved = node.resolve(&ContractRef::deferred("Node"));
        assert!(resolved.is_some_and(|ty| ty.same_type(&node)));
        assert_eq!(node.resolved_count(), 1);
    }

    #[test]
    fn test_unknown_deferred_reference_is_not_cached() {
        let node = ContractType::builder("Node").build();
        assert!(node.resolve(&ContractRef::deferred("Missing")).is_none());
        assert_eq!(node.resolved_count(), 0);
    }

    #[test]
    fn test_inherited_type_copies_definition_with_fresh_cache() {
        let base = ContractType::builder("Base")
            .required("id", Kind::integer())
            .permissive()
            .build();
        let _ = base.resolve(&ContractRef::deferred("Base"));

        let child = ContractTypeBuilder::inherit(&base, "Child")
            .optional("note", Kind::text())
            .build();

        assert_eq!(child.registry().declared_names(), vec!["id", "note"]);
        assert_eq!(base.registry().declared_names(), vec!["id"]);
        assert!(child.policy().suppresses_unexpected());
        assert_eq!(base.resolved_count(), 1);
        assert_eq!(child.resolved_count(), 0);
    }
}
