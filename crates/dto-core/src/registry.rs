//! Attribute descriptors and the per-type attribute registry.
//!
//! A registry is a plain value: derived types receive a copy of their
//! parent's registry, so redeclaring an attribute in a child never reaches
//! back into the parent.

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

use std::fmt;
use std::sync::Arc;

use crate::kind::Kind;
use crate::value::Value;

/// Default applied when an attribute is absent or provided as nil.
#[derive(Clone)]
pub enum DefaultValue {
    Static(Value),
    /// Evaluated once per construction
    Dynamic(Arc<dyn Fn() -> Value + Send + Sync>),
}

impl DefaultValue {
    #[must_use]
    pub fn resolve(&self) -> Value {
        match self {
            Self::Static(value) => value.clone(),
            Self::Dynamic(f) => f(),
        }
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(value) => f.debug_tuple("Static").field(value).finish(),
            Self::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

/// Metadata for one declared attribute.
#[derive(Debug, Clone)]
pub struct Descriptor {
    name: String,
    kind: Kind,
    optional: bool,
    default: Option<DefaultValue>,
    description: Option<String>,
    permissive_fallback: bool,
}

impl Descriptor {
    pub fn new(name: impl Into<String>, kind: Kind) -> Self {
        Self {
            name: name.into().trim().to_string(),
            kind,
            optional: false,
            default: None,
            description: None,
            permissive_fallback: false,
        }
    }

    #[must_use]
    pub const fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    #[must_use]
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(DefaultValue::Static(value.into()));
        self
    }

    #[must_use]
    pub fn default_with(mut self, f: impl Fn() -> Value + Send + Sync + 'static) -> Self {
        self.default = Some(DefaultValue::Dynamic(Arc::new(f)));
        self
    }

    #[must_use]
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Accept the raw map unchanged when no one-of candidate matches.
    #[must_use]
    pub const fn permissive_fallback(mut self) -> Self {
        self.permissive_fallback = true;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn kind(&self) -> &Kind {
        &self.kind
    }

    #[must_use]
    pub const fn is_optional(&self) -> bool {
        self.optional
    }

    #[must_use]
    pub const fn has_default(&self) -> bool {
        self.default.is_some()
    }

    #[must_use]
    pub const fn default_value(&self) -> Option<&DefaultValue> {
        self.default.as_ref()
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub const fn has_permissive_fallback(&self) -> bool {
        self.permissive_fallback
    }

    /// Not optional, no default, not computed.
    #[must_use]
    pub const fn is_required(&self) -> bool {
        !self.optional && self.default.is_none() && !self.kind.is_computed()
    }
}

/// Ordered catalog of attribute descriptors.
#[derive(Debug, Clone, Default)]
pub struct AttributeRegistry {
    descriptors: Vec<Descriptor>,
}

impl AttributeRegistry {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            descriptors: Vec::new(),
        }
    }

    /// Copy every descriptor of `parent` into a fresh registry.
    #[must_use]
    pub fn inherit_from(parent: &Self) -> Self {
        parent.clone()
    }

    /// Record a descriptor. Redeclaring a name replaces the earlier
    /// descriptor in place, keeping its original position.
    pub fn declare(&mut self, descriptor: Descriptor) {
        match self
            .descriptors
            .iter_mut()
            .find(|existing| existing.name == descriptor.name)
        {
            Some(existing) => *existing = descriptor,
            None => self.descriptors.push(descriptor),
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Descriptor> {
        self.descriptors.iter().find(|d| d.name == name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Descriptor> {
        self.descriptors.iter()
    }

    /// All names in declaration order.
    #[must_use]
    pub fn declared_names(&self) -> Vec<&str> {
        self.descriptors.iter().map(Descriptor::name).collect()
    }

    #[must_use]
    pub fn required_names(&self) -> Vec<&str> {
        self.descriptors
            .iter()
            .filter(|d| d.is_required())
            .map(Descriptor::name)
            .collect()
    }

    /// Descriptors that take part in input classification and coercion.
    pub fn stored(&self) -> impl Iterator<Item = &Descriptor> {
        self.descriptors.iter().filter(|d| !d.kind.is_computed())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::Computed;

    fn registry() -> AttributeRegistry {
        let mut registry = AttributeRegistry::new();
        registry.declare(Descriptor::new("name", Kind::text()));
        registry.declare(Descriptor::new("age", Kind::integer()).optional());
        registry.declare(Descriptor::new("role", Kind::text()).default("member"));
        registry.declare(Descriptor::new(
            "label",
            Kind::Computed(Computed::new(|_| Value::Nil)),
        ));
        registry
    }

    #[test]
    fn test_required_names_exclude_optional_defaulted_and_computed() {
        assert_eq!(registry().required_names(), vec!["name"]);
    }

    #[test]
    fn test_declared_names_keep_declaration_order() {
        assert_eq!(
            registry().declared_names(),
            vec!["name", "age", "role", "label"]
        );
    }

    #[test]
    fn test_redeclaration_replaces_in_place() {
        let mut registry = registry();
        registry.declare(Descriptor::new("name", Kind::text()).default("anon"));
        assert_eq!(registry.len(), 4);
        assert_eq!(registry.declared_names()[0], "name");
        assert!(registry.get("name").is_some_and(Descriptor::has_default));
        assert!(registry.required_names().is_empty());
    }

    #[test]
    fn test_inherited_registry_is_independent() {
        let parent = registry();
        let mut child = AttributeRegistry::inherit_from(&parent);
        child.declare(Descriptor::new("role", Kind::text()));
        child.declare(Descriptor::new("extra", Kind::text()));

        assert!(parent.get("role").is_some_and(Descriptor::has_default));
        assert!(!parent.contains("extra"));
        assert_eq!(child.required_names(), vec!["name", "role", "extra"]);
    }

    #[test]
    fn test_dynamic_default_evaluates_on_resolve() {
        let descriptor = Descriptor::new("tags", Kind::AnyArray).default_with(|| Value::from(vec![1]));
        let value = descriptor.default_value().map(DefaultValue::resolve);
        assert_eq!(value, Some(Value::from(vec![1])));
    }
}
