//! Contract instances and the construction protocol.
//!
//! Construction never fails. Whatever the input looks like, the result is an
//! instance that records what was provided, what was not declared, and the
//! raw text behind every cast, so that structural and value problems can be
//! reported later by the validators.

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

use tracing::trace;

use crate::coercion;
use crate::contract_type::ContractType;
use crate::error::{ContractError, Result};
use crate::kind::Kind;
use crate::registry::Descriptor;
use crate::resolver::{self, Resolution};
use crate::value::{canonical_key, canonicalize_top_level, Map, Value};

/// A typed, schema-described data holder built from raw input.
///
/// Instances are read-only once constructed; only [`Contract::dup`] yields a
/// writable copy. A read-only instance never changes, so it can be shared
/// across threads freely. Writable copies need external synchronization.
#[derive(Debug, Clone)]
pub struct Contract {
    ty: ContractType,
    values: Map,
    provided: im::OrdSet<String>,
    unexpected: Map,
    raw: Map,
    unmatched: im::OrdMap<String, Vec<String>>,
    unresolved: im::OrdMap<String, String>,
    read_only: bool,
}

impl Contract {
    /// Build a read-only instance of `ty` from raw input. Never fails.
    #[must_use]
    pub fn new(ty: &ContractType, input: Map) -> Self {
        Self::build(ty, input, false)
    }

    /// Build from any value; non-map input is treated as an empty map.
    #[must_use]
    pub fn from_value(ty: &ContractType, input: Value) -> Self {
        match input {
            Value::Map(map) => Self::new(ty, map),
            Value::Contract(contract) => Self::new(ty, contract.to_canonical_map()),
            _ => Self::new(ty, Map::new()),
        }
    }

    /// Build from decoded JSON; non-object input is treated as an empty map.
    #[must_use]
    pub fn from_json(ty: &ContractType, input: serde_json::Value) -> Self {
        Self::from_value(ty, Value::from(input))
    }

    pub(crate) fn build(ty: &ContractType, input: Map, writable: bool) -> Self {
        let registry = ty.registry();
        let mut contract = Self {
            ty: ty.clone(),
            values: Map::new(),
            provided: im::OrdSet::new(),
            unexpected: Map::new(),
            raw: Map::new(),
            unmatched: im::OrdMap::new(),
            unresolved: im::OrdMap::new(),
            read_only: false,
        };

        for (key, value) in canonicalize_top_level(input) {
            match registry.get(&key) {
                Some(descriptor) if descriptor.kind().is_computed() => {}
                Some(descriptor) if value.is_nil() && descriptor.has_default() => {}
                Some(_) => {
                    contract.provided.insert(key.clone());
                    contract.raw.insert(key, value);
                }
                None => {
                    contract.unexpected.insert(key, value);
                }
            }
        }

        for descriptor in registry.stored() {
            let raw = contract.raw.get(descriptor.name()).cloned().unwrap_or_else(|| {
                descriptor
                    .default_value()
                    .map_or(Value::Nil, |default| default.resolve())
            });
            contract.assign(descriptor, &raw);
        }

        for (name, normalizer) in ty.normalizers() {
            if let Some(value) = contract.values.get(name).filter(|value| !value.is_nil()) {
                let normalized = normalizer(value.clone());
                contract.values.insert(name.to_string(), normalized);
            }
        }

        contract.read_only = !writable;
        trace!(
            contract = %ty.name(),
            provided = contract.provided.len(),
            unexpected = contract.unexpected.len(),
            writable,
            "constructed contract instance"
        );
        contract
    }

    /// Cast `raw` for `descriptor` and resolve nested contracts.
    fn assign(&mut self, descriptor: &Descriptor, raw: &Value) {
        let name = descriptor.name().to_string();
        let cast = coercion::cast(descriptor.kind(), raw);
        self.unmatched.remove(&name);
        self.unresolved.remove(&name);

        let value = match cast {
            Value::Map(map) if descriptor.kind().is_contract() => {
                match resolver::resolve_nested(&self.ty, descriptor, map) {
                    Resolution::Nested(nested) => Value::Contract(nested),
                    Resolution::Opaque(map) => Value::Map(map),
                    Resolution::Unmatched { input, attempted } => {
                        self.unmatched.insert(name.clone(), attempted);
                        Value::Map(input)
                    }
                    Resolution::Unresolved { input, reference } => {
                        self.unresolved.insert(name.clone(), reference);
                        Value::Map(input)
                    }
                }
            }
            other => other,
        };
        self.values.insert(name, value);
    }

    // ========================================================================
    // QUERY METHODS
    // ========================================================================

    #[must_use]
    pub const fn contract_type(&self) -> &ContractType {
        &self.ty
    }

    #[must_use]
    pub fn type_name(&self) -> &str {
        self.ty.name()
    }

    #[must_use]
    pub const fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Current value of a stored attribute.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(canonical_key(name))
    }

    /// Keys explicitly provided at construction.
    #[must_use]
    pub const fn provided_keys(&self) -> &im::OrdSet<String> {
        &self.provided
    }

    /// Undeclared input keys with their raw values.
    #[must_use]
    pub const fn unexpected_attributes(&self) -> &Map {
        &self.unexpected
    }

    pub(crate) fn raw_value(&self, name: &str) -> Option<&Value> {
        self.raw.get(name)
    }

    pub(crate) const fn unmatched(&self) -> &im::OrdMap<String, Vec<String>> {
        &self.unmatched
    }

    pub(crate) const fn unresolved(&self) -> &im::OrdMap<String, String> {
        &self.unresolved
    }

    /// Declared, non-computed attribute names in declaration order.
    #[must_use]
    pub fn attribute_names(&self) -> Vec<&str> {
        self.ty.registry().stored().map(Descriptor::name).collect()
    }

    /// Canonical values in declaration order.
    #[must_use]
    pub fn values(&self) -> Vec<Value> {
        self.attribute_names()
            .into_iter()
            .map(|name| {
                self.values
                    .get(name)
                    .cloned()
                    .unwrap_or_default()
                    .into_canonical()
            })
            .collect()
    }

    /// Attribute name to value, with nested contracts rendered as maps.
    /// Computed attributes are not part of the canonical map.
    #[must_use]
    pub fn to_canonical_map(&self) -> Map {
        self.ty
            .registry()
            .stored()
            .map(|descriptor| {
                let value = self
                    .values
                    .get(descriptor.name())
                    .cloned()
                    .unwrap_or_default();
                (descriptor.name().to_string(), value.into_canonical())
            })
            .collect()
    }

    /// Stored attribute values as held, nested instances kept as instances.
    pub(crate) fn stored_values(&self) -> Map {
        self.ty
            .registry()
            .stored()
            .map(|descriptor| {
                let value = self
                    .values
                    .get(descriptor.name())
                    .cloned()
                    .unwrap_or_default();
                (descriptor.name().to_string(), value)
            })
            .collect()
    }

    /// Walk the canonical map by attribute names and array indices.
    #[must_use]
    pub fn dig<S: AsRef<str>>(&self, path: &[S]) -> Option<Value> {
        Value::Map(self.to_canonical_map()).dig(path).cloned()
    }

    /// Nested contract instances held by contract-typed attributes, in
    /// declaration order.
    pub(crate) fn nested(&self) -> impl Iterator<Item = (&str, &Self)> {
        self.ty
            .registry()
            .iter()
            .filter(|descriptor| descriptor.kind().is_contract())
            .filter_map(|descriptor| {
                self.values
                    .get(descriptor.name())
                    .and_then(Value::as_contract)
                    .map(|nested| (descriptor.name(), nested))
            })
    }

    // ========================================================================
    // WRITES
    // ========================================================================

    /// Write an attribute on a writable copy.
    ///
    /// The value goes through the same coercion, nested resolution and
    /// normalization as construction input.
    ///
    /// # Errors
    ///
    /// - `FrozenWrite` if this instance is read-only
    /// - `UnknownAttribute` if `name` is undeclared or computed
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        let name = canonical_key(name).to_string();
        if self.read_only {
            return Err(ContractError::FrozenWrite {
                contract: self.type_name().to_string(),
                attribute: name,
            });
        }
        let ty = self.ty.clone();
        let descriptor = ty
            .registry()
            .get(&name)
            .filter(|descriptor| !matches!(descriptor.kind(), Kind::Computed(_)))
            .ok_or_else(|| ContractError::UnknownAttribute {
                contract: ty.name().to_string(),
                attribute: name.clone(),
            })?;

        let raw = value.into();
        self.provided.insert(name.clone());
        self.raw.insert(name.clone(), raw.clone());
        self.assign(descriptor, &raw);

        for (target, normalizer) in ty.normalizers().filter(|(target, _)| *target == name) {
            if let Some(current) = self.values.get(target).filter(|value| !value.is_nil()) {
                let normalized = normalizer(current.clone());
                self.values.insert(target.to_string(), normalized);
            }
        }
        Ok(())
    }
}

impl PartialEq for Contract {
    fn eq(&self, other: &Self) -> bool {
        self.ty.same_type(&other.ty) && self.values == other.values
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// UNIT TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map;

    fn person() -> ContractType {
        ContractType::builder("Person")
            .required("name", Kind::text())
            .optional("age", Kind::integer())
            .attribute(Descriptor::new("role", Kind::text()).default("member"))
            .computed("greeting", |c| {
                Value::from(format!("hi {}", c.get("name").cloned().unwrap_or_default()))
            })
            .normalize("name", |v| match v {
                Value::Text(text) => Value::Text(text.trim().to_string()),
                other => other,
            })
            .build()
    }

    #[test]
    fn test_construction_partitions_input() {
        let contract = person().construct(map! {
            " name " => "Alice",
            "age" => "30",
            "nickname" => "Al",
            "greeting" => "ignored",
        });
        assert!(contract.is_read_only());
        assert_eq!(contract.get("age"), Some(&Value::Integer(30)));
        assert!(contract.provided_keys().contains("name"));
        assert!(contract.provided_keys().contains("age"));
        assert!(!contract.provided_keys().contains("greeting"));
        assert_eq!(
            contract.unexpected_attributes().keys().collect::<Vec<_>>(),
            vec!["nickname"]
        );
    }

    #[test]
    fn test_nil_with_default_is_not_provided() {
        let contract = person().construct(map! { "name" => "Bob", "role" => Value::Nil });
        assert!(!contract.provided_keys().contains("role"));
        assert_eq!(contract.get("role"), Some(&Value::from("member")));
    }

    #[test]
    fn test_nil_without_default_is_provided() {
        let contract = person().construct(map! { "name" => Value::Nil });
        assert!(contract.provided_keys().contains("name"));
        assert_eq!(contract.get("name"), Some(&Value::Nil));
    }

    #[test]
    fn test_normalizers_run_after_coercion() {
        let contract = person().construct(map! { "name" => "  Carol  " });
        assert_eq!(contract.get("name"), Some(&Value::from("Carol")));
    }

    #[test]
    fn test_canonical_map_excludes_computed() {
        let contract = person().construct(map! { "name" => "Dan" });
        let canonical = contract.to_canonical_map();
        assert_eq!(contract.attribute_names(), vec!["name", "age", "role"]);
        assert!(!canonical.contains_key("greeting"));
        assert_eq!(canonical.get("age"), Some(&Value::Nil));
        assert_eq!(contract.values().len(), 3);
    }

    #[test]
    fn test_non_map_input_never_fails() {
        let contract = Contract::from_value(&person(), Value::from(vec![1, 2, 3]));
        assert!(contract.provided_keys().is_empty());
        let contract = Contract::from_json(&person(), serde_json::json!("nope"));
        assert!(contract.unexpected_attributes().is_empty());
    }

    #[test]
    fn test_set_on_read_only_is_frozen_write() {
        let mut contract = person().construct(map! { "name" => "Eve" });
        let result = contract.set("name", "Mallory");
        assert!(matches!(result, Err(ContractError::FrozenWrite { .. })));
        assert_eq!(contract.get("name"), Some(&Value::from("Eve")));
    }

    #[test]
    fn test_set_on_writable_coerces_and_normalizes() {
        let mut contract = Contract::build(&person(), map! { "name" => "Eve" }, true);
        assert!(contract.set("age", "41").is_ok());
        assert!(contract.set("name", " Zoe ").is_ok());
        assert_eq!(contract.get("age"), Some(&Value::Integer(41)));
        assert_eq!(contract.get("name"), Some(&Value::from("Zoe")));
        assert!(matches!(
            contract.set("greeting", "x"),
            Err(ContractError::UnknownAttribute { .. })
        ));
        assert!(matches!(
            contract.set("nope", "x"),
            Err(ContractError::UnknownAttribute { .. })
        ));
    }
}
