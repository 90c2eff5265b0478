//! Value-level validation surface.
//!
//! The engine does not define a rule language. Rules are supplied as
//! [`ValueValidator`]s attached to a contract type; the engine runs them,
//! adds its own coercion-fallback errors, and folds the value errors of
//! nested instances into the parent under composite keys.

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

use std::collections::BTreeMap;
use std::sync::Arc;

use itertools::Itertools;
use tracing::debug;

use crate::coercion;
use crate::contract_type::ContractType;
use crate::error::{ContractError, Result};
use crate::instance::Contract;
use crate::kind::Kind;
use crate::registry::Descriptor;
use crate::value::{Map, Value};

// ═══════════════════════════════════════════════════════════════════════════
// VALUE ERRORS
// ═══════════════════════════════════════════════════════════════════════════

/// Ordered collection of `(attribute key, message)` pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValueErrors {
    entries: Vec<(String, String)>,
}

impl ValueErrors {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn add(&mut self, key: impl Into<String>, message: impl Into<String>) {
        self.entries.push((key.into(), message.into()));
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, message)| (key.as_str(), message.as_str()))
    }

    /// Messages recorded under `key`.
    #[must_use]
    pub fn messages_for(&self, key: &str) -> Vec<&str> {
        self.iter()
            .filter(|(k, _)| *k == key)
            .map(|(_, message)| message)
            .collect()
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.iter().any(|(k, _)| k == key)
    }

    /// Copy every entry of `nested` under `prefix{separator}{key}`.
    pub fn merge_nested(&mut self, prefix: &str, separator: &str, nested: &Self) {
        for (key, message) in nested.iter() {
            self.add(format!("{prefix}{separator}{key}"), message);
        }
    }

    /// Group messages by key.
    #[must_use]
    pub fn to_map(&self) -> BTreeMap<String, Vec<String>> {
        let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (key, message) in self.iter() {
            grouped
                .entry(key.to_string())
                .or_default()
                .push(message.to_string());
        }
        grouped
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// VALIDATOR TRAIT
// ═══════════════════════════════════════════════════════════════════════════

/// External value-validation rule run against a constructed instance.
pub trait ValueValidator: Send + Sync {
    fn validate(&self, contract: &Contract, errors: &mut ValueErrors);
}

impl<F> ValueValidator for F
where
    F: Fn(&Contract, &mut ValueErrors) + Send + Sync,
{
    fn validate(&self, contract: &Contract, errors: &mut ValueErrors) {
        self(contract, errors);
    }
}

/// A validator shared between a type and the types derived from it.
pub type SharedValidator = Arc<dyn ValueValidator>;

/// Wrap a closure as a [`SharedValidator`].
pub fn rule(f: impl Fn(&Contract, &mut ValueErrors) + Send + Sync + 'static) -> SharedValidator {
    Arc::new(f)
}

// ═══════════════════════════════════════════════════════════════════════════
// CONTRACT VALUE SURFACE
// ═══════════════════════════════════════════════════════════════════════════

impl Contract {
    /// Silent-fallback casts among the provided attributes.
    #[must_use]
    pub fn coercion_errors(&self) -> ValueErrors {
        let mut errors = ValueErrors::new();
        let log_fallbacks = self.contract_type().config().coercion.log_fallbacks.as_bool();
        for descriptor in self.contract_type().registry().stored() {
            let Some(raw) = self.raw_value(descriptor.name()) else {
                continue;
            };
            let cast = self.get(descriptor.name()).cloned().unwrap_or_default();
            for (key, message) in coercion::fallback_errors(descriptor, raw, &cast) {
                if log_fallbacks {
                    debug!(contract = %self.type_name(), attribute = %key, raw = %raw, "coercion fallback detected");
                }
                errors.add(key, message);
            }
            if let Some(message) = self.nested_type_mismatch(descriptor) {
                errors.add(descriptor.name(), message);
            }
        }
        errors
    }

    /// A prebuilt instance on a contract-typed attribute whose type is not
    /// one the attribute accepts.
    fn nested_type_mismatch(&self, descriptor: &Descriptor) -> Option<String> {
        let nested = self.get(descriptor.name()).and_then(Value::as_contract)?;
        let owner = self.contract_type();
        let accepted: Vec<ContractType> = match descriptor.kind() {
            Kind::Contract(reference) => owner.resolve(reference).into_iter().collect(),
            Kind::OneOf(one_of) => one_of
                .candidates()
                .iter()
                .filter_map(|reference| owner.resolve(reference))
                .collect(),
            _ => return None,
        };
        if accepted.is_empty() || accepted.iter().any(|ty| ty.same_type(nested.contract_type())) {
            return None;
        }
        let expected = accepted.iter().map(ContractType::name).join(" or ");
        Some(format!("is a {} contract, expected {expected}", nested.type_name()))
    }

    /// Every value error: coercion fallbacks, attached rules, then nested
    /// value errors under composite keys.
    #[must_use]
    pub fn value_errors(&self) -> ValueErrors {
        let mut errors = self.coercion_errors();
        self.contract_type().run_validators(self, &mut errors);

        let separator = self.contract_type().config().errors.key_separator.as_str();
        for (name, nested) in self.nested() {
            let nested_errors = nested.value_errors();
            if !nested_errors.is_empty() {
                errors.merge_nested(name, separator, &nested_errors);
            }
        }
        errors
    }

    #[must_use]
    pub fn valid(&self) -> bool {
        self.value_errors().is_empty()
    }

    /// # Errors
    ///
    /// `Invalid` carrying a copy of this instance when any value error exists.
    pub fn validate(&self) -> Result<()> {
        if self.valid() {
            Ok(())
        } else {
            Err(ContractError::Invalid(Box::new(self.clone())))
        }
    }

    /// Serialization entry point: canonical map plus computed attributes.
    ///
    /// # Errors
    ///
    /// Structural errors from [`Contract::schema_validate`] first, then
    /// `Invalid` if value validation fails.
    pub fn serialize(&self) -> Result<Map> {
        self.schema_validate()?;
        self.validate()?;
        let mut output = self.to_canonical_map();
        for descriptor in self.contract_type().registry().iter() {
            if let Kind::Computed(computed) = descriptor.kind() {
                output.insert(
                    descriptor.name().to_string(),
                    computed.evaluate(self).into_canonical(),
                );
            }
        }
        Ok(output)
    }

    /// [`Contract::serialize`] rendered as JSON.
    ///
    /// # Errors
    ///
    /// Same as [`Contract::serialize`].
    pub fn to_json(&self) -> Result<serde_json::Value> {
        let output = self.serialize()?;
        Ok(serde_json::Value::Object(
            output
                .into_iter()
                .map(|(key, value)| (key, to_json_value(&value)))
                .collect(),
        ))
    }
}

fn to_json_value(value: &Value) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or(serde_json::Value::Null)
}

// ═══════════════════════════════════════════════════════════════════════════
// UNIT TESTS
// ═══════════════════════════════════════════════════════════════════════════
