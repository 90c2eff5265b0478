//! Nested and polymorphic contract resolution.
//!
//! A map-shaped value on a contract-typed attribute becomes a nested
//! instance. For one-of attributes the candidates are probed in declared
//! order and the first structurally valid instance wins; later candidates
//! are never tried.

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

use tracing::{debug, warn};

use crate::contract_type::ContractType;
use crate::error::ContractError;
use crate::instance::Contract;
use crate::kind::{Kind, OneOf};
use crate::registry::Descriptor;
use crate::value::{Map, Value};

/// Outcome of probing one candidate type against an input map.
#[derive(Debug)]
pub enum Probe {
    Match(Contract),
    NoMatch(ContractError),
}

/// Construct `candidate` from `input` and check its structure.
#[must_use]
pub fn try_construct(candidate: &ContractType, input: &Map) -> Probe {
    let contract = Contract::new(candidate, input.clone());
    match contract.schema_validate() {
        Ok(()) => Probe::Match(contract),
        Err(err) => Probe::NoMatch(err),
    }
}

/// What happened to a map-shaped value on a contract-typed attribute.
#[derive(Debug)]
pub(crate) enum Resolution {
    Nested(Contract),
    /// One-of without a match, kept as-is under a permissive fallback
    Opaque(Map),
    /// One-of without a match and without fallback
    Unmatched { input: Map, attempted: Vec<String> },
    /// Deferred reference unknown to the catalog
    Unresolved { input: Map, reference: String },
}

pub(crate) fn resolve_nested(owner: &ContractType, descriptor: &Descriptor, input: Map) -> Resolution {
    match descriptor.kind() {
        Kind::Contract(reference) => match owner.resolve(reference) {
            Some(ty) => Resolution::Nested(Contract::new(&ty, input)),
            None => {
                warn!(
                    contract = %owner.name(),
                    attribute = descriptor.name(),
                    reference = reference.name(),
                    "nested contract reference could not be resolved"
                );
                Resolution::Unresolved {
                    input,
                    reference: reference.name().to_string(),
                }
            }
        },
        Kind::OneOf(one_of) => resolve_one_of(owner, descriptor, one_of, input),
        _ => Resolution::Opaque(input),
    }
}

/// First-match-wins dispatch over the one-of candidates.
///
/// Unknown candidates are skipped. When not a single candidate resolves
/// the outcome is `Unresolved`, naming the first reference.
pub(crate) fn resolve_one_of(
    owner: &ContractType,
    descriptor: &Descriptor,
    one_of: &OneOf,
    input: Map,
) -> Resolution {
    let mut any_resolved = false;
    for reference in one_of.candidates() {
        let Some(candidate) = owner.resolve(reference) else {
            warn!(
                contract = %owner.name(),
                attribute = descriptor.name(),
                reference = reference.name(),
                "one-of candidate could not be resolved"
            );
            continue;
        };
        any_resolved = true;
        match try_construct(&candidate, &input) {
            Probe::Match(contract) => {
                debug!(
                    contract = %owner.name(),
                    attribute = descriptor.name(),
                    matched = %candidate.name(),
                    "one-of candidate matched"
                );
                return Resolution::Nested(contract);
            }
            Probe::NoMatch(err) => {
                debug!(
                    contract = %owner.name(),
                    attribute = descriptor.name(),
                    candidate = %candidate.name(),
                    error = %err,
                    "one-of candidate rejected"
                );
            }
        }
    }

    if let Some(first) = one_of.candidates().first().filter(|_| !any_resolved) {
        return Resolution::Unresolved {
            input,
            reference: first.name().to_string(),
        };
    }
    if descriptor.has_permissive_fallback() {
        return Resolution::Opaque(input);
    }
    let attempted = input.keys().cloned().collect();
    Resolution::Unmatched { input, attempted }
}

/// Resolve a one-of value directly.
///
/// Nil on an optional attribute is accepted without probing. A map is
/// probed against the candidates; without a match it is returned as an
/// opaque map under a permissive fallback, or rejected as `Unexpected`.
///
/// # Errors
///
/// `Unexpected` naming the input keys when no candidate matches and the
/// descriptor has no permissive fallback. `Unresolved` when none of the
/// candidates names a known contract.
pub fn resolve_value(owner: &ContractType, descriptor: &Descriptor, value: Value) -> Result<Value, ContractError> {
    let Kind::OneOf(one_of) = descriptor.kind() else {
        return Ok(match value {
            Value::Map(map) if descriptor.kind().is_contract() => {
                match resolve_nested(owner, descriptor, map) {
                    Resolution::Nested(contract) => Value::Contract(contract),
                    Resolution::Opaque(map)
                    | Resolution::Unmatched { input: map, .. }
                    | Resolution::Unresolved { input: map, .. } => Value::Map(map),
                }
            }
            other => other,
        });
    };
    match value {
        Value::Nil if descriptor.is_optional() => Ok(Value::Nil),
        Value::Map(map) => match resolve_one_of(owner, descriptor, one_of, map) {
            Resolution::Nested(contract) => Ok(Value::Contract(contract)),
            Resolution::Opaque(map) => Ok(Value::Map(map)),
            Resolution::Unmatched { attempted, .. } => Err(ContractError::Unexpected {
                contract: owner.name().to_string(),
                names: attempted,
            }),
            Resolution::Unresolved { reference, .. } => Err(ContractError::Unresolved {
                contract: owner.name().to_string(),
                attribute: descriptor.name().to_string(),
                reference,
            }),
        },
        other => Ok(other),
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// UNIT TESTS
// ═══════════════════════════════════════════════════════════════════════════
