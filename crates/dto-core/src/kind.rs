//! Attribute kinds.
//!
//! A kind tells the coercion engine how to cast a raw value and tells the
//! resolver whether the attribute holds a nested contract.

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

use std::fmt;
use std::sync::Arc;

use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::contract_type::ContractType;
use crate::instance::Contract;
use crate::value::Value;

/// Scalar type tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ScalarKind {
    Text,
    Integer,
    Float,
    Boolean,
    Date,
    #[strum(serialize = "datetime")]
    DateTime,
    Time,
    /// Untyped passthrough
    Any,
}

impl ScalarKind {
    #[must_use]
    pub const fn is_numeric(self) -> bool {
        matches!(self, Self::Integer | Self::Float)
    }

    #[must_use]
    pub const fn is_temporal(self) -> bool {
        matches!(self, Self::Date | Self::DateTime | Self::Time)
    }
}

/// Reference to a contract type: a direct handle, or a name resolved
/// through the owning type's catalog on first use.
#[derive(Clone)]
pub enum ContractRef {
    Direct(ContractType),
    Deferred(String),
}

impl ContractRef {
    #[must_use]
    pub fn deferred(name: impl Into<String>) -> Self {
        Self::Deferred(name.into())
    }

    /// Name of the referenced type.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Direct(ty) => ty.name(),
            Self::Deferred(name) => name,
        }
    }
}

impl From<ContractType> for ContractRef {
    fn from(ty: ContractType) -> Self {
        Self::Direct(ty)
    }
}

impl From<&ContractType> for ContractRef {
    fn from(ty: &ContractType) -> Self {
        Self::Direct(ty.clone())
    }
}

impl From<&str> for ContractRef {
    fn from(name: &str) -> Self {
        Self::Deferred(name.to_string())
    }
}

impl fmt::Debug for ContractRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct(ty) => f.debug_tuple("Direct").field(&ty.name()).finish(),
            Self::Deferred(name) => f.debug_tuple("Deferred").field(name).finish(),
        }
    }
}

/// Ordered polymorphic candidates. Order matters: the first candidate whose
/// instance is structurally valid wins.
#[derive(Debug, Clone)]
pub struct OneOf {
    candidates: Vec<ContractRef>,
}

impl OneOf {
    #[must_use]
    pub fn new<I, R>(candidates: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<ContractRef>,
    {
        Self {
            candidates: candidates.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn candidates(&self) -> &[ContractRef] {
        &self.candidates
    }
}

/// Derived attribute evaluated at serialization time.
#[derive(Clone)]
pub struct Computed(Arc<dyn Fn(&Contract) -> Value + Send + Sync>);

impl Computed {
    pub fn new(f: impl Fn(&Contract) -> Value + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    #[must_use]
    pub fn evaluate(&self, contract: &Contract) -> Value {
        (self.0)(contract)
    }
}

impl fmt::Debug for Computed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Computed(..)")
    }
}

/// Kind of a declared attribute.
#[derive(Debug, Clone)]
pub enum Kind {
    Scalar(ScalarKind),
    /// Typed array; every element is cast with the element kind
    Array(ScalarKind),
    /// Array of arbitrary elements
    AnyArray,
    /// Map with arbitrary keys, canonicalized at every depth
    AnyMap,
    Contract(ContractRef),
    OneOf(OneOf),
    Computed(Computed),
}

impl Kind {
    #[must_use]
    pub const fn text() -> Self {
        Self::Scalar(ScalarKind::Text)
    }

    #[must_use]
    pub const fn integer() -> Self {
        Self::Scalar(ScalarKind::Integer)
    }

    #[must_use]
    pub const fn float() -> Self {
        Self::Scalar(ScalarKind::Float)
    }

    #[must_use]
    pub const fn boolean() -> Self {
        Self::Scalar(ScalarKind::Boolean)
    }

    #[must_use]
    pub const fn date() -> Self {
        Self::Scalar(ScalarKind::Date)
    }

    #[must_use]
    pub const fn datetime() -> Self {
        Self::Scalar(ScalarKind::DateTime)
    }

    #[must_use]
    pub const fn time() -> Self {
        Self::Scalar(ScalarKind::Time)
    }

    #[must_use]
    pub const fn any() -> Self {
        Self::Scalar(ScalarKind::Any)
    }

    #[must_use]
    pub const fn array_of(element: ScalarKind) -> Self {
        Self::Array(element)
    }

    pub fn contract(reference: impl Into<ContractRef>) -> Self {
        Self::Contract(reference.into())
    }

    pub fn one_of<I, R>(candidates: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<ContractRef>,
    {
        Self::OneOf(OneOf::new(candidates))
    }

    /// Nested contract or one-of.
    #[must_use]
    pub const fn is_contract(&self) -> bool {
        matches!(self, Self::Contract(_) | Self::OneOf(_))
    }

    #[must_use]
    pub const fn is_computed(&self) -> bool {
        matches!(self, Self::Computed(_))
    }

    /// Short tag used by documentation exporters and log lines.
    #[must_use]
    pub fn tag(&self) -> String {
        match self {
            Self::Scalar(scalar) => scalar.to_string(),
            Self::Array(element) => format!("array<{element}>"),
            Self::AnyArray => "array".to_string(),
            Self::AnyMap => "map".to_string(),
            Self::Contract(reference) => format!("contract<{}>", reference.name()),
            Self::OneOf(one_of) => {
                let names: Vec<&str> = one_of.candidates().iter().map(ContractRef::name).collect();
                format!("one_of<{}>", names.join("|"))
            }
            Self::Computed(_) => "computed".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn test_scalar_kind_names_round_trip_through_from_str() {
        for kind in ScalarKind::iter() {
            let parsed = ScalarKind::from_str(&kind.to_string());
            assert_eq!(parsed.ok(), Some(kind));
        }
        assert_eq!(ScalarKind::DateTime.to_string(), "datetime");
    }

    #[test]
    fn test_kind_tags() {
        assert_eq!(Kind::integer().tag(), "integer");
        assert_eq!(Kind::array_of(ScalarKind::Float).tag(), "array<float>");
        assert_eq!(Kind::contract("Address").tag(), "contract<Address>");
        assert_eq!(Kind::one_of(["Card", "Bank"]).tag(), "one_of<Card|Bank>");
    }

    #[test]
    fn test_kind_classification() {
        assert!(Kind::contract("Address").is_contract());
        assert!(Kind::one_of(["A"]).is_contract());
        assert!(!Kind::AnyMap.is_contract());
        assert!(Kind::Computed(Computed::new(|_| Value::Nil)).is_computed());
        assert!(ScalarKind::Float.is_numeric());
        assert!(ScalarKind::Time.is_temporal());
    }
}
