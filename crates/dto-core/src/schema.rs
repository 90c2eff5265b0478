//! Structural (schema) validation.
//!
//! Checks shape only: required attributes present, no undeclared keys,
//! one-of values matched, deferred references resolved. `schema_validate`
//! also descends into nested instances and stops at the first nested
//! failure, which propagates unwrapped.

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use crate::error::{ContractError, Result};
use crate::instance::Contract;

pub const MISSING: &str = "is missing";
pub const UNEXPECTED: &str = "is unexpected";
pub const UNMATCHED: &str = "does not match any candidate";
pub const UNRESOLVED: &str = "references an unknown contract";

impl Contract {
    /// Required attributes that were not provided, in declaration order.
    #[must_use]
    pub fn missing_attributes(&self) -> Vec<String> {
        self.contract_type()
            .registry()
            .required_names()
            .into_iter()
            .filter(|name| !self.provided_keys().contains(*name))
            .map(str::to_string)
            .collect()
    }

    /// Undeclared keys reported under this type's policy.
    fn reported_unexpected(&self) -> Vec<String> {
        if self.contract_type().policy().suppresses_unexpected() {
            return Vec::new();
        }
        self.unexpected_attributes().keys().cloned().collect()
    }

    /// Structural errors of this instance, keyed by attribute name.
    /// Nested instances are not inspected.
    #[must_use]
    pub fn schema_errors(&self) -> BTreeMap<String, Vec<String>> {
        let mut errors: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut record = |name: String, message: &str| {
            errors.entry(name).or_default().push(message.to_string());
        };
        for name in self.missing_attributes() {
            record(name, MISSING);
        }
        for name in self.reported_unexpected() {
            record(name, UNEXPECTED);
        }
        for name in self.unmatched().keys() {
            record(name.clone(), UNMATCHED);
        }
        for name in self.unresolved().keys() {
            record(name.clone(), UNRESOLVED);
        }
        errors
    }

    #[must_use]
    pub fn schema_valid(&self) -> bool {
        self.schema_errors().is_empty()
    }

    /// Assert the structure of this instance and every nested instance.
    ///
    /// # Errors
    ///
    /// In order of precedence:
    /// - `Missing` naming every absent required attribute
    /// - `Unexpected` naming every undeclared key (unless suppressed)
    /// - `Unexpected` naming the keys of an unmatched one-of value
    /// - `Unresolved` for an unknown deferred reference
    /// - the first nested failure, unwrapped
    pub fn schema_validate(&self) -> Result<()> {
        let contract = self.type_name().to_string();

        let missing = self.missing_attributes();
        if !missing.is_empty() {
            return Err(ContractError::Missing {
                contract,
                names: missing,
            });
        }

        let unexpected = self.reported_unexpected();
        if !unexpected.is_empty() {
            return Err(ContractError::Unexpected {
                contract,
                names: unexpected,
            });
        }

        if let Some((_, attempted)) = self.unmatched().iter().next() {
            return Err(ContractError::Unexpected {
                contract,
                names: attempted.clone(),
            });
        }

        if let Some((attribute, reference)) = self.unresolved().iter().next() {
            return Err(ContractError::Unresolved {
                contract,
                attribute: attribute.clone(),
                reference: reference.clone(),
            });
        }

        for (_, nested) in self.nested() {
            nested.schema_validate()?;
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// UNIT TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract_type::ContractType;
    use crate::kind::Kind;
    use crate::map;

    fn user() -> ContractType {
        ContractType::builder("User")
            .required("name", Kind::text())
            .required("email", Kind::text())
            .optional("age", Kind::integer())
            .build()
    }

    #[test]
    fn test_schema_errors_report_missing_and_unexpected() {
        let contract = user().construct(map! { "name" => "Alice", "extra" => 1 });
        let errors = contract.schema_errors();
        assert_eq!(errors.get("email"), Some(&vec![MISSING.to_string()]));
        assert_eq!(errors.get("extra"), Some(&vec![UNEXPECTED.to_string()]));
        assert!(!contract.schema_valid());
    }

    #[test]
    fn test_missing_precedes_unexpected() {
        let contract = user().construct(map! { "extra" => 1 });
        match contract.schema_validate() {
            Err(ContractError::Missing { names, .. }) => {
                assert_eq!(names, vec!["name".to_string(), "email".to_string()]);
            }
            other => panic!("expected Missing, got {other:?}"),
        }
    }

    #[test]
    fn test_unexpected_raised_when_nothing_missing() {
        let contract = user().construct(map! { "name" => "A", "email" => "a@b", "x" => 1, "y" => 2 });
        match contract.schema_validate() {
            Err(ContractError::Unexpected { names, .. }) => {
                assert_eq!(names, vec!["x".to_string(), "y".to_string()]);
            }
            other => panic!("expected Unexpected, got {other:?}"),
        }
    }

    #[test]
    fn test_permissive_policy_suppresses_only_unexpected() {
        let loose = ContractType::builder("Loose")
            .required("id", Kind::integer())
            .permissive()
            .build();
        let contract = loose.construct(map! { "id" => 1, "extra" => true });
        assert!(contract.schema_valid());
        assert!(contract.schema_validate().is_ok());

        let contract = loose.construct(map! { "extra" => true });
        assert!(matches!(contract.schema_validate(), Err(ContractError::Missing { .. })));
    }

    #[test]
    fn test_unresolved_reference_is_structural_error() {
        let ty = ContractType::builder("Holder")
            .required("thing", Kind::contract("Nowhere"))
            .build();
        let contract = ty.construct(map! { "thing" => map! { "a" => 1 } });
        assert_eq!(
            contract.schema_errors().get("thing"),
            Some(&vec![UNRESOLVED.to_string()])
        );
        assert!(matches!(
            contract.schema_validate(),
            Err(ContractError::Unresolved { .. })
        ));
    }
}
