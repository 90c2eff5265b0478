//! Derived-instance operations: clone, mutate, dup and merge.
//!
//! A read-only instance never changes. Every operation here builds a new
//! instance through the construction protocol; only `dup` yields one that
//! accepts writes.
//!
//! `clone_with`, `mutate` and `dup` carry nested instances over as they are,
//! so a one-of value keeps the candidate it matched. Values passed as
//! changes, and everything `merge` produces, are plain maps and are matched
//! against the candidates again.

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

use crate::error::{ContractError, Result};
use crate::instance::Contract;
use crate::value::{canonicalize_top_level, Map, Value};

/// Which checks [`Contract::merge`] runs on the merged instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeOptions {
    /// Run `schema_validate` on the result
    pub strict: bool,
    /// Run value validation on the result
    pub validate: bool,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            strict: true,
            validate: true,
        }
    }
}

impl MergeOptions {
    #[must_use]
    pub const fn lenient() -> Self {
        Self {
            strict: false,
            validate: false,
        }
    }
}

impl Contract {
    /// New read-only instance from this one's values with `changes` laid
    /// over them. Changed keys always win.
    ///
    /// # Errors
    ///
    /// Structural errors from `schema_validate` on the new instance.
    pub fn clone_with(&self, changes: Map) -> Result<Self> {
        let mut merged = self.stored_values();
        merged.extend(canonicalize_top_level(changes));
        let next = Self::new(self.contract_type(), merged);
        next.schema_validate()?;
        Ok(next)
    }

    /// Like [`Contract::clone_with`], but at least one attribute must change.
    ///
    /// # Errors
    ///
    /// - `EmptyChanges` when `changes` is empty
    /// - structural errors from `schema_validate`
    pub fn mutate(&self, changes: Map) -> Result<Self> {
        if changes.is_empty() {
            return Err(ContractError::EmptyChanges {
                contract: self.type_name().to_string(),
            });
        }
        self.clone_with(changes)
    }

    /// Writable copy holding the same attribute values.
    #[must_use]
    pub fn dup(&self) -> Self {
        Self::build(self.contract_type(), self.stored_values(), true)
    }

    /// Deep-merge `other` over this instance.
    ///
    /// Overlapping map values merge recursively; any other value from
    /// `other` replaces this one, nil included. `other` may be a contract
    /// instance or a plain map; anything else merges as an empty map.
    ///
    /// # Errors
    ///
    /// - structural errors when `options.strict`
    /// - `Invalid` when `options.validate` and value validation fails
    pub fn merge(&self, other: impl Into<Value>, options: MergeOptions) -> Result<Self> {
        let overlay = match other.into().into_canonical() {
            Value::Map(map) => canonicalize_top_level(map),
            _ => Map::new(),
        };
        let merged = deep_merge(self.to_canonical_map(), overlay);
        let next = Self::new(self.contract_type(), merged);
        if options.strict {
            next.schema_validate()?;
        }
        if options.validate {
            next.validate()?;
        }
        Ok(next)
    }
}

fn deep_merge(base: Map, overlay: Map) -> Map {
    let mut merged = base;
    for (key, incoming) in overlay {
        let value = match (merged.remove(&key), incoming) {
            (Some(Value::Map(current)), Value::Map(incoming)) => {
                Value::Map(deep_merge(current, incoming))
            }
            (_, incoming) => incoming,
        };
        merged.insert(key, value);
    }
    merged
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
            .optional("age", Kind::integer())
            .optional("tags", Kind::any())
            .build()
    }

    #[test]
    fn test_clone_with_changes_wins() {
        let original = user().construct(map! { "name" => "Alice", "age" => 30 });
        let next = original.clone_with(map! { " age " => "31" });
        let next = next.unwrap_or_else(|_| original.clone());
        assert_eq!(next.get("age"), Some(&Value::Integer(31)));
        assert_eq!(original.get("age"), Some(&Value::Integer(30)));
        assert!(next.is_read_only());
    }

    #[test]
    fn test_clone_with_undeclared_key_is_unexpected() {
        let original = user().construct(map! { "name" => "Alice" });
        assert!(matches!(
            original.clone_with(map! { "nickname" => "Al" }),
            Err(ContractError::Unexpected { .. })
        ));
    }

    #[test]
    fn test_mutate_rejects_empty_changes() {
        let original = user().construct(map! { "name" => "Alice" });
        assert!(matches!(
            original.mutate(Map::new()),
            Err(ContractError::EmptyChanges { .. })
        ));
        let mutated = original.mutate(map! { "age" => 5 });
        assert_eq!(
            mutated.ok().and_then(|c| c.get("age").cloned()),
            Some(Value::Integer(5))
        );
    }

    #[test]
    fn test_dup_is_writable_and_original_is_not() {
        let mut original = user().construct(map! { "name" => "Alice" });
        let mut copy = original.dup();
        assert!(!copy.is_read_only());
        assert!(copy.set("name", "Bob").is_ok());
        assert_eq!(copy.get("name"), Some(&Value::from("Bob")));
        assert!(matches!(
            original.set("name", "Bob"),
            Err(ContractError::FrozenWrite { .. })
        ));
    }

    #[test]
    fn test_merge_nil_overwrites_populated_value() {
        let a = user().construct(map! { "name" => "Alice", "age" => 30 });
        let merged = a.merge(map! { "age" => Value::Nil }, MergeOptions::default());
        let merged = merged.unwrap_or_else(|_| a.clone());
        assert_eq!(merged.get("age"), Some(&Value::Nil));
    }

    #[test]
    fn test_deep_merge_recurses_into_maps() {
        let base = map! { "meta" => map! { "a" => 1, "b" => 2 }, "x" => 1 };
        let overlay = map! { "meta" => map! { "b" => 3 }, "x" => Value::Nil };
        let merged = deep_merge(base, overlay);
        assert_eq!(merged.get("meta"), Some(&Value::Map(map! { "a" => 1, "b" => 3 })));
        assert_eq!(merged.get("x"), Some(&Value::Nil));
    }

    #[test]
    fn test_merge_options_control_checks() {
        let a = user().construct(map! { "name" => "Alice" });
        let result = a.merge(map! { "age" => "old" }, MergeOptions::default());
        assert!(matches!(result, Err(ContractError::Invalid(_))));
        let result = a.merge(map! { "age" => "old", "extra" => 1 }, MergeOptions::lenient());
        assert!(result.is_ok());
    }

    #[test]
    fn test_merge_accepts_contract_instances() {
        let a = user().construct(map! { "name" => "Alice", "age" => 1 });
        let b = user().construct(map! { "name" => "Bob" });
        let merged = a.merge(b, MergeOptions::default());
        let merged = merged.unwrap_or_else(|_| a.clone());
        assert_eq!(merged.get("name"), Some(&Value::from("Bob")));
        assert_eq!(merged.get("age"), Some(&Value::Nil));
    }
}
