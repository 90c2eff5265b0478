//! Error types for dto-core
//!
//! Construction never fails; every error here is raised by an explicit
//! validation, mutation or serialization entry point.

use std::path::PathBuf;

use itertools::Itertools;
use thiserror::Error;

use crate::instance::Contract;

/// Core error type for contract operations
#[derive(Debug, Error)]
pub enum ContractError {
    /// One or more required attributes were absent from the input
    #[error("{contract}: missing attributes: {}", .names.join(", "))]
    Missing { contract: String, names: Vec<String> },

    /// Undeclared keys were present, or no one-of candidate matched
    #[error("{contract}: unexpected attributes: {}", .names.join(", "))]
    Unexpected { contract: String, names: Vec<String> },

    /// Shape was correct but value validation failed
    #[error("{}", describe_invalid(.0))]
    Invalid(Box<Contract>),

    /// Attribute write attempted on a read-only instance
    #[error("{contract}: cannot write `{attribute}` on a read-only instance")]
    FrozenWrite { contract: String, attribute: String },

    /// `mutate` was called without naming any attribute
    #[error("{contract}: mutate requires at least one attribute")]
    EmptyChanges { contract: String },

    /// Write to a name that is not a writable declared attribute
    #[error("{contract}: unknown attribute `{attribute}`")]
    UnknownAttribute { contract: String, attribute: String },

    /// Deferred contract reference could not be found in the catalog
    #[error("{contract}: attribute `{attribute}` references unknown contract `{reference}`")]
    Unresolved {
        contract: String,
        attribute: String,
        reference: String,
    },
}

impl ContractError {
    /// Attribute names carried by structural errors.
    #[must_use]
    pub fn names(&self) -> &[String] {
        match self {
            Self::Missing { names, .. } | Self::Unexpected { names, .. } => names,
            _ => &[],
        }
    }

    /// The failing instance carried by an `Invalid` error.
    #[must_use]
    pub fn invalid_contract(&self) -> Option<&Contract> {
        match self {
            Self::Invalid(contract) => Some(contract),
            _ => None,
        }
    }
}

fn describe_invalid(contract: &Contract) -> String {
    let details = contract
        .value_errors()
        .iter()
        .map(|(key, message)| format!("{key} {message}"))
        .join(", ");
    format!("{}: invalid: {details}", contract.type_name())
}

/// Errors raised while loading engine configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read config file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML or contains unknown keys
    #[error("failed to parse config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// A value failed validation
    #[error("invalid configuration value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}

/// Result type alias for contract operations
pub type Result<T> = std::result::Result<T, ContractError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_display_lists_names() {
        let err = ContractError::Missing {
            contract: "User".to_string(),
            names: vec!["name".to_string(), "email".to_string()],
        };
        assert_eq!(err.to_string(), "User: missing attributes: name, email");
        assert_eq!(err.names(), ["name".to_string(), "email".to_string()]);
    }

    #[test]
    fn test_frozen_write_has_no_names() {
        let err = ContractError::FrozenWrite {
            contract: "User".to_string(),
            attribute: "name".to_string(),
        };
        assert!(err.names().is_empty());
        assert!(err.invalid_contract().is_none());
    }

    #[test]
    fn test_config_error_invalid_value_display() {
        let err = ConfigError::InvalidValue {
            key: "errors.key_separator".to_string(),
            reason: "cannot be empty".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid configuration value for errors.key_separator: cannot be empty"
        );
    }
}
