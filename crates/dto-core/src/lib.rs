//! # dto-core
//!
//! Typed, validated, immutable data-transfer contracts.
//!
//! A [`ContractType`] declares attributes with kinds, optionality and
//! defaults. Building an instance from raw input never fails: values are
//! coerced leniently, undeclared keys are set aside, and nested maps become
//! nested instances. Structural problems (missing or undeclared keys) and
//! value problems (silent fallback casts, rule failures) are reported on
//! demand by the schema and value validators.
//!
//! ## Laws (Compiler Enforced)
//!
//! - No `unwrap()` - returns `Result` instead
//! - No `expect()` - returns `Result` instead
//! - No `panic!()` - returns `Result` instead
//! - No `unsafe` - safe Rust only
//!
//! ## Example
//!
//! ```rust,ignore
//! use dto_core::{map, ContractType, Kind};
//!
//! let person = ContractType::builder("Person")
//!     .required("name", Kind::text())
//!     .optional("age", Kind::integer())
//!     .build();
//!
//! let alice = person.construct(map! { "name" => "Alice", "age" => "thirty" });
//! assert!(alice.schema_valid());
//! assert!(!alice.valid());
//! ```

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::panic))]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod catalog;
pub mod coercion;
pub mod config;
pub mod contract_type;
pub mod error;
pub mod instance;
pub mod kind;
pub mod mutation;
pub mod registry;
pub mod resolver;
pub mod schema;
pub mod validation;
pub mod value;

pub use catalog::Catalog;
pub use config::{load_config, load_config_in, EngineConfig, ValidatedBool};
pub use contract_type::{ContractType, ContractTypeBuilder, SchemaPolicy};
pub use error::{ConfigError, ContractError, Result};
pub use instance::Contract;
pub use kind::{Computed, ContractRef, Kind, OneOf, ScalarKind};
pub use mutation::MergeOptions;
pub use registry::{AttributeRegistry, DefaultValue, Descriptor};
pub use resolver::{Probe, try_construct};
pub use validation::{rule, SharedValidator, ValueErrors, ValueValidator};
pub use value::{Array, Map, Value};
