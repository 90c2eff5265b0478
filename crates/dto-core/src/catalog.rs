//! Named collection of contract types.
//!
//! Deferred references (`ContractRef::Deferred`) are resolved against the
//! catalog a type was defined in. Types hold only a weak link back to it.

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::warn;

use crate::config::EngineConfig;
use crate::contract_type::{ContractType, ContractTypeBuilder};

/// Registry of defined contract types, keyed by name.
#[derive(Debug, Default)]
pub struct Catalog {
    config: EngineConfig,
    types: RwLock<HashMap<String, ContractType>>,
}

impl Catalog {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Self::with_config(EngineConfig::default())
    }

    #[must_use]
    pub fn with_config(config: EngineConfig) -> Arc<Self> {
        Arc::new(Self {
            config,
            types: RwLock::new(HashMap::new()),
        })
    }

    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Build `builder` against this catalog and register the result.
    ///
    /// Redefining a name replaces the earlier type for future lookups; types
    /// that already cached the old handle keep using it.
    pub fn define(self: &Arc<Self>, builder: ContractTypeBuilder) -> ContractType {
        let ty = builder.attach(self).build();
        let mut types = self.types.write().unwrap_or_else(PoisonError::into_inner);
        if types.insert(ty.name().to_string(), ty.clone()).is_some() {
            warn!(contract = %ty.name(), "contract type redefined in catalog");
        }
        ty
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<ContractType> {
        self.types
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Defined names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .types
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }
}
