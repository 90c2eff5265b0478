//! Engine configuration loading.
//!
//! # Hierarchy
//!
//! Configuration is loaded in this order (later overrides earlier):
//! 1. Built-in defaults
//! 2. Global config: `<config dir>/dto/config.toml`
//! 3. Project config: `.dto/config.toml`
//! 4. Environment variables: `DTO_*`
//!
//! # Example Config
//!
//! ```toml
//! [errors]
//! key_separator = "."
//!
//! [coercion]
//! log_fallbacks = true
//!
//! [schema]
//! permissive = false
//! ```

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

type Result<T> = std::result::Result<T, ConfigError>;

pub const ENV_KEY_SEPARATOR: &str = "DTO_ERROR_KEY_SEPARATOR";
pub const ENV_LOG_FALLBACKS: &str = "DTO_LOG_FALLBACKS";
pub const ENV_PERMISSIVE: &str = "DTO_PERMISSIVE";

const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576; // 1 MB

// ═══════════════════════════════════════════════════════════════════════════
// VALIDATED BOOLEAN TYPE - rejects string values for boolean fields
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(into = "bool")]
pub struct ValidatedBool(bool);

impl ValidatedBool {
    #[must_use]
    #[inline]
    pub const fn as_bool(self) -> bool {
        self.0
    }
}

impl From<bool> for ValidatedBool {
    fn from(b: bool) -> Self {
        Self(b)
    }
}

impl From<ValidatedBool> for bool {
    fn from(v: ValidatedBool) -> Self {
        v.0
    }
}

impl<'de> Deserialize<'de> for ValidatedBool {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct BoolVisitor;

        impl serde::de::Visitor<'_> for BoolVisitor {
            type Value = ValidatedBool;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("a boolean value (true or false)")
            }

            fn visit_bool<E>(self, v: bool) -> std::result::Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(ValidatedBool(v))
            }

            fn visit_str<E>(self, v: &str) -> std::result::Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Err(serde::de::Error::invalid_type(
                    serde::de::Unexpected::Str(v),
                    &self,
                ))
            }
        }

        deserializer.deserialize_bool(BoolVisitor)
    }
}

impl FromStr for ValidatedBool {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "true" | "1" => Ok(Self(true)),
            "false" | "0" => Ok(Self(false)),
            _ => Err(format!("'{s}' is not a boolean, expected 'true' or 'false'")),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// CONFIGURATION STRUCTURES
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub errors: ErrorsConfig,
    pub coercion: CoercionConfig,
    pub schema: SchemaConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorsConfig {
    /// Joins a parent attribute and a nested error key
    pub key_separator: String,
}

impl Default for ErrorsConfig {
    fn default() -> Self {
        Self {
            key_separator: ".".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoercionConfig {
    /// Emit a debug event for every detected fallback cast
    pub log_fallbacks: ValidatedBool,
}

impl Default for CoercionConfig {
    fn default() -> Self {
        Self {
            log_fallbacks: ValidatedBool(true),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaConfig {
    /// Default policy for types that do not choose one
    pub permissive: ValidatedBool,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            permissive: ValidatedBool(false),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// PARTIAL CONFIG (explicit-key merge semantics)
// ═══════════════════════════════════════════════════════════════════════════

/// A config file as written: only keys present in the file are `Some`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PartialEngineConfig {
    pub errors: Option<PartialErrorsConfig>,
    pub coercion: Option<PartialCoercionConfig>,
    pub schema: Option<PartialSchemaConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PartialErrorsConfig {
    pub key_separator: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PartialCoercionConfig {
    pub log_fallbacks: Option<ValidatedBool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PartialSchemaConfig {
    pub permissive: Option<ValidatedBool>,
}

impl EngineConfig {
    /// Merge partial config, only updating fields that are `Some(value)`.
    pub fn merge_partial(&mut self, partial: PartialEngineConfig) {
        if let Some(errors) = partial.errors {
            if let Some(key_separator) = errors.key_separator {
                self.errors.key_separator = key_separator;
            }
        }
        if let Some(coercion) = partial.coercion {
            if let Some(log_fallbacks) = coercion.log_fallbacks {
                self.coercion.log_fallbacks = log_fallbacks;
            }
        }
        if let Some(schema) = partial.schema {
            if let Some(permissive) = schema.permissive {
                self.schema.permissive = permissive;
            }
        }
    }

    /// Apply `DTO_*` environment variable overrides.
    ///
    /// # Errors
    ///
    /// `InvalidValue` if a boolean variable does not parse.
    pub fn apply_env_vars(&mut self) -> Result<()> {
        if let Ok(value) = std::env::var(ENV_KEY_SEPARATOR) {
            self.errors.key_separator = value;
        }

        if let Ok(value) = std::env::var(ENV_LOG_FALLBACKS) {
            self.coercion.log_fallbacks = parse_env_bool(ENV_LOG_FALLBACKS, &value)?;
        }

        if let Ok(value) = std::env::var(ENV_PERMISSIVE) {
            self.schema.permissive = parse_env_bool(ENV_PERMISSIVE, &value)?;
        }

        Ok(())
    }

    /// # Errors
    ///
    /// `InvalidValue` if the error key separator is empty.
    pub fn validate(&self) -> Result<()> {
        if self.errors.key_separator.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "errors.key_separator".to_string(),
                reason: "cannot be empty".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_env_bool(key: &str, value: &str) -> Result<ValidatedBool> {
    value.parse().map_err(|reason| ConfigError::InvalidValue {
        key: key.to_string(),
        reason,
    })
}

// ═══════════════════════════════════════════════════════════════════════════
// LOADING
// ═══════════════════════════════════════════════════════════════════════════

/// Load configuration with full hierarchy, using the current directory as
/// the project root.
///
/// # Errors
///
/// Returns error if:
/// - A config file exists but is malformed, oversized or a symlink
/// - An environment variable holds an invalid value
/// - The merged config fails validation
pub fn load_config() -> Result<EngineConfig> {
    let project_root = std::env::current_dir().map_err(|source| ConfigError::Io {
        path: PathBuf::from("."),
        source,
    })?;
    load_config_in(&project_root)
}

/// Load configuration with `project_root` holding the project config.
///
/// # Errors
///
/// Same as [`load_config`].
pub fn load_config_in(project_root: &Path) -> Result<EngineConfig> {
    let mut config = EngineConfig::default();

    if let Some(global_path) = global_config_path() {
        merge_file_if_present(&mut config, &global_path)?;
    }

    merge_file_if_present(&mut config, &project_config_path(project_root))?;

    config.apply_env_vars()?;
    config.validate()?;
    Ok(config)
}

fn merge_file_if_present(config: &mut EngineConfig, path: &Path) -> Result<()> {
    match load_partial_toml_file(path) {
        Ok(partial) => {
            config.merge_partial(partial);
            Ok(())
        }
        // Config file doesn't exist - skip silently
        Err(ConfigError::Io { source, .. }) if source.kind() == std::io::ErrorKind::NotFound => {
            Ok(())
        }
        Err(e) => Err(e),
    }
}

#[must_use]
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(".dto").join("config.toml")
}

fn global_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "dto")
        .map(|proj_dirs| proj_dirs.config_dir().join("config.toml"))
}

/// Load a TOML file into a [`PartialEngineConfig`].
///
/// # Errors
///
/// Returns error if:
/// - File cannot be read
/// - File is a symlink or exceeds the size limit
/// - TOML is malformed or has unknown keys
pub fn load_partial_toml_file(path: &Path) -> Result<PartialEngineConfig> {
    let metadata = std::fs::symlink_metadata(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    if metadata.is_symlink() {
        return Err(ConfigError::InvalidValue {
            key: path.display().to_string(),
            reason: "config file is a symbolic link - refusing to follow".to_string(),
        });
    }

    if metadata.len() > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::InvalidValue {
            key: path.display().to_string(),
            reason: format!("config file exceeds maximum size of {MAX_CONFIG_FILE_SIZE} bytes"),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse a complete config document over the defaults.
///
/// # Errors
///
/// `Parse` for malformed TOML or unknown keys, `InvalidValue` if the
/// result fails validation.
pub fn from_toml_str(content: &str) -> Result<EngineConfig> {
    let partial: PartialEngineConfig = toml::from_str(content).map_err(|source| ConfigError::Parse {
        path: PathBuf::from("<inline>"),
        source,
    })?;
    let mut config = EngineConfig::default();
    config.merge_partial(partial);
    config.validate()?;
    Ok(config)
}

// ═══════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════
