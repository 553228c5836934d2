//! Configuration
//!
//! Ceilings and feature sets for query construction, plus an optional
//! static schema, loaded from TOML:
//!
//! ```toml
//! [query]
//! max_size = 12
//! features = ["property", "category", "conjunction", "disjunction"]
//!
//! [schema.properties]
//! Population = "_num"
//!
//! [schema.namespaces]
//! Kategorie = 14
//! ```

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::datavalue::DataType;
use crate::description::{AlgebraConfig, QueryFeatures};
use crate::error::ConfigError;
use crate::prune::Budget;
use crate::schema::StaticSchema;

/// Main configuration structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    /// Query ceilings and features
    #[serde(default)]
    pub query: QueryConfig,

    /// Static schema used when no live wiki is attached
    #[serde(default)]
    pub schema: SchemaConfig,
}

impl Config {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(text)?;
        config.query.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}

/// Query-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Constructs allowed in ordinary queries
    #[serde(default = "default_features")]
    pub features: QueryFeatures,

    /// Constructs allowed in concept definitions
    #[serde(default = "default_concept_features")]
    pub concept_features: QueryFeatures,

    /// Largest description size before pruning
    #[serde(default = "default_max_size")]
    pub max_size: usize,

    /// Deepest property nesting before pruning
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    #[serde(default = "default_concept_max_size")]
    pub concept_max_size: usize,

    #[serde(default = "default_concept_max_depth")]
    pub concept_max_depth: usize,

    /// Global result limit
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,

    /// Result limit for inline queries
    #[serde(default = "default_max_inline_limit")]
    pub max_inline_limit: usize,

    /// Limit used when a query does not ask for one
    #[serde(default = "default_limit")]
    pub default_limit: usize,

    /// Subcategory levels the backend expands; 0 makes every category of a
    /// class count towards the size
    #[serde(default = "default_subcategory_depth")]
    pub subcategory_depth: u32,

    /// Namespaces conditions are restricted to when they name none
    #[serde(default)]
    pub default_namespaces: Vec<i32>,

    /// Deepest `<q>` nesting the parser follows
    #[serde(default = "default_max_nesting")]
    pub max_nesting: usize,
}

fn default_features() -> QueryFeatures {
    QueryFeatures::ALL
}

fn default_concept_features() -> QueryFeatures {
    QueryFeatures::PROPERTY
        | QueryFeatures::CATEGORY
        | QueryFeatures::NAMESPACE
        | QueryFeatures::CONJUNCTION
        | QueryFeatures::DISJUNCTION
}

fn default_max_size() -> usize {
    12
}

fn default_max_depth() -> usize {
    4
}

fn default_concept_max_size() -> usize {
    20
}

fn default_concept_max_depth() -> usize {
    8
}

fn default_max_limit() -> usize {
    10_000
}

fn default_max_inline_limit() -> usize {
    500
}

fn default_limit() -> usize {
    50
}

fn default_subcategory_depth() -> u32 {
    10
}

fn default_max_nesting() -> usize {
    crate::parser::DEFAULT_MAX_NESTING
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            features: default_features(),
            concept_features: default_concept_features(),
            max_size: default_max_size(),
            max_depth: default_max_depth(),
            concept_max_size: default_concept_max_size(),
            concept_max_depth: default_concept_max_depth(),
            max_limit: default_max_limit(),
            max_inline_limit: default_max_inline_limit(),
            default_limit: default_limit(),
            subcategory_depth: default_subcategory_depth(),
            default_namespaces: Vec::new(),
            max_nesting: default_max_nesting(),
        }
    }
}

impl QueryConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: QueryConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_inline_limit > self.max_limit {
            return Err(ConfigError::Invalid(format!(
                "max_inline_limit ({}) exceeds max_limit ({})",
                self.max_inline_limit, self.max_limit
            )));
        }
        if self.default_limit > self.max_limit {
            return Err(ConfigError::Invalid(format!(
                "default_limit ({}) exceeds max_limit ({})",
                self.default_limit, self.max_limit
            )));
        }
        if self.max_nesting == 0 {
            return Err(ConfigError::Invalid("max_nesting must be positive".to_string()));
        }
        Ok(())
    }

    pub fn algebra(&self) -> AlgebraConfig {
        AlgebraConfig {
            subcategory_depth: self.subcategory_depth,
        }
    }

    /// Size/depth ceilings for ordinary or concept queries
    pub fn ceilings(&self, concept: bool) -> Budget {
        if concept {
            Budget::new(self.concept_max_size, self.concept_max_depth)
        } else {
            Budget::new(self.max_size, self.max_depth)
        }
    }

    pub fn features_for(&self, concept: bool) -> QueryFeatures {
        if concept {
            self.concept_features
        } else {
            self.features
        }
    }
}

/// Static schema configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SchemaConfig {
    /// Declared property types by name
    #[serde(default)]
    pub properties: IndexMap<String, DataType>,

    /// Localized namespace names
    #[serde(default)]
    pub namespaces: IndexMap<String, i32>,
}

impl SchemaConfig {
    pub fn build(&self) -> StaticSchema {
        let schema = self
            .properties
            .iter()
            .fold(StaticSchema::new(), |s, (name, ty)| s.with_property(name, *ty));
        self.namespaces
            .iter()
            .fold(schema, |s, (alias, idx)| s.with_namespace_alias(alias, *idx))
    }
}
