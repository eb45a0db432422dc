//! Rate-limit table: category → `[sec, min, hour, day]` ceilings.
//!
//! ```toml
//! fallback = "error"
//!
//! [categories]
//! fpath = [1, 2, 5, 10]
//! error = [1, 1, 32, 64]
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Category that governs records with an unconfigured prefix.
pub const DEFAULT_FALLBACK: &str = "error";

/// Validated rate-limit configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RateLimits {
    /// Category used for unknown prefixes.
    #[serde(default = "default_fallback")]
    pub fallback: String,
    /// Ceilings per category, finest window first.
    pub categories: BTreeMap<String, [u32; 4]>,
}

fn default_fallback() -> String {
    DEFAULT_FALLBACK.to_string()
}

impl Default for RateLimits {
    /// `fpath [1,2,5,10]`, `npath [1,1,1,24]`, `cfg [1,1,1,1]`, `error [1,1,32,64]`.
    fn default() -> Self {
        let categories = [
            ("fpath", [1, 2, 5, 10]),
            ("npath", [1, 1, 1, 24]),
            ("cfg", [1, 1, 1, 1]),
            (DEFAULT_FALLBACK, [1, 1, 32, 64]),
        ]
        .into_iter()
        .map(|(name, max)| (name.to_string(), max))
        .collect();
        Self {
            fallback: default_fallback(),
            categories,
        }
    }
}

impl RateLimits {
    /// Builds a table from `(category, ceilings)` pairs with the default fallback name.
    pub fn new<I, S>(categories: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (S, [u32; 4])>,
        S: Into<String>,
    {
        let limits = Self {
            fallback: default_fallback(),
            categories: categories
                .into_iter()
                .map(|(name, max)| (name.into(), max))
                .collect(),
        };
        limits.validate()?;
        Ok(limits)
    }

    /// Parses and validates a TOML table.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let limits: Self = toml::from_str(raw)?;
        limits.validate()?;
        Ok(limits)
    }

    /// Reads, parses and validates a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Rejects tables without an entry for the fallback category.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.categories.contains_key(&self.fallback) {
            Ok(())
        } else {
            Err(ConfigError::MissingFallback {
                category: self.fallback.clone(),
            })
        }
    }

    /// Ceilings of `category`, if configured.
    pub fn get(&self, category: &str) -> Option<[u32; 4]> {
        self.categories.get(category).copied()
    }
}
