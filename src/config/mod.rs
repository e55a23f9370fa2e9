//! Secret/config collaborator
//!
//! The compiler validates every planned tool's `required_config` keys
//! against this store before returning a plan, so a missing API key fails
//! compilation instead of surfacing mid-execution.

use std::collections::HashMap;

/// Read-only config/secret lookup
pub trait ConfigStore: Send + Sync {
    /// Is the key present (and non-empty)?
    fn has(&self, key: &str) -> bool;

    /// Fetch the value for a key
    fn get(&self, key: &str) -> Option<String>;
}

/// Store backed by process environment variables
///
/// System environment always wins; an optional prefix namespaces lookups
/// (e.g. prefix "WEAVR_" maps key "API_KEY" to env var "WEAVR_API_KEY").
#[derive(Debug, Default)]
pub struct EnvConfig {
    prefix: String,
}

impl EnvConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    fn env_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }
}

impl ConfigStore for EnvConfig {
    fn has(&self, key: &str) -> bool {
        std::env::var(self.env_key(key))
            .map(|v| !v.trim().is_empty())
            .unwrap_or(false)
    }

    fn get(&self, key: &str) -> Option<String> {
        std::env::var(self.env_key(key)).ok().filter(|v| !v.trim().is_empty())
    }
}

/// In-memory store for tests and programmatic setup
#[derive(Debug, Default)]
pub struct MapConfig {
    values: HashMap<String, String>,
}

impl MapConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }
}

impl ConfigStore for MapConfig {
    fn has(&self, key: &str) -> bool {
        self.values
            .get(key)
            .map(|v| !v.trim().is_empty())
            .unwrap_or(false)
    }

    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned().filter(|v| !v.trim().is_empty())
    }
}
