use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_MAX_DEPTH: usize = 128;

/// Engine settings.
///
/// `max_depth` bounds recursion in the parser, the evaluator and the
/// analyzers. `cache` toggles the process-wide AST cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub max_depth: usize,
    pub cache: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self { max_depth: DEFAULT_MAX_DEPTH, cache: true }
    }
}

impl Config {
    /// Reads `JEXL_MAX_DEPTH` and `JEXL_DISABLE_CACHE` over the defaults.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(raw) = lookup("JEXL_MAX_DEPTH") {
            config.max_depth = raw
                .trim()
                .parse()
                .map_err(|_| Error::config(format!("JEXL_MAX_DEPTH must be a positive integer, got '{}'", raw)))?;
        }
        if let Some(raw) = lookup("JEXL_DISABLE_CACHE") {
            config.cache = !matches!(raw.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }
        config.validate()
    }

    /// Loads a JSON config file; missing fields keep their defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("Cannot read {}: {}", path.display(), e)))?;
        let config: Config = serde_json::from_str(&text)
            .map_err(|e| Error::config(format!("Invalid config in {}: {}", path.display(), e)))?;
        config.validate()
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_cache(mut self, cache: bool) -> Self {
        self.cache = cache;
        self
    }

    fn validate(self) -> Result<Self, Error> {
        if self.max_depth == 0 {
            return Err(Error::config("max_depth must be at least 1"));
        }
        Ok(self)
    }
}
