//! Configuration loading and validation.

mod types;
mod validation;

pub use types::*;

use crate::error::{MigrateError, Result};
use std::path::{Path, PathBuf};

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Load a YAML file, filling an empty `target.url` from `fallback_url`
    /// (then `DATABASE_URL`).
    pub fn load_with_fallback_url<P: AsRef<Path>>(
        path: P,
        fallback_url: Option<String>,
    ) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content, fallback_url.or_else(|| env_var(DATABASE_URL_ENV)))
    }

    /// Parse configuration from a YAML string.
    ///
    /// An empty `target.url` is filled from `DATABASE_URL`.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Self::parse(yaml, env_var(DATABASE_URL_ENV))
    }

    fn parse(yaml: &str, fallback_url: Option<String>) -> Result<Self> {
        let mut config: Config = serde_yaml::from_str(yaml)?;
        if config.target.url.trim().is_empty() {
            if let Some(url) = fallback_url {
                config.target.url = url;
            }
        }
        config.validate()?;
        Ok(config)
    }

    /// Build the default configuration from the process environment.
    ///
    /// `DATABASE_URL` is required; `LEGACY_DB_PATH` and `PG_SSL_MODE` are optional.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(env_var)
    }

    /// Default configuration pointed at the given destination.
    pub fn with_database_url(url: impl Into<String>) -> Self {
        Config {
            target: TargetConfig {
                url: url.into(),
                ..TargetConfig::default()
            },
            ..Config::default()
        }
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let url = lookup(DATABASE_URL_ENV).ok_or_else(|| {
            MigrateError::Config(format!("{} is not set", DATABASE_URL_ENV))
        })?;

        let mut config = Self::with_database_url(url);
        if let Some(path) = lookup(LEGACY_DB_PATH_ENV) {
            config.source.path = PathBuf::from(path);
        }
        if let Some(mode) = lookup(PG_SSL_MODE_ENV) {
            config.target.ssl_mode = mode;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
