//! # Runtime Configuration Module
//!
//! Application settings for the dispatch core.
//!
//! ## Sources
//!
//! Settings are layered, later sources winning:
//!
//! 1. Built-in defaults ([`AppConfig::default`])
//! 2. A YAML file ([`AppConfig::load`])
//! 3. Environment variables ([`AppConfig::apply_env`])
//!
//! ## Environment Variables
//!
//! ### `SWITCHYARD_DEBUG`
//!
//! `true`/`1`/`yes` includes underlying error messages in 500 responses.
//! Leave it off in production: messages may reveal internals.
//!
//! Default: `false`
//!
//! ### `SWITCHYARD_MAX_RESOLUTION_DEPTH`
//!
//! How many services may be under construction at once on one resolution
//! path before the container gives up. Guards against runaway dependency
//! graphs that are deep without being cyclic.
//!
//! Default: `64`
//!
//! ### `SWITCHYARD_EAGER_SINGLETONS`
//!
//! Construct every singleton while building the application, so missing
//! bindings and cycles abort start-up instead of failing the first request.
//!
//! Default: `true`
//!
//! ### `SWITCHYARD_LOG_*`
//!
//! See [`LogConfig::apply_env`].
//!
//! ## Example
//!
//! ```rust
//! use switchyard::runtime_config::AppConfig;
//!
//! let config: AppConfig = serde_yaml::from_str("debug: true\nlog:\n  format: pretty\n").unwrap();
//! assert!(config.debug);
//! assert_eq!(config.max_resolution_depth, 64);
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

use crate::container::DEFAULT_MAX_DEPTH;
use crate::logging::LogConfig;

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Show underlying error messages in 500 responses
    pub debug: bool,
    /// Container resolution depth limit
    pub max_resolution_depth: usize,
    /// Construct all singletons during start-up
    pub eager_singletons: bool,
    /// Logging section
    pub log: LogConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            debug: false,
            max_resolution_depth: DEFAULT_MAX_DEPTH,
            eager_singletons: true,
            log: LogConfig::default(),
        }
    }
}

impl AppConfig {
    /// Defaults overlaid with environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Read a YAML file, then overlay environment variables.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config: Self = serde_yaml::from_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.apply_env();
        Ok(config)
    }

    /// Overlay `SWITCHYARD_*` environment variables onto `self`.
    ///
    /// Unparseable values are ignored and the current value is kept.
    pub fn apply_env(&mut self) {
        if let Some(debug) = env::var("SWITCHYARD_DEBUG").ok().and_then(|v| parse_bool(&v)) {
            self.debug = debug;
        }
        if let Some(depth) = env::var("SWITCHYARD_MAX_RESOLUTION_DEPTH")
            .ok()
            .and_then(|v| v.trim().parse::<usize>().ok())
            .filter(|d| *d > 0)
        {
            self.max_resolution_depth = depth;
        }
        if let Some(eager) = env::var("SWITCHYARD_EAGER_SINGLETONS")
            .ok()
            .and_then(|v| parse_bool(&v))
        {
            self.eager_singletons = eager;
        }
        self.log.apply_env();
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogFormat;

    #[test]
    fn parse_bool_variants() {
        assert_eq!(parse_bool(" Yes "), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config: AppConfig =
            serde_yaml::from_str("max_resolution_depth: 8\nlog:\n  format: pretty\n").unwrap();
        assert_eq!(config.max_resolution_depth, 8);
        assert!(!config.debug);
        assert!(config.eager_singletons);
        assert_eq!(config.log.format, LogFormat::Pretty);
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn load_reports_missing_file() {
        let err = AppConfig::load("/nonexistent/switchyard.yaml").unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
