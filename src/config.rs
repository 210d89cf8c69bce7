//! # Configuration Module
//!
//! Generator settings, resolved from three layers in increasing precedence:
//!
//! 1. Built-in defaults
//! 2. An optional TOML file (conventionally `handlergen.toml`)
//! 3. `HANDLERGEN_*` environment variables
//!
//! ## Example
//!
//! ```toml
//! max_degree_of_parallelism = 8
//! enable_handler_registry = true
//! enable_optimized_dispatcher = true
//! enable_pipeline_registry = false
//! runtime_module = "crate::mediator"
//! ```
//!
//! ## Environment Variables
//!
//! | Variable                                 | Field                         |
//! |------------------------------------------|-------------------------------|
//! | `HANDLERGEN_MAX_DEGREE_OF_PARALLELISM`   | `max_degree_of_parallelism`   |
//! | `HANDLERGEN_ENABLE_HANDLER_REGISTRY`     | `enable_handler_registry`     |
//! | `HANDLERGEN_ENABLE_OPTIMIZED_DISPATCHER` | `enable_optimized_dispatcher` |
//! | `HANDLERGEN_ENABLE_PIPELINE_REGISTRY`    | `enable_pipeline_registry`    |
//! | `HANDLERGEN_RUNTIME_MODULE`              | `runtime_module`              |
//!
//! Booleans accept `true/false/1/0/yes/no` in any case. A value that does not parse
//! is ignored with a warning and the lower layer wins.

use crate::discovery::{DiscoveryOptions, DEFAULT_SEQUENTIAL_THRESHOLD};
use crate::generator::{GeneratorOptions, DEFAULT_RUNTIME_MODULE};
use anyhow::Context;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::{debug, warn};


/// Lower bound of `max_degree_of_parallelism`
pub const MIN_PARALLELISM: usize = 1;
/// Upper bound of `max_degree_of_parallelism`
pub const MAX_PARALLELISM: usize = 64;

const ENV_PREFIX: &str = "HANDLERGEN_";

static MODULE_PATH: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^(::)?[A-Za-z_][A-Za-z0-9_]*(::[A-Za-z_][A-Za-z0-9_]*)*$")
        .expect("valid module path regex")
});

/// Configuration error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The TOML document could not be parsed or has unknown fields
    Parse {
        /// Parser message
        message: String,
    },
    /// `runtime_module` is not a Rust module path
    InvalidRuntimeModule {
        /// The rejected value
        value: String,
    },
    /// `sequential_threshold` must be at least 1
    ZeroSequentialThreshold,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Parse { message } => {
                write!(f, "Configuration error: invalid TOML: {message}")
            }
            ConfigError::InvalidRuntimeModule { value } => {
                write!(
                    f,
                    "Configuration error: runtime_module '{value}' is not a module path \
                    (expected e.g. crate::mediator)"
                )
            }
            ConfigError::ZeroSequentialThreshold => {
                write!(f, "Configuration error: sequential_threshold must be at least 1")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Generator configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorConfig {
    /// Worker count hint for discovery, clamped to `[1, 64]`
    pub max_degree_of_parallelism: usize,
    /// Emit the `HANDLER_REGISTRY` table
    pub enable_handler_registry: bool,
    /// Emit dispatch, stream and publish procedures
    pub enable_optimized_dispatcher: bool,
    /// Emit the `PIPELINE_BEHAVIORS` table
    pub enable_pipeline_registry: bool,
    /// Module path the generated code imports runtime types from
    pub runtime_module: String,
    /// Candidate count at which discovery goes parallel
    pub sequential_threshold: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            max_degree_of_parallelism: 4,
            enable_handler_registry: true,
            enable_optimized_dispatcher: true,
            enable_pipeline_registry: true,
            runtime_module: DEFAULT_RUNTIME_MODULE.to_string(),
            sequential_threshold: DEFAULT_SEQUENTIAL_THRESHOLD,
        }
    }
}

impl GeneratorConfig {
    /// Parse a TOML document; absent fields take their defaults
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: GeneratorConfig = toml::from_str(content).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config.normalized())
    }

    /// Resolve defaults, then `path` (if any), then the process environment
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(p) => {
                let content = std::fs::read_to_string(p)
                    .with_context(|| format!("Failed to read config file {}", p.display()))?;
                Self::from_toml_str(&content)
                    .with_context(|| format!("Failed to load config file {}", p.display()))?
            }
            None => Self::default(),
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        debug!(?config, "Generator configuration resolved");
        Ok(config.normalized())
    }

    /// Apply `HANDLERGEN_*` overrides read through `lookup`
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

        if let Some(raw) = var("MAX_DEGREE_OF_PARALLELISM") {
            match raw.trim().parse::<usize>() {
                Ok(v) => self.max_degree_of_parallelism = v,
                Err(_) => warn!(value = %raw, "Ignoring unparseable HANDLERGEN_MAX_DEGREE_OF_PARALLELISM"),
            }
        }
        for (name, field) in [
            ("ENABLE_HANDLER_REGISTRY", &mut self.enable_handler_registry),
            ("ENABLE_OPTIMIZED_DISPATCHER", &mut self.enable_optimized_dispatcher),
            ("ENABLE_PIPELINE_REGISTRY", &mut self.enable_pipeline_registry),
        ] {
            if let Some(raw) = var(name) {
                match parse_bool(&raw) {
                    Some(v) => *field = v,
                    None => warn!(variable = name, value = %raw, "Ignoring unparseable boolean"),
                }
            }
        }
        if let Some(raw) = var("RUNTIME_MODULE") {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                warn!("Ignoring empty HANDLERGEN_RUNTIME_MODULE");
            } else {
                self.runtime_module = trimmed.to_string();
            }
        }
    }

    /// Reject values that cannot be clamped into something usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !MODULE_PATH.is_match(&self.runtime_module) {
            return Err(ConfigError::InvalidRuntimeModule {
                value: self.runtime_module.clone(),
            });
        }
        if self.sequential_threshold == 0 {
            return Err(ConfigError::ZeroSequentialThreshold);
        }
        Ok(())
    }

    /// Clamp numeric fields into their supported ranges
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.max_degree_of_parallelism = self
            .max_degree_of_parallelism
            .clamp(MIN_PARALLELISM, MAX_PARALLELISM);
        self
    }

    #[must_use]
    pub fn discovery_options(&self) -> DiscoveryOptions {
        DiscoveryOptions {
            max_degree_of_parallelism: self.max_degree_of_parallelism,
            sequential_threshold: self.sequential_threshold,
        }
    }

    #[must_use]
    pub fn generator_options(&self, unit_name: &str) -> GeneratorOptions {
        GeneratorOptions {
            unit_name: unit_name.to_string(),
            runtime_module: self.runtime_module.clone(),
            enable_handler_registry: self.enable_handler_registry,
            enable_optimized_dispatcher: self.enable_optimized_dispatcher,
            enable_pipeline_registry: self.enable_pipeline_registry,
        }
    }
}

/// `true/false/1/0/yes/no`, case-insensitive
#[must_use]
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}
