// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Layered Configuration Loading
//!
//! Generic plumbing for "defaults < file < environment" configuration,
//! shared by every config struct in this workspace. The concrete,
//! domain-specific `EngineConfig` lives in the `update-engine` crate's
//! `infrastructure::config` module and is built on top of [`load_layered`].
//!
//! This module also owns [`BootstrapConfig`], the handful of settings
//! bootstrap itself needs before the rest of the application (and its
//! richer config) exists: how to format logs and where to bind metrics.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur while loading layered configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),

    #[error("configuration file not found: {0}")]
    FileNotFound(String),
}

/// Load a config struct from embedded defaults, an optional TOML file, and
/// environment variables, in that order of increasing precedence.
///
/// `env_prefix` is upper-cased and used as the prefix for environment
/// overrides, e.g. prefix `"UPDATE_ENGINE"` lets `UPDATE_ENGINE_CHUNK_MAX_BYTES`
/// override `chunk_max_bytes`. Nested fields use `__` as a separator.
pub fn load_layered<T, D>(defaults: &D, file: Option<&Path>, env_prefix: &str) -> Result<T, ConfigError>
where
    T: DeserializeOwned,
    D: Serialize,
{
    let mut builder = config::Config::builder().add_source(config::Config::try_from(defaults)?);

    if let Some(path) = file {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }
        builder = builder.add_source(config::File::from(path));
    }

    builder = builder.add_source(
        config::Environment::with_prefix(env_prefix)
            .separator("__")
            .try_parsing(true),
    );

    Ok(builder.build()?.try_deserialize()?)
}

/// Minimal settings the bootstrap layer needs before application-level
/// configuration has been loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapConfig {
    /// `trace`, `debug`, `info`, `warn`, or `error`
    pub log_level: String,
    /// `pretty` (human-readable, for a terminal) or `json` (structured, for production)
    pub log_format: String,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_only_round_trip() {
        let defaults = BootstrapConfig::default();
        let loaded: BootstrapConfig = load_layered(&defaults, None, "UPDATE_ENGINE_TEST_NOENV").unwrap();
        assert_eq!(loaded.log_level, "info");
        assert_eq!(loaded.log_format, "pretty");
    }

    #[test]
    fn missing_file_is_an_error() {
        let defaults = BootstrapConfig::default();
        let result: Result<BootstrapConfig, _> =
            load_layered(&defaults, Some(Path::new("/nonexistent/config.toml")), "UPDATE_ENGINE_TEST");
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }
}
