// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Engine Configuration
//!
//! The layered configuration snapshot: defaults
//! embedded in code, overridden by an optional TOML file, overridden by
//! environment variables (`UPDATE_ENGINE__*`), built on the bootstrap
//! crate's [`load_layered`] helper. Validated once at load; every field
//! downstream code reads is already known-good.

use serde::{Deserialize, Serialize};
use std::path::Path;

use update_engine_bootstrap::config::load_layered;
use update_engine_domain::{UpdateError, CHUNK_MAX};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum bytes per fetcher chunk. Defaults to the domain's
    /// [`CHUNK_MAX`]; configurable mainly for tests that want a smaller
    /// constant to exercise multi-chunk logic cheaply.
    pub chunk_max_bytes: usize,

    /// The Omaha-style update-check endpoint. The core only consumes its
    /// output (an install plan); this URL is carried here for the
    /// external collaborator that is out of scope for this core.
    pub update_check_url: String,

    /// Path to the image-bundled GPT tool.
    pub gpt_tool_path: String,

    /// Dynamic linker to invoke the GPT tool through, if the host's
    /// linker may be incompatible with the new image.
    pub gpt_tool_loader_prefix: Option<String>,

    /// Well-known path for the optional vendor post-install hook.
    pub vendor_hook_path: String,

    /// Scratch directory used to mount the ESP when it is not already
    /// mounted.
    pub esp_scratch_dir: String,

    /// Marker token searched for in the kernel cmdline to enable the
    /// legacy-bootloader compatibility path.
    pub legacy_bootloader_marker: String,

    /// SQLite file backing the persisted status record
    /// 10).
    pub status_db_path: String,

    /// `trace`/`debug`/`info`/`warn`/`error`.
    pub log_level: String,

    /// `pretty` or `json`.
    pub log_format: String,

    /// `host:port` to bind the Prometheus metrics endpoint on, or `None`
    /// to disable it (the default in tests).
    pub metrics_bind_address: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            chunk_max_bytes: CHUNK_MAX,
            update_check_url: "https://update.example.invalid/v1/update_check".to_string(),
            gpt_tool_path: "/usr/bin/gpt".to_string(),
            gpt_tool_loader_prefix: None,
            vendor_hook_path: "/usr/share/update_engine/vendor_hook".to_string(),
            esp_scratch_dir: "/run/update-engine/esp".to_string(),
            legacy_bootloader_marker: "cros_legacy".to_string(),
            status_db_path: "/var/lib/update-engine/status.db".to_string(),
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_bind_address: None,
        }
    }
}

impl EngineConfig {
    /// Validate cross-field invariants that `serde` alone cannot express.
    /// Called once, immediately after loading; nothing downstream
    /// re-validates.
    pub fn validate(&self) -> Result<(), UpdateError> {
        if self.chunk_max_bytes == 0 {
            return Err(UpdateError::InvalidConfiguration(
                "chunk_max_bytes must be greater than zero".to_string(),
            ));
        }
        if self.update_check_url.parse::<reqwest::Url>().is_err() {
            return Err(UpdateError::InvalidConfiguration(format!(
                "update_check_url {:?} is not a well-formed URL",
                self.update_check_url
            )));
        }
        Ok(())
    }
}

/// Load, validate, and return the engine configuration.
pub fn load_engine_config(file: Option<&Path>) -> Result<EngineConfig, UpdateError> {
    let defaults = EngineConfig::default();
    let config: EngineConfig = load_layered(&defaults, file, "UPDATE_ENGINE")
        .map_err(|e| UpdateError::InvalidConfiguration(e.to_string()))?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        let mut config = EngineConfig::default();
        config.chunk_max_bytes = 0;
        assert!(matches!(config.validate(), Err(UpdateError::InvalidConfiguration(_))));
    }

    #[test]
    fn malformed_update_check_url_is_rejected() {
        let mut config = EngineConfig::default();
        config.update_check_url = "not a url".to_string();
        assert!(matches!(config.validate(), Err(UpdateError::InvalidConfiguration(_))));
    }

    #[test]
    fn load_engine_config_returns_validated_defaults_with_no_file() {
        let config = load_engine_config(None).unwrap();
        assert_eq!(config.chunk_max_bytes, CHUNK_MAX);
    }
}
