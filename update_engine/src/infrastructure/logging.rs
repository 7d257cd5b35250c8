// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Structured Logging
//!
//! Initializes `tracing` once at bootstrap, with an
//! env-filter-driven level and a formatter chosen by [`EngineConfig`]:
//! JSON in production, human-readable in development. Stage transitions,
//! download progress milestones, and activation steps are logged at
//! `info`; recoverable conditions at `warn`; fatal activation failures at
//! `error` -- see the call sites in `application::stages::download_stage`
//! and `application::slot_activator`.

use tracing_subscriber::{fmt, EnvFilter};

use crate::infrastructure::config::EngineConfig;

/// Initialize the global `tracing` subscriber. Must be called exactly
/// once, as early in `main` as possible, before any other module logs.
pub fn init_logging(config: &EngineConfig) {
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    if config.log_format == "json" {
        fmt()
            .with_env_filter(filter)
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .init();
    } else {
        fmt().with_env_filter(filter).pretty().init();
    }
}
