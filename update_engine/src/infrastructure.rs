// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Infrastructure
//!
//! Everything that talks to the outside world: the concrete adapters
//! behind the domain's I/O ports, layered configuration, structured
//! logging, Prometheus metrics, and the persisted status record.
//! Nothing here holds business rules -- that stays in `application` and
//! `update_engine_domain`.

pub mod adapters;
pub mod config;
pub mod logging;
pub mod metrics;
pub mod repositories;

pub use config::{load_engine_config, EngineConfig};
pub use metrics::EngineMetrics;
pub use repositories::{PersistedStatus, StatusRepository};
