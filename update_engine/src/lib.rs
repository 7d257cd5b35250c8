// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Update Engine
//!
//! Application and infrastructure for an A/B system updater on an
//! immutable-root Linux distribution: the pipeline's concrete download
//! stage, the post-install slot activator, and the update-service state
//! machine that ties them together and exposes a control surface
//! modeled on `com.coreos.update1.Manager`.
//!
//! The pure domain -- the install plan, slot identity, pipeline/stage
//! entities, and the I/O port traits this crate implements -- lives in
//! `update-engine-domain`. Process bootstrap (CLI parsing, layered
//! config loading primitives, signal handling, shutdown coordination)
//! lives in `update-engine-bootstrap`, reused unchanged from the
//! codebase's composition-root split.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 update-engine-bootstrap                     │
//! │     (CLI, layered config primitives, shutdown, signals)     │
//! └─────────────────────────────────────────────┬───────────────┘
//!                                                │
//! ┌─────────────────────────────────────────────┴───────────────┐
//! │                        application                          │
//! │   download_stage · slot_activator · update_service           │
//! └─────────────────────────────────────────────┬───────────────┘
//!                                                │
//! ┌─────────────────────────────────────────────┴───────────────┐
//! │                       infrastructure                        │
//! │  adapters (fetcher, writer, gpt, esp, executor, vendor hook) │
//! │  repositories (status) · config · logging · metrics          │
//! └─────────────────────────────────────────────┬───────────────┘
//!                                                │
//! ┌─────────────────────────────────────────────┴───────────────┐
//! │                   update-engine-domain                      │
//! │  install plan · slot identity · pipeline/stage · ports       │
//! └───────────────────────────────────────────────────────────────┘
//! ```

pub mod application;
pub mod infrastructure;

pub use application::{ActivationRequest, ControlSurface, DownloadStage, DownloadStageDelegate, SlotActivator, StatusSnapshot, UpdateService};
pub use infrastructure::{load_engine_config, EngineConfig, EngineMetrics, PersistedStatus, StatusRepository};
