// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Application
//!
//! The use-case layer: concrete [`stages::Stage`](update_engine_domain::Stage)
//! implementations that plug into the domain's [`Pipeline`](update_engine_domain::Pipeline),
//! the slot activator run after a successful download, and the update
//! service state machine that orchestrates a full check/download/verify/
//! finalize cycle and exposes it over a [`ControlSurface`].

pub mod slot_activator;
pub mod stages;
pub mod update_service;

pub use slot_activator::{ActivationRequest, SlotActivator};
pub use stages::{DownloadStage, DownloadStageDelegate};
pub use update_service::{ControlSurface, StatusSnapshot, UpdateService};
