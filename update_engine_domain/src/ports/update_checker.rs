// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Update-check port: the Omaha-style HTTP client is an out-of-scope
//! external collaborator, modeled only by its output contract, an
//! [`InstallPlan`]. No production adapter ships for this port; it exists
//! so [`crate::entities::Pipeline`]-driving code has a documented seam to
//! inject one.

use async_trait::async_trait;

use crate::error::UpdateError;
use crate::value_objects::install_plan::InstallPlan;

/// Checks whatever update-check endpoint the distribution uses and
/// reports either an available version plus its install plan, or that
/// the running system is already current.
#[async_trait]
pub trait UpdateChecker: Send + Sync {
    async fn check(&self) -> Result<Option<(String, InstallPlan)>, UpdateError>;
}
