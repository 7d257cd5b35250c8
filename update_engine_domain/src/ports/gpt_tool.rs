// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! GPT attribute operations, invoked through the image-bundled tool.
//! The port exposes the four operations the finalizer issues;
//! `update-engine`'s infrastructure layer maps each to an [`Executor`]
//! call against the real binary.
//!
//! [`Executor`]: crate::ports::executor::Executor

use async_trait::async_trait;

use crate::error::UpdateError;

#[async_trait]
pub trait GptTool: Send + Sync {
    /// `repair <device>` -- reconcile GPT metadata.
    async fn repair(&self, device: &str) -> Result<(), UpdateError>;

    /// `add -S0 -T1 <device>` -- set `successful=0`, `tries=1` on the
    /// slot's partition.
    async fn set_attrs(&self, device: &str, tries: u8, successful: bool) -> Result<(), UpdateError>;

    /// `prioritize <device>` -- raise this slot's priority above its peer's
    /// current priority (capped).
    async fn prioritize(&self, device: &str, peer_priority: u8) -> Result<(), UpdateError>;

    /// `show <device>` -- diagnostic only, returns the tool's raw stdout.
    async fn show(&self, device: &str) -> Result<String, UpdateError>;
}
