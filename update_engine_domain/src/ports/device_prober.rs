// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Block-device label discovery and kernel cmdline inspection, used to derive
//! [`crate::value_objects::SlotIdentity`] and to decide whether the
//! legacy-bootloader compatibility path is active.

use async_trait::async_trait;

use crate::error::UpdateError;

#[async_trait]
pub trait DeviceProber: Send + Sync {
    /// Read the GPT partition label of `device` (e.g. `ROOT-A`, `USR-B`).
    async fn partition_label(&self, device: &str) -> Result<String, UpdateError>;

    /// Read the current GPT priority of the peer slot's partition, for
    /// the `prioritize` step's "strictly greater than peer" invariant.
    async fn peer_priority(&self, peer_device: &str) -> Result<u8, UpdateError>;

    /// The running kernel's cmdline, used to detect the legacy-bootloader
    /// marker token.
    async fn kernel_cmdline(&self) -> Result<String, UpdateError>;
}
