// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Opaque per-vendor post-install hook, an out-of-scope external
//! collaborator. The core only needs to know whether one is present and
//! what it returned; per-vendor remediation logic is explicitly not part
//! of this design ("one-shot workaround patches").

use async_trait::async_trait;

use crate::error::UpdateError;
use crate::value_objects::SlotIdentity;

#[async_trait]
pub trait VendorHook: Send + Sync {
    /// Whether a hook is installed at the well-known path. If `false`,
    /// the activator skips invocation entirely -- absence is not an error.
    async fn is_present(&self) -> bool;

    /// Invoke the hook with `(slot_identity, staging_root)`. Only called
    /// when [`is_present`](VendorHook::is_present) returned `true`. A
    /// non-zero exit propagates as [`UpdateError::HookError`].
    async fn invoke(&self, slot: SlotIdentity, staging_root: &str) -> Result<(), UpdateError>;
}
