// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Filesystem probing capability. Locates and mounts the EFI System
//! Partition and stages a kernel image onto it.

use async_trait::async_trait;

use crate::error::UpdateError;

/// A mounted ESP, with the mount point it was found or placed at and
/// whether this locator is responsible for tearing the mount down again.
#[derive(Debug, Clone)]
pub struct MountedEsp {
    pub mount_point: String,
    pub needs_teardown: bool,
}

#[async_trait]
pub trait EspLocator: Send + Sync {
    /// Scan block devices for the EFI System Partition type GUID
    /// (`c12a7328-f81f-11d2-ba4b-00a0c93ec93b`) and ensure it is mounted,
    /// mounting it if necessary. Fails with [`UpdateError::EspNotFound`]
    /// if no such partition exists.
    async fn locate_and_mount(&self) -> Result<MountedEsp, UpdateError>;

    /// Write `bytes` to `relative_path` under the ESP's mount point,
    /// creating parent directories as needed.
    async fn stage_file(&self, esp: &MountedEsp, relative_path: &str, bytes: &[u8]) -> Result<(), UpdateError>;

    /// Read `relative_path` under the ESP's mount point, if present.
    async fn read_file(&self, esp: &MountedEsp, relative_path: &str) -> Result<Option<Vec<u8>>, UpdateError>;

    /// Unmount and clean up, only if `esp.needs_teardown`. Idempotent.
    async fn teardown(&self, esp: &MountedEsp) -> Result<(), UpdateError>;
}
