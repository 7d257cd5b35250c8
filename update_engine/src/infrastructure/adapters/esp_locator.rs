// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! [`EspLocator`] implementation:
//! finds the EFI System Partition via the udev-maintained
//! `/dev/disk/by-parttypeuuid/<type-guid>` symlink, mounts it under a
//! scratch directory if it isn't already mounted, and stages files onto
//! it.

use async_trait::async_trait;
use nix::mount::{mount, umount, MsFlags};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

use update_engine_domain::{EspLocator, MountedEsp, UpdateError};

/// The well-known GPT partition type GUID for the EFI System Partition
.
pub const ESP_TYPE_GUID: &str = "c12a7328-f81f-11d2-ba4b-00a0c93ec93b";

pub struct UdevEspLocator {
    scratch_dir: PathBuf,
}

impl UdevEspLocator {
    pub fn new(scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            scratch_dir: scratch_dir.into(),
        }
    }

    fn by_parttypeuuid_path(&self) -> PathBuf {
        PathBuf::from(format!("/dev/disk/by-parttypeuuid/{ESP_TYPE_GUID}"))
    }

    async fn already_mounted_at(&self, device: &Path) -> Result<Option<String>, UpdateError> {
        let mounts = tokio::fs::read_to_string("/proc/mounts")
            .await
            .map_err(|e| UpdateError::ActivationError(format!("reading /proc/mounts: {e}")))?;
        let resolved = tokio::fs::canonicalize(device)
            .await
            .map_err(|e| UpdateError::ActivationError(format!("resolving {}: {e}", device.display())))?;

        for line in mounts.lines() {
            let mut fields = line.split_whitespace();
            let Some(source) = fields.next() else { continue };
            let Some(mount_point) = fields.next() else { continue };
            if Path::new(source) == resolved {
                return Ok(Some(mount_point.to_string()));
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl EspLocator for UdevEspLocator {
    async fn locate_and_mount(&self) -> Result<MountedEsp, UpdateError> {
        let device = self.by_parttypeuuid_path();
        if !tokio::fs::try_exists(&device).await.unwrap_or(false) {
            return Err(UpdateError::EspNotFound);
        }

        if let Some(mount_point) = self.already_mounted_at(&device).await? {
            return Ok(MountedEsp {
                mount_point,
                needs_teardown: false,
            });
        }

        tokio::fs::create_dir_all(&self.scratch_dir)
            .await
            .map_err(|e| UpdateError::ActivationError(format!("creating ESP scratch dir: {e}")))?;

        let scratch_dir = self.scratch_dir.clone();
        let device_for_mount = device.clone();
        tokio::task::spawn_blocking(move || {
            mount(
                Some(device_for_mount.as_path()),
                scratch_dir.as_path(),
                Some("vfat"),
                MsFlags::empty(),
                None::<&str>,
            )
        })
        .await
        .map_err(|e| UpdateError::ActivationError(format!("mount task panicked: {e}")))?
        .map_err(|e| UpdateError::ActivationError(format!("mounting ESP: {e}")))?;

        Ok(MountedEsp {
            mount_point: self.scratch_dir.display().to_string(),
            needs_teardown: true,
        })
    }

    async fn stage_file(&self, esp: &MountedEsp, relative_path: &str, bytes: &[u8]) -> Result<(), UpdateError> {
        let target = Path::new(&esp.mount_point).join(relative_path);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| UpdateError::ActivationError(format!("creating {}: {e}", parent.display())))?;
        }
        let mut file = tokio::fs::File::create(&target)
            .await
            .map_err(|e| UpdateError::ActivationError(format!("creating {}: {e}", target.display())))?;
        file.write_all(bytes)
            .await
            .map_err(|e| UpdateError::ActivationError(format!("writing {}: {e}", target.display())))?;
        file.sync_all()
            .await
            .map_err(|e| UpdateError::ActivationError(format!("syncing {}: {e}", target.display())))
    }

    async fn read_file(&self, esp: &MountedEsp, relative_path: &str) -> Result<Option<Vec<u8>>, UpdateError> {
        let target = Path::new(&esp.mount_point).join(relative_path);
        match tokio::fs::read(&target).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(UpdateError::ActivationError(format!("reading {}: {e}", target.display()))),
        }
    }

    async fn teardown(&self, esp: &MountedEsp) -> Result<(), UpdateError> {
        if !esp.needs_teardown {
            return Ok(());
        }
        let mount_point = PathBuf::from(&esp.mount_point);
        tokio::task::spawn_blocking(move || umount(mount_point.as_path()))
            .await
            .map_err(|e| UpdateError::ActivationError(format!("unmount task panicked: {e}")))?
            .map_err(|e| UpdateError::ActivationError(format!("unmounting ESP: {e}")))?;
        tokio::fs::remove_dir(&esp.mount_point)
            .await
            .map_err(|e| UpdateError::ActivationError(format!("removing mount point: {e}")))
    }
}
