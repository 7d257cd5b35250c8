// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! [`DeviceProber`] implementation: GPT partition label discovery via the
//! udev-maintained `/dev/disk/by-partlabel/` symlinks, peer-slot GPT
//! priority via the GPT tool's diagnostic `show` output, and kernel
//! cmdline inspection for the legacy-bootloader marker.

use async_trait::async_trait;
use std::sync::Arc;

use update_engine_domain::{DeviceProber, GptTool, UpdateError};

pub struct SysDeviceProber {
    gpt_tool: Arc<dyn GptTool>,
}

impl SysDeviceProber {
    pub fn new(gpt_tool: Arc<dyn GptTool>) -> Self {
        Self { gpt_tool }
    }
}

#[async_trait]
impl DeviceProber for SysDeviceProber {
    async fn partition_label(&self, device: &str) -> Result<String, UpdateError> {
        let resolved = tokio::fs::canonicalize(device)
            .await
            .map_err(|e| UpdateError::SlotResolutionError(format!("resolving {device}: {e}")))?;

        let mut entries = tokio::fs::read_dir("/dev/disk/by-partlabel")
            .await
            .map_err(|e| UpdateError::SlotResolutionError(format!("listing partition labels: {e}")))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| UpdateError::SlotResolutionError(format!("reading partition label entry: {e}")))?
        {
            if let Ok(target) = tokio::fs::canonicalize(entry.path()).await {
                if target == resolved {
                    return Ok(entry.file_name().to_string_lossy().into_owned());
                }
            }
        }

        Err(UpdateError::SlotResolutionError(format!(
            "no partition label found for {device}"
        )))
    }

    async fn peer_priority(&self, peer_device: &str) -> Result<u8, UpdateError> {
        let shown = self.gpt_tool.show(peer_device).await?;
        for line in shown.lines() {
            if let Some(value) = line.trim().strip_prefix("priority=") {
                return value
                    .trim()
                    .parse::<u8>()
                    .map_err(|e| UpdateError::ActivationError(format!("parsing peer priority: {e}")));
            }
        }
        Err(UpdateError::ActivationError(format!(
            "gpt show output for {peer_device} did not contain a priority field"
        )))
    }

    async fn kernel_cmdline(&self) -> Result<String, UpdateError> {
        tokio::fs::read_to_string("/proc/cmdline")
            .await
            .map_err(|e| UpdateError::Io(format!("reading /proc/cmdline: {e}")))
    }
}
