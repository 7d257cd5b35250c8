// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Slot Activator
//!
//! Post-install finalizer: derives the slot identity
//! from the freshly written device's GPT label, locates and mounts the
//! ESP, stages the kernel image under the slot's canonical name (plus the
//! legacy-bootloader compatibility files when the running kernel's
//! cmdline carries the legacy marker), invokes the optional vendor hook,
//! and finally reconciles and raises the slot's GPT priority above its
//! peer's. The running/peer slot's attributes are never touched, and the
//! ESP mount is always torn down on the way out, success or failure.
//!
//! Runs as its own [`Stage`] so it can sit at the end of the main
//! pipeline, but is also invoked directly by the `finalize` CLI command
//! outside of any `Pipeline`.

use async_trait::async_trait;
use std::sync::Arc;

use update_engine_domain::{DeviceProber, EspLocator, ExitCode, GptTool, MountedEsp, SlotIdentity, Stage, UpdateError, VendorHook};

const MANAGED_DEFAULT_CFG_MARKER: &str = "# managed-by-update-engine";

/// Input to the activator: the device just written by the download stage,
/// and the kernel image to stage onto the ESP (read from the install tree
/// by the caller, which owns the mounted root of the new slot).
#[derive(Debug)]
pub struct ActivationRequest {
    pub target_device: String,
    pub kernel_image: Vec<u8>,
}

pub struct SlotActivator {
    device_prober: Arc<dyn DeviceProber>,
    esp_locator: Arc<dyn EspLocator>,
    vendor_hook: Arc<dyn VendorHook>,
    gpt_tool: Arc<dyn GptTool>,
    legacy_bootloader_marker: String,
}

impl SlotActivator {
    pub fn new(
        device_prober: Arc<dyn DeviceProber>,
        esp_locator: Arc<dyn EspLocator>,
        vendor_hook: Arc<dyn VendorHook>,
        gpt_tool: Arc<dyn GptTool>,
        legacy_bootloader_marker: impl Into<String>,
    ) -> Self {
        Self {
            device_prober,
            esp_locator,
            vendor_hook,
            gpt_tool,
            legacy_bootloader_marker: legacy_bootloader_marker.into(),
        }
    }

    async fn activate(&self, request: &ActivationRequest) -> Result<SlotIdentity, UpdateError> {
        let label = self.device_prober.partition_label(&request.target_device).await?;
        let slot = SlotIdentity::from_gpt_label(&label)?;
        let peer_device = peer_device_path(&label);

        let esp = self.esp_locator.locate_and_mount().await?;

        let outcome = self.stage_and_finalize(slot, request, &peer_device, &esp).await;
        let teardown_result = self.esp_locator.teardown(&esp).await;

        match outcome {
            Ok(()) => {
                teardown_result?;
                Ok(slot)
            }
            Err(e) => Err(e),
        }
    }

    async fn stage_and_finalize(
        &self,
        slot: SlotIdentity,
        request: &ActivationRequest,
        peer_device: &str,
        esp: &MountedEsp,
    ) -> Result<(), UpdateError> {
        self.esp_locator
            .stage_file(esp, &slot.esp_kernel_path(), &request.kernel_image)
            .await?;

        let cmdline = self.device_prober.kernel_cmdline().await?;
        if cmdline.contains(&self.legacy_bootloader_marker) {
            self.stage_legacy_compat(slot, esp, &request.kernel_image).await?;
        }

        if self.vendor_hook.is_present().await {
            self.vendor_hook.invoke(slot, &esp.mount_point).await?;
        }

        self.gpt_tool.repair(&request.target_device).await?;
        self.gpt_tool.set_attrs(&request.target_device, 1, false).await?;
        let peer_priority = self.device_prober.peer_priority(peer_device).await?;
        self.gpt_tool.prioritize(&request.target_device, peer_priority).await?;

        Ok(())
    }

    async fn stage_legacy_compat(&self, slot: SlotIdentity, esp: &MountedEsp, kernel_image: &[u8]) -> Result<(), UpdateError> {
        let slot_letter = slot.as_letter().to_ascii_uppercase();

        self.esp_locator
            .stage_file(esp, &format!("syslinux/vmlinuz.{slot_letter}"), kernel_image)
            .await?;

        let root_cfg = format!(
            "DEFAULT linux\nLABEL linux\n  KERNEL {}\n  APPEND root=/dev/disk/by-partlabel/ROOT-{slot_letter}\n",
            slot.esp_kernel_path()
        );
        self.esp_locator
            .stage_file(esp, &format!("syslinux/root.{slot_letter}.cfg"), root_cfg.as_bytes())
            .await?;

        let menu_lst = format!("default {}\ntimeout 5\n", slot.as_letter());
        self.esp_locator.stage_file(esp, "boot/grub/menu.lst", menu_lst.as_bytes()).await?;

        let existing_default = self.esp_locator.read_file(esp, "syslinux/default.cfg").await?;
        let needs_rewrite = match &existing_default {
            Some(bytes) => !String::from_utf8_lossy(bytes).contains(MANAGED_DEFAULT_CFG_MARKER),
            None => true,
        };
        if needs_rewrite {
            let default_cfg = format!("{MANAGED_DEFAULT_CFG_MARKER}\nDEFAULT root.{slot_letter}.cfg\n");
            self.esp_locator.stage_file(esp, "syslinux/default.cfg", default_cfg.as_bytes()).await?;
        }

        Ok(())
    }
}

/// The peer partition's `by-partlabel` device path, derived from this
/// device's own label by flipping its `-A`/`-B` suffix. `label` is
/// assumed already validated by [`SlotIdentity::from_gpt_label`].
fn peer_device_path(label: &str) -> String {
    let upper = label.to_ascii_uppercase();
    let stem = &label[..label.len() - 2];
    let peer_suffix = if upper.ends_with("-A") { "-B" } else { "-A" };
    format!("/dev/disk/by-partlabel/{stem}{peer_suffix}")
}

#[async_trait]
impl Stage for SlotActivator {
    type Input = ActivationRequest;
    type Output = SlotIdentity;

    #[tracing::instrument(skip(self, request), fields(target_device = %request.target_device))]
    async fn run(&mut self, request: ActivationRequest) -> (ExitCode, Option<SlotIdentity>) {
        match self.activate(&request).await {
            Ok(slot) => {
                tracing::info!(%slot, "slot activated");
                (ExitCode::Success, Some(slot))
            }
            Err(e) => {
                tracing::error!(error = %e, "slot activation failed");
                (ExitCode::Failed(e), None)
            }
        }
    }

    /// Activation is not cancellable mid-flight: partially applying the
    /// GPT steps would risk leaving no slot reliably bootable, so once
    /// started it always runs to completion.
    fn request_stop(&mut self) {}
}
