// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! [`VendorHook`] implementation: an
//! executable at a fixed well-known path, invoked with
//! `<slot_identity> <staging_root>` if present and executable.
//!
//! Per-vendor remediation logic behind that path is explicitly out of
//! scope -- this adapter
//! only checks presence and propagates the exit status.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

use update_engine_bootstrap::platform::Platform;
use update_engine_domain::{ExecRequest, Executor, SlotIdentity, UpdateError, VendorHook};

pub struct WellKnownPathVendorHook {
    path: PathBuf,
    executor: Arc<dyn Executor>,
    platform: Arc<dyn Platform>,
}

impl WellKnownPathVendorHook {
    pub fn new(path: impl Into<PathBuf>, executor: Arc<dyn Executor>, platform: Arc<dyn Platform>) -> Self {
        Self {
            path: path.into(),
            executor,
            platform,
        }
    }
}

#[async_trait]
impl VendorHook for WellKnownPathVendorHook {
    async fn is_present(&self) -> bool {
        self.path.exists() && self.platform.is_executable(&self.path)
    }

    async fn invoke(&self, slot: SlotIdentity, staging_root: &str) -> Result<(), UpdateError> {
        let outcome = self
            .executor
            .run(ExecRequest::new(
                self.path.display().to_string(),
                vec![slot.as_letter().to_string(), staging_root.to_string()],
            ))
            .await?;

        if !outcome.success() {
            return Err(UpdateError::HookError(outcome.exit_code));
        }
        Ok(())
    }
}
