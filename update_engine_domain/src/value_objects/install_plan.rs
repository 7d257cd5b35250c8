// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The install plan: an immutable descriptor of what to fetch, verify, and
//! where to write it. Produced by the update-check collaborator (modeled
//! here only by its output contract) and carried, unchanged, through every
//! pipeline stage.

use serde::{Deserialize, Serialize};

/// Immutable descriptor flowing through the pipeline.
///
/// `InstallPlan` outlives a single pipeline run and is re-emitted unchanged
/// by every stage that accepts it, so later stages can read fields earlier
/// stages never touched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallPlan {
    /// Whether this is a full image update as opposed to a delta.
    pub is_full_update: bool,
    /// Source URL for the payload.
    pub url: String,
    /// Advertised payload size in bytes.
    pub payload_size: u64,
    /// Expected content hash, hex-encoded SHA-256.
    pub payload_hash: String,
    /// Target device path or block-device identifier to write the payload to.
    pub install_path: String,
}

impl InstallPlan {
    /// Construct a plan for a full update.
    pub fn full_update(url: impl Into<String>, payload_size: u64, payload_hash: impl Into<String>, install_path: impl Into<String>) -> Self {
        Self {
            is_full_update: true,
            url: url.into(),
            payload_size,
            payload_hash: payload_hash.into(),
            install_path: install_path.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_update_sets_the_flag() {
        let plan = InstallPlan::full_update("https://example.com/update.bin", 1024, "deadbeef", "/dev/sda3");
        assert!(plan.is_full_update);
        assert_eq!(plan.payload_size, 1024);
    }

    #[test]
    fn serde_round_trip() {
        let plan = InstallPlan::full_update("https://example.com/update.bin", 1024, "deadbeef", "/dev/sda3");
        let json = serde_json::to_string(&plan).unwrap();
        let back: InstallPlan = serde_json::from_str(&json).unwrap();
        assert_eq!(plan, back);
    }
}
