// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The A/B slot a device belongs to, derived from its GPT partition label.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::UpdateError;

/// One of the two symbolic root/usr partition slots the bootloader can boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SlotIdentity {
    A,
    B,
}

impl SlotIdentity {
    /// Derive a slot identity from a GPT partition label, e.g. `ROOT-A`,
    /// `USR-B`. Any label that doesn't end in `-A` or `-B` is a fatal
    /// mis-targeting error: the caller should not proceed against a device
    /// it cannot positively identify.
    pub fn from_gpt_label(label: &str) -> Result<Self, UpdateError> {
        let upper = label.trim().to_ascii_uppercase();
        if upper.ends_with("-A") {
            Ok(SlotIdentity::A)
        } else if upper.ends_with("-B") {
            Ok(SlotIdentity::B)
        } else {
            Err(UpdateError::SlotResolutionError(label.to_string()))
        }
    }

    /// The other slot: `A`'s peer is `B` and vice versa.
    pub fn peer(self) -> SlotIdentity {
        match self {
            SlotIdentity::A => SlotIdentity::B,
            SlotIdentity::B => SlotIdentity::A,
        }
    }

    /// Canonical lowercase letter used in ESP paths (`vmlinuz-a`, `vmlinuz-b`).
    pub fn as_letter(self) -> &'static str {
        match self {
            SlotIdentity::A => "a",
            SlotIdentity::B => "b",
        }
    }

    /// Canonical ESP kernel image name for this slot, e.g. `coreos/vmlinuz-b`.
    pub fn esp_kernel_path(self) -> String {
        format!("coreos/vmlinuz-{}", self.as_letter())
    }
}

impl fmt::Display for SlotIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_letter().to_ascii_uppercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_a_and_usr_a_both_resolve_to_a() {
        assert_eq!(SlotIdentity::from_gpt_label("ROOT-A").unwrap(), SlotIdentity::A);
        assert_eq!(SlotIdentity::from_gpt_label("USR-A").unwrap(), SlotIdentity::A);
    }

    #[test]
    fn root_b_and_usr_b_both_resolve_to_b() {
        assert_eq!(SlotIdentity::from_gpt_label("ROOT-B").unwrap(), SlotIdentity::B);
        assert_eq!(SlotIdentity::from_gpt_label("USR-B").unwrap(), SlotIdentity::B);
    }

    #[test]
    fn unknown_label_is_a_fatal_error() {
        let err = SlotIdentity::from_gpt_label("EFI-SYSTEM").unwrap_err();
        assert!(matches!(err, UpdateError::SlotResolutionError(_)));
    }

    #[test]
    fn peer_is_the_other_slot() {
        assert_eq!(SlotIdentity::A.peer(), SlotIdentity::B);
        assert_eq!(SlotIdentity::B.peer(), SlotIdentity::A);
    }

    #[test]
    fn esp_kernel_path_matches_canonical_naming() {
        assert_eq!(SlotIdentity::A.esp_kernel_path(), "coreos/vmlinuz-a");
        assert_eq!(SlotIdentity::B.esp_kernel_path(), "coreos/vmlinuz-b");
    }
}
