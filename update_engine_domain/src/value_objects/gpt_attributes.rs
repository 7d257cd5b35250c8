// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Per-slot GPT boot-control flags interpreted by the bootloader to
//! implement "try-once with rollback".

use serde::{Deserialize, Serialize};

/// The highest priority value the GPT format allows for a partition.
pub const MAX_PRIORITY: u8 = 15;

/// `priority` / `tries` / `successful` as read from, or about to be
/// written to, a partition's GPT attribute bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GptSlotAttributes {
    pub priority: u8,
    pub tries: u8,
    pub successful: bool,
}

impl GptSlotAttributes {
    pub fn new(priority: u8, tries: u8, successful: bool) -> Self {
        Self {
            priority,
            tries,
            successful,
        }
    }

    /// The attributes a slot must carry immediately after a successful
    /// activation: one try remaining, not yet proven healthy, and a
    /// priority strictly greater than `peer_priority` (capped at
    /// [`MAX_PRIORITY`]; ties are broken in favor of the just-activated
    /// slot by always strictly incrementing).
    pub fn activated_over(peer_priority: u8) -> Self {
        let priority = peer_priority.saturating_add(1).min(MAX_PRIORITY);
        // If the peer was already at the cap, we cannot be strictly
        // greater while also staying within bounds; prioritize() handles
        // this by lowering the peer first (see GptTool::prioritize docs).
        Self {
            priority,
            tries: 1,
            successful: false,
        }
    }

    /// Whether this slot is ready to be tried by the bootloader: it has
    /// at least one try remaining and hasn't already been marked healthy
    /// by an external agent in a way that would make a retry harmful.
    pub fn is_bootable(&self) -> bool {
        self.tries > 0 || self.successful
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activated_over_sets_try_once_not_yet_proven() {
        let attrs = GptSlotAttributes::activated_over(3);
        assert_eq!(attrs.tries, 1);
        assert!(!attrs.successful);
        assert!(attrs.priority > 3);
    }

    #[test]
    fn activated_over_caps_at_max_priority() {
        let attrs = GptSlotAttributes::activated_over(MAX_PRIORITY);
        assert_eq!(attrs.priority, MAX_PRIORITY);
    }

    #[test]
    fn bootable_when_tries_remain() {
        let attrs = GptSlotAttributes::new(5, 1, false);
        assert!(attrs.is_bootable());
    }

    #[test]
    fn not_bootable_when_exhausted_and_unproven() {
        let attrs = GptSlotAttributes::new(5, 0, false);
        assert!(!attrs.is_bootable());
    }
}
