// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Incremental content hash over a received byte stream, finalized and
//! compared against an [`crate::InstallPlan`]'s expected hash.
//!
//! The source system used a domain-specific "Omaha hash"; this rewrite
//! settles on SHA-256, hex-encoded, matching the hash format already
//! carried by [`crate::InstallPlan::payload_hash`] and
//! [`crate::UpdateError::DownloadHashMismatch`] (see `DESIGN.md`). This is
//! pure computation with no I/O, so it lives in the domain layer rather
//! than infrastructure.

use sha2::{Digest, Sha256};

/// Feeds bytes incrementally and produces a hex-encoded digest on finalize.
/// Implemented as a trait (rather than exposing `Sha256Calculator`
/// directly everywhere) so stages can be tested against a fake that
/// returns a fixed digest without hashing real data.
pub trait HashCalculator: Send {
    fn update(&mut self, bytes: &[u8]);
    fn finalize(self: Box<Self>) -> String;
}

/// The production [`HashCalculator`], backed by `sha2`.
#[derive(Default)]
pub struct Sha256Calculator {
    hasher: Sha256,
}

impl Sha256Calculator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HashCalculator for Sha256Calculator {
    fn update(&mut self, bytes: &[u8]) {
        self.hasher.update(bytes);
    }

    fn finalize(self: Box<Self>) -> String {
        hex::encode(self.hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_vector_matches_sha256_of_abc() {
        let mut calc = Sha256Calculator::new();
        calc.update(b"abc");
        let digest = Box::new(calc).finalize();
        assert_eq!(digest, "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad");
    }

    #[test]
    fn incremental_updates_match_a_single_update() {
        let mut incremental = Sha256Calculator::new();
        incremental.update(b"foo");
        incremental.update(b"bar");
        let incremental_digest = Box::new(incremental).finalize();

        let mut single = Sha256Calculator::new();
        single.update(b"foobar");
        let single_digest = Box::new(single).finalize();

        assert_eq!(incremental_digest, single_digest);
    }

    #[test]
    fn empty_input_produces_the_well_known_empty_digest() {
        let calc = Sha256Calculator::new();
        let digest = Box::new(calc).finalize();
        assert_eq!(digest, "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855");
    }
}
