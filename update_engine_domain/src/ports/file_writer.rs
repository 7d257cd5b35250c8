// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Sink port: accepts byte chunks at an offset and persists them.
//! Implementations (direct-to-device, buffered, injectable-failure) live in
//! `update-engine`'s infrastructure layer; only the contract lives here.

use async_trait::async_trait;

use crate::error::UpdateError;

/// Append-only sink for a single logical transfer.
///
/// `open` must be called before any `write`, and exactly one of `close` or
/// drop ends the transfer. A resumed transfer calls `seek` once, immediately
/// after `open`, before the first `write`.
#[async_trait]
pub trait FileWriter: Send {
    /// Open the sink, creating the destination if necessary.
    async fn open(&mut self) -> Result<(), UpdateError>;

    /// Position the sink at `offset` bytes from the start, for resume.
    /// Must be called before the first `write`, if at all.
    async fn seek(&mut self, offset: u64) -> Result<(), UpdateError>;

    /// Persist `bytes`. On success the bytes are durably appended;
    /// implementations must never report success for a partial write.
    async fn write(&mut self, bytes: &[u8]) -> Result<(), UpdateError>;

    /// Flush and release the sink. Called on every exit path: success,
    /// cancellation, or error.
    async fn close(&mut self) -> Result<(), UpdateError>;
}
