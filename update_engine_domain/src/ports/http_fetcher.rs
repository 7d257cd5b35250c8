// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Source port: produces byte chunks for a URL, with resume support
//! and external cancellation. The concrete `reqwest`-backed implementation
//! lives in `update-engine`'s infrastructure layer.

use async_trait::async_trait;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Callbacks the [`HttpFetcher`] drives during a transfer. Exactly one of
/// `on_transfer_complete` or `on_transfer_terminated` fires per `begin`
/// call, after zero or more `on_chunk` calls.
pub trait FetcherDelegate: Send {
    /// A chunk of at most `CHUNK_MAX` bytes arrived, at `offset` (absolute,
    /// accounting for any `set_offset` used to start the transfer).
    fn on_chunk(&mut self, offset: u64, bytes: &[u8]);

    /// The transfer ended on its own. `success` is `false` for any
    /// transport-level failure (non-2xx status, connection error).
    fn on_transfer_complete(&mut self, success: bool);

    /// The transfer was terminated by [`HttpFetcher::terminate`]; resources
    /// have been released.
    fn on_transfer_terminated(&mut self);
}

/// Bound to a single URL for the duration of one transfer.
#[async_trait]
pub trait HttpFetcher: Send {
    /// Request a ranged transfer starting at byte `n`. Must be called, if
    /// at all, before [`begin`](HttpFetcher::begin).
    fn set_offset(&mut self, n: u64);

    /// Start producing chunks, driving `delegate` until the transfer ends.
    async fn begin(&mut self, delegate: &mut dyn FetcherDelegate);

    /// Request cancellation. `begin` must still deliver
    /// `on_transfer_terminated` once resources are released.
    fn terminate(&mut self);

    /// A clonable handle that, once set, has the same effect as
    /// [`terminate`](HttpFetcher::terminate) -- obtained before `begin` is
    /// called so a caller who no longer holds `&mut self` (because it was
    /// moved into a concurrently-driven task) can still request
    /// cancellation.
    fn termination_handle(&self) -> Arc<AtomicBool>;
}
