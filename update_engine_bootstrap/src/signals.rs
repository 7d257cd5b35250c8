// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Signal Handling
//!
//! Wires `SIGTERM`/`SIGINT`/`SIGHUP` into a [`ShutdownCoordinator`], so a
//! single `Ctrl-C` or service-manager stop initiates the same graceful
//! shutdown path as an explicit `ResetStatus`/cancellation request.

use crate::shutdown::ShutdownCoordinator;
use tokio::signal::unix::{signal, SignalKind};

/// Spawn a task that waits for a termination signal and initiates shutdown
/// on the given coordinator exactly once.
///
/// Returns the `JoinHandle` so callers can await it during their own
/// shutdown sequence if they want to know the signal has been observed.
pub fn install_shutdown_handler(coordinator: ShutdownCoordinator) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut term = signal(SignalKind::terminate()).expect("failed to register SIGTERM handler");
        let mut int = signal(SignalKind::interrupt()).expect("failed to register SIGINT handler");
        let mut hup = signal(SignalKind::hangup()).expect("failed to register SIGHUP handler");

        tokio::select! {
            _ = term.recv() => tracing::info!("received SIGTERM"),
            _ = int.recv() => tracing::info!("received SIGINT"),
            _ = hup.recv() => tracing::info!("received SIGHUP"),
        }

        coordinator.initiate_shutdown();
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn handler_registers_without_firing() {
        let coordinator = ShutdownCoordinator::new(Duration::from_secs(1));
        let handle = install_shutdown_handler(coordinator.clone());

        assert!(!coordinator.is_shutting_down());
        assert!(!handle.is_finished());

        handle.abort();
    }
}
