// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Raw CLI structure, parsed with `clap` before any security validation runs.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// `updatectl` - control surface for the A/B update engine.
#[derive(Debug, Parser)]
#[command(name = "updatectl", version, about = "Control and observe the A/B update engine")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Path to a TOML configuration file, overriding the default search path
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start a check for updates if the service is idle; no-op otherwise
    AttemptUpdate,

    /// Clear a `ReportingError` or `UpdatedNeedReboot` state back to `Idle`
    ResetStatus,

    /// Report the current service state and progress
    Status {
        /// Emit machine-readable JSON instead of a human summary
        #[arg(long)]
        json: bool,
    },

    /// Run the post-install finalizer against a freshly written slot device
    Finalize {
        /// Target device path, e.g. /dev/sda3
        device: PathBuf,

        /// KEY=VALUE tokens forwarded from the installer; unrecognized keys are ignored
        args: Vec<String>,
    },
}

/// Parse `std::env::args()` into a [`Cli`].
///
/// Clap handles `--help`/`--version` itself and terminates the process.
pub fn parse_cli() -> Cli {
    Cli::parse()
}
