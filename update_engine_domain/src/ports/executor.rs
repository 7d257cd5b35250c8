// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Process-invocation port used by the slot activator to run the
//! image-bundled GPT tool under its own dynamic linker and library path,
//! rather than the host's:
//! the host libc may be older than the tool the new image ships.

use async_trait::async_trait;

use crate::error::UpdateError;

/// Where to find the binary to run and, optionally, the loader/library
/// prefix to run it under.
#[derive(Debug, Clone)]
pub struct ExecRequest {
    /// Path to the binary (or script) to invoke.
    pub program: String,
    /// Positional arguments, in order.
    pub args: Vec<String>,
    /// If set, invoke `program` via this dynamic linker
    /// (e.g. `/sysroot/lib64/ld-linux-x86-64.so.2 <program> <args...>`)
    /// with `LD_LIBRARY_PATH` pointed at the sibling `lib` directory.
    /// `None` runs `program` directly under the host's linker.
    pub loader_prefix: Option<String>,
}

impl ExecRequest {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            loader_prefix: None,
        }
    }

    pub fn with_loader_prefix(mut self, loader_prefix: impl Into<String>) -> Self {
        self.loader_prefix = Some(loader_prefix.into());
        self
    }
}

/// Outcome of running a process to completion.
#[derive(Debug, Clone)]
pub struct ExecOutcome {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs an external binary and waits for it to exit. A single capability
/// covers both the image-bundled GPT tool and the vendor hook; callers
/// distinguish by the arguments they pass.
#[async_trait]
pub trait Executor: Send + Sync {
    async fn run(&self, request: ExecRequest) -> Result<ExecOutcome, UpdateError>;
}
