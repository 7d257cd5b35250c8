// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! [`Executor`] implementation ("global tool invocation via
//! image-bundled linker"): runs a binary either directly, or through an
//! explicit dynamic linker with `LD_LIBRARY_PATH` pointed at the new
//! image's library directory, so the GPT tool runs against the libc it was
//! built for rather than the host's.

use async_trait::async_trait;
use tokio::process::Command;

use update_engine_domain::{ExecOutcome, ExecRequest, Executor, UpdateError};

pub struct ProcessExecutor;

impl ProcessExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ProcessExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Executor for ProcessExecutor {
    async fn run(&self, request: ExecRequest) -> Result<ExecOutcome, UpdateError> {
        let mut command = match &request.loader_prefix {
            Some(loader) => {
                let mut c = Command::new(loader);
                let lib_dir = std::path::Path::new(&request.program)
                    .parent()
                    .map(|p| p.join("lib"))
                    .unwrap_or_default();
                c.env("LD_LIBRARY_PATH", lib_dir);
                c.arg(&request.program);
                c
            }
            None => Command::new(&request.program),
        };
        command.args(&request.args);

        let output = command
            .output()
            .await
            .map_err(|e| UpdateError::ActivationError(format!("running {}: {e}", request.program)))?;

        Ok(ExecOutcome {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
