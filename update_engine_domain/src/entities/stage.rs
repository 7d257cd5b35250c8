// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The stage contract every pipeline step implements: a typed input, a
//! typed output, and a terminal [`ExitCode`]. [`Pipeline`](super::pipeline::Pipeline)
//! tracks which stage is running; a stage itself carries no separate
//! lifecycle state.

use async_trait::async_trait;

use crate::UpdateError;

/// A stage's terminal result. `Success` is the only code that lets the
/// pipeline advance to the next stage; every other code is authoritative
/// and halts the pipeline with that code.
#[derive(Debug, Clone)]
pub enum ExitCode {
    Success,
    Failed(UpdateError),
}

impl ExitCode {
    pub fn is_success(&self) -> bool {
        matches!(self, ExitCode::Success)
    }
}

impl From<Result<(), UpdateError>> for ExitCode {
    fn from(result: Result<(), UpdateError>) -> Self {
        match result {
            Ok(()) => ExitCode::Success,
            Err(e) => ExitCode::Failed(e),
        }
    }
}

/// A single pipeline stage with a statically declared input and output
/// type. A stage is bound to at most one predecessor and one successor at
/// construction (enforced by [`crate::entities::pipeline::Pipeline::enqueue`],
/// not by this trait).
#[async_trait]
pub trait Stage: Send {
    type Input: Send + 'static;
    type Output: Send + 'static;

    /// Run this stage to completion against `input`. Returns the output
    /// to hand to the successor stage (present only on `Success`) and the
    /// terminal exit code.
    async fn run(&mut self, input: Self::Input) -> (ExitCode, Option<Self::Output>);

    /// Cooperatively request that an in-flight `run` abort as soon as
    /// possible. Idempotent; may be called before `run` starts, in which
    /// case the stage should abort immediately upon starting.
    fn request_stop(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_code_from_ok_result_is_success() {
        let code: ExitCode = Ok(()).into();
        assert!(code.is_success());
    }

    #[test]
    fn exit_code_from_err_result_is_failure() {
        let code: ExitCode = Err(UpdateError::EspNotFound).into();
        assert!(!code.is_success());
    }
}
