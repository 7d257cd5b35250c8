// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Process Exit Codes
//!
//! `sysexits.h`-style exit codes for the `updatectl` binary and the
//! finalizer invocation path. The finalizer never partially commits and
//! always exits non-zero with a one-line diagnostic on stderr for any
//! fatal condition, per its external contract.

/// Process-level exit codes, deliberately small and stable: external
/// callers (the installer, a systemd unit) may match on these values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Completed successfully.
    Ok,
    /// Input data was incorrect (`EX_DATAERR`).
    DataErr,
    /// An input file did not exist or was not readable (`EX_NOINPUT`).
    NoInput,
    /// A required service/resource was unavailable (`EX_UNAVAILABLE`).
    Unavailable,
    /// An internal software error was detected (`EX_SOFTWARE`).
    Software,
    /// Cancelled by the operator; not a failure (reported as 0).
    Cancelled,
}

impl ExitCode {
    /// Numeric value, matching the BSD `sysexits.h` conventions where one exists.
    pub const fn code(self) -> u8 {
        match self {
            ExitCode::Ok => 0,
            ExitCode::DataErr => 65,
            ExitCode::NoInput => 66,
            ExitCode::Unavailable => 69,
            ExitCode::Software => 70,
            ExitCode::Cancelled => 0,
        }
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(value: ExitCode) -> Self {
        std::process::ExitCode::from(value.code())
    }
}

/// Convert a plain `Result` into a process exit code, printing `err` to
/// stderr on failure via the supplied classifier.
///
/// The classifier is left to the caller because only `update-engine` knows
/// how to map its own `UpdateError` taxonomy onto [`ExitCode`] variants;
/// bootstrap stays ignorant of that taxonomy by design.
pub fn to_process_exit_code<T, E>(result: Result<T, E>, classify: impl FnOnce(&E) -> ExitCode) -> std::process::ExitCode
where
    E: std::fmt::Display,
{
    match result {
        Ok(_) => std::process::ExitCode::from(ExitCode::Ok),
        Err(e) => {
            let code = classify(&e);
            if code != ExitCode::Cancelled {
                eprintln!("updatectl: {e}");
            }
            std::process::ExitCode::from(code)
        }
    }
}
