// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Command-Line Interface Module
//!
//! Bootstrap-layer CLI handling with security-first design.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │  1. parser::parse_cli()             │  Parse CLI with clap
//! └─────────────────┬───────────────────┘
//!                   ↓
//! ┌─────────────────────────────────────┐
//! │  2. validator::validate()           │  Security validation
//! └─────────────────┬───────────────────┘
//!                   ↓
//! ┌─────────────────────────────────────┐
//! │  3. ValidatedCli                    │  Safe, validated config
//! └─────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `parser` - CLI structure and clap parsing
//! - `validator` - Security validation layer

pub mod parser;
pub mod validator;

pub use parser::{parse_cli, Cli, Commands};
pub use validator::{ParseError, SecureArgParser};

use std::path::PathBuf;

/// Validated CLI configuration
///
/// Holds all CLI arguments after security validation: paths are
/// canonicalized (when they must already exist) and all values are
/// range-checked. Nothing downstream should re-parse `std::env::args()`.
#[derive(Debug, Clone)]
pub struct ValidatedCli {
    pub command: ValidatedCommand,
    pub verbose: bool,
    pub config: Option<PathBuf>,
}

/// Validated command variants, one per `updatectl` subcommand.
#[derive(Debug, Clone)]
pub enum ValidatedCommand {
    /// `updatectl attempt-update`
    AttemptUpdate,
    /// `updatectl reset-status`
    ResetStatus,
    /// `updatectl status [--json]`
    Status { json: bool },
    /// `updatectl finalize <device> <KEY=VALUE>...`
    Finalize {
        device: PathBuf,
        kv: Vec<(String, String)>,
    },
}

/// Parse and validate CLI arguments in one step.
///
/// # Errors
///
/// Returns [`ParseError`] if any validation fails.
pub fn parse_and_validate() -> Result<ValidatedCli, ParseError> {
    let cli = parse_cli();
    validate_cli(cli)
}

/// Validate parsed CLI arguments.
///
/// Applies security validation to all CLI arguments: path canonicalization,
/// `KEY=VALUE` token shape checks, and string pattern validation. Never
/// trusts raw clap output past this boundary.
fn validate_cli(cli: Cli) -> Result<ValidatedCli, ParseError> {
    let config = if let Some(ref path) = cli.config {
        SecureArgParser::validate_argument(&path.to_string_lossy())?;
        Some(path.clone())
    } else {
        None
    };

    let command = match cli.command {
        Commands::AttemptUpdate => ValidatedCommand::AttemptUpdate,
        Commands::ResetStatus => ValidatedCommand::ResetStatus,
        Commands::Status { json } => ValidatedCommand::Status { json },
        Commands::Finalize { device, args } => {
            let validated_device = SecureArgParser::validate_path(&device.to_string_lossy())?;

            let mut kv = Vec::with_capacity(args.len());
            for token in args {
                kv.push(SecureArgParser::validate_key_value(&token)?);
            }

            ValidatedCommand::Finalize {
                device: validated_device,
                kv,
            }
        }
    };

    Ok(ValidatedCli {
        command,
        verbose: cli.verbose,
        config,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_finalize_rejects_malformed_kv() {
        let cli = Cli {
            command: Commands::Finalize {
                device: PathBuf::from("/dev/null"),
                args: vec!["not-a-kv-pair".to_string()],
            },
            verbose: false,
            config: None,
        };
        assert!(validate_cli(cli).is_err());
    }

    #[test]
    fn validate_status_passes_through_json_flag() {
        let cli = Cli {
            command: Commands::Status { json: true },
            verbose: false,
            config: None,
        };
        let validated = validate_cli(cli).expect("should validate");
        match validated.command {
            ValidatedCommand::Status { json } => assert!(json),
            _ => panic!("expected Status command"),
        }
    }
}
