// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Security validation for CLI arguments: never trust raw clap output.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while validating CLI arguments.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("path does not exist: {0}")]
    PathNotFound(String),

    #[error("failed to canonicalize path {path}: {source}")]
    Canonicalize { path: String, source: std::io::Error },

    #[error("invalid value for --{arg}: {reason}")]
    InvalidValue { arg: String, reason: String },

    #[error("argument contains disallowed characters: {0}")]
    UnsafeArgument(String),

    #[error("malformed KEY=VALUE token: {0}")]
    MalformedKeyValue(String),
}

/// Validates CLI arguments before they cross into application code.
///
/// Mirrors the "parse, then validate" split used throughout this codebase:
/// clap only knows shapes, `SecureArgParser` knows policy.
pub struct SecureArgParser;

impl SecureArgParser {
    /// Validate that `raw` names a path that exists, then canonicalize it.
    pub fn validate_path(raw: &str) -> Result<PathBuf, ParseError> {
        Self::validate_argument(raw)?;

        let path = Path::new(raw);
        if !path.exists() {
            return Err(ParseError::PathNotFound(raw.to_string()));
        }

        path.canonicalize().map_err(|source| ParseError::Canonicalize {
            path: raw.to_string(),
            source,
        })
    }

    /// Validate that an argument string contains no shell metacharacters or
    /// NUL bytes, without requiring the value to be a path that exists.
    pub fn validate_argument(raw: &str) -> Result<(), ParseError> {
        if raw.is_empty() {
            return Err(ParseError::UnsafeArgument("empty argument".to_string()));
        }
        if raw.contains('\0') {
            return Err(ParseError::UnsafeArgument(raw.to_string()));
        }
        const DISALLOWED: &[char] = &[';', '|', '&', '`', '$', '\n', '\r'];
        if raw.chars().any(|c| DISALLOWED.contains(&c)) {
            return Err(ParseError::UnsafeArgument(raw.to_string()));
        }
        Ok(())
    }

    /// Validate and split a `KEY=VALUE` token forwarded by the installer's
    /// finalizer invocation convention.
    pub fn validate_key_value(raw: &str) -> Result<(String, String), ParseError> {
        Self::validate_argument(raw)?;
        let (key, value) = raw
            .split_once('=')
            .ok_or_else(|| ParseError::MalformedKeyValue(raw.to_string()))?;
        if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(ParseError::MalformedKeyValue(raw.to_string()));
        }
        Ok((key.to_string(), value.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_shell_metacharacters() {
        assert!(SecureArgParser::validate_argument("foo; rm -rf /").is_err());
    }

    #[test]
    fn accepts_plain_argument() {
        assert!(SecureArgParser::validate_argument("pipeline-name").is_ok());
    }

    #[test]
    fn validates_key_value_token() {
        let (k, v) = SecureArgParser::validate_key_value("KERNEL=vmlinuz-b").unwrap();
        assert_eq!(k, "KERNEL");
        assert_eq!(v, "vmlinuz-b");
    }

    #[test]
    fn rejects_key_value_without_equals() {
        assert!(SecureArgParser::validate_key_value("KERNEL").is_err());
    }

    #[test]
    fn rejects_nonexistent_path() {
        assert!(matches!(
            SecureArgParser::validate_path("/nonexistent/path/does/not/exist"),
            Err(ParseError::PathNotFound(_))
        ));
    }
}
