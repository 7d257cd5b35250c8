// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Error Taxonomy
//!
//! A single `thiserror`-derived enum carries every failure mode a pipeline
//! stage, the slot activator, or the finalizer can surface. Consumers
//! classify an error via [`UpdateError::category`] and
//! [`UpdateError::is_recoverable`] rather than matching on variants
//! directly, so new variants can be added without breaking callers that
//! only care about the category.

use thiserror::Error;

/// The complete error taxonomy for the update engine.
#[derive(Debug, Clone, Error)]
pub enum UpdateError {
    /// The fetcher reported a transport failure (connection reset, DNS
    /// failure, non-2xx status after retries).
    #[error("download transport error: {0}")]
    DownloadTransportError(String),

    /// The file writer failed to open, write, or close the sink.
    #[error("download write error: {0}")]
    DownloadWriteError(String),

    /// The number of bytes received did not match the install plan's
    /// advertised payload size.
    #[error("download size mismatch: expected {expected} bytes, received {received}")]
    DownloadSizeMismatch { expected: u64, received: u64 },

    /// The finalized content hash did not match the install plan's
    /// expected hash.
    #[error("download hash mismatch: expected {expected}, computed {computed}")]
    DownloadHashMismatch { expected: String, computed: String },

    /// `stop()` was requested and honored; not a failure in the
    /// conventional sense, but stages and the service still need to
    /// unwind through the same `Result` path.
    #[error("cancelled: {0}")]
    Cancelled(String),

    /// The GPT partition label did not match any known slot (`ROOT-A`,
    /// `USR-A`, `ROOT-B`, `USR-B`).
    #[error("could not resolve slot identity from label {0:?}")]
    SlotResolutionError(String),

    /// No EFI System Partition could be found among the scanned block
    /// devices.
    #[error("EFI System Partition not found")]
    EspNotFound,

    /// A GPT tool invocation or kernel-image staging step failed during
    /// activation.
    #[error("activation failed: {0}")]
    ActivationError(String),

    /// The vendor hook returned a non-zero exit status.
    #[error("vendor hook failed with status {0}")]
    HookError(i32),

    /// Configuration failed validation at load time.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The persisted status record could not be read or written.
    #[error("status persistence error: {0}")]
    PersistenceError(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Broad error categories, used for metrics labels and log fields so a
/// dashboard doesn't need one time series per variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Transport,
    Integrity,
    Cancellation,
    Activation,
    Configuration,
    Persistence,
}

impl UpdateError {
    /// Classify this error into a broad category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            UpdateError::DownloadTransportError(_) => ErrorCategory::Transport,
            UpdateError::DownloadWriteError(_) => ErrorCategory::Transport,
            UpdateError::DownloadSizeMismatch { .. } => ErrorCategory::Integrity,
            UpdateError::DownloadHashMismatch { .. } => ErrorCategory::Integrity,
            UpdateError::Cancelled(_) => ErrorCategory::Cancellation,
            UpdateError::SlotResolutionError(_) => ErrorCategory::Activation,
            UpdateError::EspNotFound => ErrorCategory::Activation,
            UpdateError::ActivationError(_) => ErrorCategory::Activation,
            UpdateError::HookError(_) => ErrorCategory::Activation,
            UpdateError::InvalidConfiguration(_) => ErrorCategory::Configuration,
            UpdateError::PersistenceError(_) => ErrorCategory::Persistence,
            UpdateError::Io(_) => ErrorCategory::Transport,
            UpdateError::Serialization(_) => ErrorCategory::Configuration,
        }
    }

    /// Whether a future `AttemptUpdate` might reasonably succeed without
    /// operator intervention. Activation failures are deliberately not
    /// recoverable: the previous slot remains bootable and a retry needs a
    /// fresh install plan, not an automatic retry loop.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Transport | ErrorCategory::Cancellation
        )
    }

    /// Whether this error indicates the payload should be treated as
    /// untrusted or tampered, as opposed to merely incomplete.
    pub fn is_security_error(&self) -> bool {
        matches!(self, UpdateError::DownloadHashMismatch { .. })
    }
}

impl From<std::io::Error> for UpdateError {
    fn from(e: std::io::Error) -> Self {
        UpdateError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for UpdateError {
    fn from(e: serde_json::Error) -> Self {
        UpdateError::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_errors_are_recoverable() {
        let err = UpdateError::DownloadTransportError("connection reset".to_string());
        assert!(err.is_recoverable());
        assert_eq!(err.category(), ErrorCategory::Transport);
    }

    #[test]
    fn activation_errors_are_not_recoverable() {
        let err = UpdateError::ActivationError("gpt tool missing".to_string());
        assert!(!err.is_recoverable());
    }

    #[test]
    fn hash_mismatch_is_a_security_error() {
        let err = UpdateError::DownloadHashMismatch {
            expected: "aaaa".to_string(),
            computed: "bbbb".to_string(),
        };
        assert!(err.is_security_error());
        assert!(!err.is_recoverable());
    }

    #[test]
    fn size_mismatch_is_not_a_security_error() {
        let err = UpdateError::DownloadSizeMismatch {
            expected: 10,
            received: 5,
        };
        assert!(!err.is_security_error());
    }

    #[test]
    fn io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: UpdateError = io_err.into();
        assert!(matches!(err, UpdateError::Io(_)));
    }
}
