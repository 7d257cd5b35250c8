// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Platform Abstraction Module
//!
//! Platform-specific operations needed by the slot activator: checking for
//! elevated privileges before mounting the ESP, checking whether a GPT tool
//! or vendor hook binary is executable, and locating a scratch directory
//! for mount staging.
//!
//! ## Architecture Pattern
//!
//! - **Interface**: `Platform` trait defines the contract
//! - **Implementation**: `UnixPlatform` (this distribution targets Linux only)
//! - **Selection**: compile-time, via `#[cfg(unix)]`
//!
//! The bootstrap module sits outside the enterprise application layers, so
//! it can access platform-specific APIs directly; everything above it talks
//! to `dyn Platform` instead of `libc` or `/proc`.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[cfg(unix)]
mod unix;

#[cfg(unix)]
pub use unix::UnixPlatform;

/// Platform-specific errors.
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not supported on this platform: {0}")]
    NotSupported(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),
}

/// Platform abstraction trait for OS-specific operations.
#[async_trait]
pub trait Platform: Send + Sync {
    /// Get the platform name, e.g. `"linux"`.
    fn platform_name(&self) -> &'static str;

    /// Get the platform-specific temporary directory, used to stage an ESP
    /// mount point when one is not already mounted.
    fn temp_dir(&self) -> PathBuf;

    /// Check whether the current process has elevated (root) privileges.
    /// Mounting the ESP and writing GPT attributes both require this.
    fn is_elevated(&self) -> bool;

    /// Set Unix file permissions.
    fn set_permissions(&self, path: &Path, mode: u32) -> Result<(), PlatformError>;

    /// Check whether a path points to an executable file. Used to decide
    /// whether an optional vendor hook is present and invocable.
    fn is_executable(&self, path: &Path) -> bool;

    /// Flush file buffers to disk.
    async fn sync_file(&self, file: &tokio::fs::File) -> Result<(), PlatformError>;
}

#[cfg(unix)]
type PlatformImpl = UnixPlatform;

/// Create the platform-specific implementation, selected at compile time.
pub fn create_platform() -> Box<dyn Platform> {
    Box::new(PlatformImpl::new())
}
