// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! [`FileWriter`] implementations:
//! direct-to-device, buffered, and an injectable-failure test double.

use async_trait::async_trait;
use std::path::PathBuf;
use tokio::io::{AsyncSeekExt, AsyncWriteExt, BufWriter};

use update_engine_domain::{FileWriter, UpdateError};

/// Writes directly to the destination path (a regular file or a block
/// device) with no intermediate buffering -- every `write` call issues a
/// syscall. Used for the inactive-slot device, where durability of each
/// chunk matters more than syscall count.
pub struct DirectFileWriter {
    path: PathBuf,
    file: Option<tokio::fs::File>,
}

impl DirectFileWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: None,
        }
    }

    fn file_mut(&mut self) -> Result<&mut tokio::fs::File, UpdateError> {
        self.file
            .as_mut()
            .ok_or_else(|| UpdateError::DownloadWriteError("writer used before open()".to_string()))
    }
}

#[async_trait]
impl FileWriter for DirectFileWriter {
    async fn open(&mut self) -> Result<(), UpdateError> {
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .open(&self.path)
            .await
            .map_err(|e| UpdateError::DownloadWriteError(format!("opening {}: {e}", self.path.display())))?;
        self.file = Some(file);
        Ok(())
    }

    async fn seek(&mut self, offset: u64) -> Result<(), UpdateError> {
        self.file_mut()?
            .seek(std::io::SeekFrom::Start(offset))
            .await
            .map_err(|e| UpdateError::DownloadWriteError(format!("seeking to {offset}: {e}")))?;
        Ok(())
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<(), UpdateError> {
        self.file_mut()?
            .write_all(bytes)
            .await
            .map_err(|e| UpdateError::DownloadWriteError(format!("writing {} bytes: {e}", bytes.len())))
    }

    async fn close(&mut self) -> Result<(), UpdateError> {
        if let Some(file) = self.file.as_mut() {
            file.flush()
                .await
                .map_err(|e| UpdateError::DownloadWriteError(format!("flushing: {e}")))?;
            file.sync_all()
                .await
                .map_err(|e| UpdateError::DownloadWriteError(format!("syncing: {e}")))?;
        }
        self.file = None;
        Ok(())
    }
}

/// Wraps a [`DirectFileWriter`] in a `BufWriter`, batching small chunks
/// into fewer, larger syscalls. Preferred for the buffered staging path
/// (e.g. writing into a regular filesystem rather than a raw device).
pub struct BufferedFileWriter {
    path: PathBuf,
    inner: Option<BufWriter<tokio::fs::File>>,
}

impl BufferedFileWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            inner: None,
        }
    }

    fn inner_mut(&mut self) -> Result<&mut BufWriter<tokio::fs::File>, UpdateError> {
        self.inner
            .as_mut()
            .ok_or_else(|| UpdateError::DownloadWriteError("writer used before open()".to_string()))
    }
}

#[async_trait]
impl FileWriter for BufferedFileWriter {
    async fn open(&mut self) -> Result<(), UpdateError> {
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .open(&self.path)
            .await
            .map_err(|e| UpdateError::DownloadWriteError(format!("opening {}: {e}", self.path.display())))?;
        self.inner = Some(BufWriter::new(file));
        Ok(())
    }

    async fn seek(&mut self, offset: u64) -> Result<(), UpdateError> {
        self.inner_mut()?
            .seek(std::io::SeekFrom::Start(offset))
            .await
            .map_err(|e| UpdateError::DownloadWriteError(format!("seeking to {offset}: {e}")))?;
        Ok(())
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<(), UpdateError> {
        self.inner_mut()?
            .write_all(bytes)
            .await
            .map_err(|e| UpdateError::DownloadWriteError(format!("writing {} bytes: {e}", bytes.len())))
    }

    async fn close(&mut self) -> Result<(), UpdateError> {
        if let Some(inner) = self.inner.as_mut() {
            inner
                .flush()
                .await
                .map_err(|e| UpdateError::DownloadWriteError(format!("flushing: {e}")))?;
            inner
                .get_ref()
                .sync_all()
                .await
                .map_err(|e| UpdateError::DownloadWriteError(format!("syncing: {e}")))?;
        }
        self.inner = None;
        Ok(())
    }
}

/// Wraps another [`FileWriter`] and forces its Nth `write` call to fail,
/// for fault-injection tests.
pub struct FailOnNthWrite<W: FileWriter> {
    inner: W,
    fail_at_call: u64,
    calls: u64,
}

impl<W: FileWriter> FailOnNthWrite<W> {
    /// `fail_at_call` is 1-based: `1` fails the first write.
    pub fn new(inner: W, fail_at_call: u64) -> Self {
        Self {
            inner,
            fail_at_call,
            calls: 0,
        }
    }
}

#[async_trait]
impl<W: FileWriter> FileWriter for FailOnNthWrite<W> {
    async fn open(&mut self) -> Result<(), UpdateError> {
        self.inner.open().await
    }

    async fn seek(&mut self, offset: u64) -> Result<(), UpdateError> {
        self.inner.seek(offset).await
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<(), UpdateError> {
        self.calls += 1;
        if self.calls == self.fail_at_call {
            return Err(UpdateError::DownloadWriteError(format!(
                "injected failure at write call {}",
                self.calls
            )));
        }
        self.inner.write(bytes).await
    }

    async fn close(&mut self) -> Result<(), UpdateError> {
        self.inner.close().await
    }
}
