// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Download Stage
//!
//! Composes a [`HttpFetcher`], [`FileWriter`], and [`HashCalculator`] under
//! the pipeline's `Stage` contract. Input and output are both
//! [`InstallPlan`] -- this stage re-emits the plan unchanged so later
//! stages can read fields it never touches.
//!
//! The fetcher drives its delegate callbacks synchronously from within
//! `begin`, so chunk delivery is bridged onto an unbounded channel and
//! `begin` itself runs as a spawned task, concurrent with the sink loop
//! that performs the actual (async) writes and hashing. Cancellation --
//! both an external `stop()` and a write failure partway through -- is
//! signalled through the fetcher's `termination_handle`, obtained before
//! the fetcher is moved into the spawned task, since at that point nothing
//! else holds `&mut` access to it.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

use update_engine_domain::{
    ByteChunk, ChunkSequence, ExitCode, FetcherDelegate, FileWriter, HashCalculator, HttpFetcher, InstallPlan, Sha256Calculator,
    Stage, UpdateError,
};

/// Lifecycle callbacks for a single download stage run.
/// `set_download_status` brackets every other callback exactly once.
pub trait DownloadStageDelegate: Send {
    fn set_download_status(&mut self, active: bool);
    fn bytes_received(&mut self, chunk_size: u64, cumulative: u64, total: u64);
}

enum TransferEvent {
    Chunk(u64, Vec<u8>),
    Complete(bool),
    Terminated,
}

struct ChannelBridge {
    tx: mpsc::UnboundedSender<TransferEvent>,
}

impl FetcherDelegate for ChannelBridge {
    fn on_chunk(&mut self, offset: u64, bytes: &[u8]) {
        let _ = self.tx.send(TransferEvent::Chunk(offset, bytes.to_vec()));
    }

    fn on_transfer_complete(&mut self, success: bool) {
        let _ = self.tx.send(TransferEvent::Complete(success));
    }

    fn on_transfer_terminated(&mut self) {
        let _ = self.tx.send(TransferEvent::Terminated);
    }
}

pub struct DownloadStage<F, W, D>
where
    F: HttpFetcher + 'static,
    W: FileWriter,
    D: DownloadStageDelegate,
{
    fetcher: Option<F>,
    writer: W,
    delegate: D,
    hash_factory: Box<dyn Fn() -> Box<dyn HashCalculator> + Send>,
    cancel: Arc<AtomicBool>,
}

impl<F, W, D> DownloadStage<F, W, D>
where
    F: HttpFetcher + 'static,
    W: FileWriter,
    D: DownloadStageDelegate,
{
    /// `cancel` should be the same flag returned by the owning
    /// [`update_engine_domain::Pipeline::cancellation_flag`], so that the
    /// pipeline's `stop()` reaches this stage without needing concurrent
    /// `&mut` access to it.
    pub fn new(fetcher: F, writer: W, delegate: D, cancel: Arc<AtomicBool>) -> Self {
        Self {
            fetcher: Some(fetcher),
            writer,
            delegate,
            hash_factory: Box::new(|| Box::new(Sha256Calculator::new())),
            cancel,
        }
    }

    /// Override the hash calculator, e.g. to stub a fixed digest in tests.
    pub fn with_hash_factory<H>(mut self, factory: H) -> Self
    where
        H: Fn() -> Box<dyn HashCalculator> + Send + 'static,
    {
        self.hash_factory = Box::new(factory);
        self
    }
}

#[async_trait]
impl<F, W, D> Stage for DownloadStage<F, W, D>
where
    F: HttpFetcher + 'static,
    W: FileWriter + 'static,
    D: DownloadStageDelegate + 'static,
{
    type Input = InstallPlan;
    type Output = InstallPlan;

    async fn run(&mut self, plan: InstallPlan) -> (ExitCode, Option<InstallPlan>) {
        // Step 1: open the sink. No callback fires if this fails (S5).
        if let Err(e) = self.writer.open().await {
            return (ExitCode::Failed(e), None);
        }

        // Step 2 + 3: a fresh hasher, and the start-of-transfer callback.
        let mut hash_calc = (self.hash_factory)();
        self.delegate.set_download_status(true);

        let mut fetcher = self.fetcher.take().expect("a download stage runs at most once");
        let termination_handle = fetcher.termination_handle();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut bridge = ChannelBridge { tx };
        let begin_handle = tokio::spawn(async move {
            fetcher.begin(&mut bridge).await;
        });

        let mut cumulative: u64 = 0;
        let mut write_error: Option<UpdateError> = None;
        let mut transfer_succeeded: Option<bool> = None;
        let mut transfer_terminated = false;
        // Lazily anchored at the first chunk's own offset: the stage isn't
        // told whether `set_offset` was used to resume, but every chunk
        // after the first must still contiguously follow it.
        let mut sequence: Option<ChunkSequence> = None;

        while let Some(event) = rx.recv().await {
            if self.cancel.load(Ordering::SeqCst) {
                termination_handle.store(true, Ordering::SeqCst);
            }

            match event {
                TransferEvent::Chunk(offset, bytes) => {
                    if write_error.is_some() {
                        // Already failed: keep draining so the spawned
                        // task's sender isn't left blocked, but stop
                        // acting on anything it sends.
                        continue;
                    }
                    let chunk = ByteChunk::new(offset, bytes);
                    if sequence.is_none() {
                        // First chunk of the run: position the sink at its
                        // offset before the first write, whether that's 0
                        // (fresh transfer) or a resume point the fetcher
                        // was configured with via `set_offset` (port
                        // contract, `file_writer.rs`).
                        if let Err(e) = self.writer.seek(chunk.offset).await {
                            write_error = Some(e);
                            termination_handle.store(true, Ordering::SeqCst);
                            continue;
                        }
                    }
                    let in_order = sequence.get_or_insert_with(|| ChunkSequence::starting_at(chunk.offset)).accept(&chunk);
                    if !in_order {
                        write_error = Some(UpdateError::DownloadTransportError(format!(
                            "fetcher delivered chunk at offset {} out of sequence",
                            chunk.offset
                        )));
                        termination_handle.store(true, Ordering::SeqCst);
                        continue;
                    }
                    if let Err(e) = self.writer.write(&chunk.bytes).await {
                        write_error = Some(e);
                        termination_handle.store(true, Ordering::SeqCst);
                        continue;
                    }
                    hash_calc.update(&chunk.bytes);
                    cumulative = chunk.end_offset();
                    self.delegate.bytes_received(chunk.len(), cumulative, plan.payload_size);
                }
                TransferEvent::Complete(success) => transfer_succeeded = Some(success),
                TransferEvent::Terminated => transfer_terminated = true,
            }
        }

        let _ = begin_handle.await;

        // Step 7: the matching `false`, exactly once, on every exit path
        // from this point on.
        self.delegate.set_download_status(false);

        if let Some(e) = write_error {
            let _ = self.writer.close().await;
            return (ExitCode::Failed(e), None);
        }

        if transfer_terminated || self.cancel.load(Ordering::SeqCst) {
            let _ = self.writer.close().await;
            return (ExitCode::Failed(UpdateError::Cancelled("stop() requested".to_string())), None);
        }

        match transfer_succeeded {
            Some(true) => {
                if cumulative != plan.payload_size {
                    let _ = self.writer.close().await;
                    return (
                        ExitCode::Failed(UpdateError::DownloadSizeMismatch {
                            expected: plan.payload_size,
                            received: cumulative,
                        }),
                        None,
                    );
                }
                let digest = hash_calc.finalize();
                if digest != plan.payload_hash {
                    let _ = self.writer.close().await;
                    return (
                        ExitCode::Failed(UpdateError::DownloadHashMismatch {
                            expected: plan.payload_hash,
                            computed: digest,
                        }),
                        None,
                    );
                }
                match self.writer.close().await {
                    Ok(()) => (ExitCode::Success, Some(plan)),
                    Err(e) => (ExitCode::Failed(e), None),
                }
            }
            Some(false) | None => {
                let _ = self.writer.close().await;
                (
                    ExitCode::Failed(UpdateError::DownloadTransportError("fetcher reported transfer failure".to_string())),
                    None,
                )
            }
        }
    }

    fn request_stop(&mut self) {
        self.cancel.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    struct FakeFetcher {
        chunks: Vec<(u64, Vec<u8>)>,
        final_success: bool,
        terminated: Arc<AtomicBool>,
    }

    impl FakeFetcher {
        fn new(chunks: Vec<(u64, Vec<u8>)>) -> Self {
            Self {
                chunks,
                final_success: true,
                terminated: Arc::new(AtomicBool::new(false)),
            }
        }
    }

    #[async_trait]
    impl HttpFetcher for FakeFetcher {
        fn set_offset(&mut self, _n: u64) {}

        async fn begin(&mut self, delegate: &mut dyn FetcherDelegate) {
            for (offset, bytes) in &self.chunks {
                if self.terminated.load(Ordering::SeqCst) {
                    delegate.on_transfer_terminated();
                    return;
                }
                delegate.on_chunk(*offset, bytes);
            }
            if self.terminated.load(Ordering::SeqCst) {
                delegate.on_transfer_terminated();
                return;
            }
            delegate.on_transfer_complete(self.final_success);
        }

        fn terminate(&mut self) {
            self.terminated.store(true, Ordering::SeqCst);
        }

        fn termination_handle(&self) -> Arc<AtomicBool> {
            self.terminated.clone()
        }
    }

    struct FakeWriter {
        bytes: StdMutex<Vec<u8>>,
        fail_at_call: Option<usize>,
        call_count: StdMutex<usize>,
        seek_calls: StdMutex<Vec<u64>>,
    }

    impl FakeWriter {
        fn new() -> Self {
            Self {
                bytes: StdMutex::new(Vec::new()),
                fail_at_call: None,
                call_count: StdMutex::new(0),
                seek_calls: StdMutex::new(Vec::new()),
            }
        }

        fn failing_at(fail_at_call: usize) -> Self {
            Self {
                bytes: StdMutex::new(Vec::new()),
                fail_at_call: Some(fail_at_call),
                call_count: StdMutex::new(0),
                seek_calls: StdMutex::new(Vec::new()),
            }
        }

        fn written(&self) -> Vec<u8> {
            self.bytes.lock().unwrap().clone()
        }

        fn seeks(&self) -> Vec<u64> {
            self.seek_calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl FileWriter for FakeWriter {
        async fn open(&mut self) -> Result<(), UpdateError> {
            Ok(())
        }

        async fn seek(&mut self, offset: u64) -> Result<(), UpdateError> {
            self.seek_calls.lock().unwrap().push(offset);
            Ok(())
        }

        async fn write(&mut self, bytes: &[u8]) -> Result<(), UpdateError> {
            let mut count = self.call_count.lock().unwrap();
            *count += 1;
            if self.fail_at_call == Some(*count) {
                return Err(UpdateError::DownloadWriteError("fake write failure".to_string()));
            }
            self.bytes.lock().unwrap().extend_from_slice(bytes);
            Ok(())
        }

        async fn close(&mut self) -> Result<(), UpdateError> {
            Ok(())
        }
    }

    struct RecordingDelegate {
        status_calls: Vec<bool>,
        progress: Vec<(u64, u64, u64)>,
    }

    impl RecordingDelegate {
        fn new() -> Self {
            Self {
                status_calls: Vec::new(),
                progress: Vec::new(),
            }
        }
    }

    impl DownloadStageDelegate for RecordingDelegate {
        fn set_download_status(&mut self, active: bool) {
            self.status_calls.push(active);
        }

        fn bytes_received(&mut self, chunk_size: u64, cumulative: u64, total: u64) {
            self.progress.push((chunk_size, cumulative, total));
        }
    }

    fn plan_for(hash: &str, size: u64) -> InstallPlan {
        InstallPlan::full_update("https://example.invalid/payload", size, hash, "/tmp/fake-install-path")
    }

    #[tokio::test]
    async fn small_success_writes_the_requested_slice() {
        // S1: data = "oo" delivered at offset 1, plan advertises size 2.
        let fetcher = FakeFetcher::new(vec![(1, b"oo".to_vec())]);
        let writer = FakeWriter::new();
        let delegate = RecordingDelegate::new();
        let expected_hash = {
            let mut c = update_engine_domain::Sha256Calculator::new();
            c.update(b"oo");
            Box::new(c).finalize()
        };

        let mut stage = DownloadStage::new(fetcher, writer, delegate, Arc::new(AtomicBool::new(false)));
        let (code, output) = stage.run(plan_for(&expected_hash, 2)).await;

        assert!(code.is_success());
        assert_eq!(output.unwrap().payload_hash, expected_hash);
        assert_eq!(stage.writer.written(), b"oo");
        assert_eq!(stage.delegate.status_calls, vec![true, false]);
        assert_eq!(stage.writer.seeks(), vec![1]);
    }

    #[tokio::test]
    async fn a_resumed_transfer_seeks_to_the_first_chunks_offset_before_writing() {
        // Simulates a fetcher configured with `set_offset(8)` to resume a
        // transfer whose first 8 bytes were already written on a prior
        // attempt: the stage must seek to 8 before writing the first chunk,
        // not clobber the file from position 0.
        let fetcher = FakeFetcher::new(vec![(8, vec![b'b'; 8]), (16, vec![b'c'; 8])]);
        let writer = FakeWriter::new();
        let delegate = RecordingDelegate::new();

        let mut stage = DownloadStage::new(fetcher, writer, delegate, Arc::new(AtomicBool::new(false)));
        let (code, output) = stage.run(plan_for("irrelevant", 24)).await;

        assert!(matches!(code, ExitCode::Failed(UpdateError::DownloadHashMismatch { .. })));
        assert!(output.is_none());
        assert_eq!(stage.writer.seeks(), vec![8]);
        assert_eq!(stage.writer.written(), vec![b'b'; 8].into_iter().chain(vec![b'c'; 8]).collect::<Vec<u8>>());
    }

    #[tokio::test]
    async fn write_failure_on_second_call_surfaces_download_write_error() {
        // S3.
        let fetcher = FakeFetcher::new(vec![(0, vec![b'a'; 8]), (8, vec![b'b'; 8]), (16, vec![b'c'; 8])]);
        let writer = FakeWriter::failing_at(2);
        let delegate = RecordingDelegate::new();

        let mut stage = DownloadStage::new(fetcher, writer, delegate, Arc::new(AtomicBool::new(false)));
        let (code, output) = stage.run(plan_for("irrelevant", 24)).await;

        assert!(matches!(code, ExitCode::Failed(UpdateError::DownloadWriteError(_))));
        assert!(output.is_none());
        assert_eq!(stage.writer.written().len(), 8);
        assert_eq!(stage.delegate.progress.len(), 1);
        assert_eq!(stage.delegate.status_calls, vec![true, false]);
    }

    #[tokio::test]
    async fn size_mismatch_is_reported_even_with_a_matching_hash() {
        let fetcher = FakeFetcher::new(vec![(0, b"foo".to_vec())]);
        let writer = FakeWriter::new();
        let delegate = RecordingDelegate::new();
        let expected_hash = {
            let mut c = update_engine_domain::Sha256Calculator::new();
            c.update(b"foo");
            Box::new(c).finalize()
        };

        let mut stage = DownloadStage::new(fetcher, writer, delegate, Arc::new(AtomicBool::new(false)));
        let (code, output) = stage.run(plan_for(&expected_hash, 99)).await;

        assert!(matches!(code, ExitCode::Failed(UpdateError::DownloadSizeMismatch { .. })));
        assert!(output.is_none());
    }

    #[tokio::test]
    async fn hash_mismatch_is_reported_when_size_matches() {
        let fetcher = FakeFetcher::new(vec![(0, b"foo".to_vec())]);
        let writer = FakeWriter::new();
        let delegate = RecordingDelegate::new();

        let mut stage = DownloadStage::new(fetcher, writer, delegate, Arc::new(AtomicBool::new(false)));
        let (code, output) = stage.run(plan_for("0000000000000000000000000000000000000000000000000000000000000000", 3)).await;

        assert!(matches!(code, ExitCode::Failed(UpdateError::DownloadHashMismatch { .. })));
        assert!(output.is_none());
    }

    #[tokio::test]
    async fn bad_output_path_fails_before_any_status_callback() {
        struct AlwaysFailsToOpen;
        #[async_trait]
        impl FileWriter for AlwaysFailsToOpen {
            async fn open(&mut self) -> Result<(), UpdateError> {
                Err(UpdateError::DownloadWriteError("no such directory".to_string()))
            }
            async fn seek(&mut self, _offset: u64) -> Result<(), UpdateError> {
                Ok(())
            }
            async fn write(&mut self, _bytes: &[u8]) -> Result<(), UpdateError> {
                Ok(())
            }
            async fn close(&mut self) -> Result<(), UpdateError> {
                Ok(())
            }
        }

        let fetcher = FakeFetcher::new(vec![(0, b"foo".to_vec())]);
        let delegate = RecordingDelegate::new();

        let mut stage = DownloadStage::new(fetcher, AlwaysFailsToOpen, delegate, Arc::new(AtomicBool::new(false)));
        let (code, output) = stage.run(plan_for("irrelevant", 3)).await;

        assert!(matches!(code, ExitCode::Failed(UpdateError::DownloadWriteError(_))));
        assert!(output.is_none());
        assert!(stage.delegate.status_calls.is_empty());
    }

    #[tokio::test]
    async fn cancelling_before_the_run_surfaces_as_cancelled() {
        let fetcher = FakeFetcher::new(vec![(0, vec![b'x'; 4096])]);
        let writer = FakeWriter::new();
        let delegate = RecordingDelegate::new();
        let cancel = Arc::new(AtomicBool::new(true));

        let mut stage = DownloadStage::new(fetcher, writer, delegate, cancel);
        let (code, output) = stage.run(plan_for("irrelevant", 4096)).await;

        assert!(matches!(code, ExitCode::Failed(UpdateError::Cancelled(_))));
        assert!(output.is_none());
    }

    #[tokio::test]
    async fn transport_failure_is_reported() {
        let mut fetcher = FakeFetcher::new(vec![]);
        fetcher.final_success = false;
        let writer = FakeWriter::new();
        let delegate = RecordingDelegate::new();

        let mut stage = DownloadStage::new(fetcher, writer, delegate, Arc::new(AtomicBool::new(false)));
        let (code, output) = stage.run(plan_for("irrelevant", 0)).await;

        assert!(matches!(code, ExitCode::Failed(UpdateError::DownloadTransportError(_))));
        assert!(output.is_none());
    }

    #[tokio::test]
    async fn a_chunk_that_skips_ahead_is_rejected_as_out_of_order() {
        // Second chunk claims offset 16 but only 8 bytes preceded it.
        let fetcher = FakeFetcher::new(vec![(0, vec![b'a'; 8]), (16, vec![b'b'; 8])]);
        let writer = FakeWriter::new();
        let delegate = RecordingDelegate::new();

        let mut stage = DownloadStage::new(fetcher, writer, delegate, Arc::new(AtomicBool::new(false)));
        let (code, output) = stage.run(plan_for("irrelevant", 16)).await;

        assert!(matches!(code, ExitCode::Failed(UpdateError::DownloadTransportError(_))));
        assert!(output.is_none());
        assert_eq!(stage.writer.written().len(), 8);
        assert_eq!(stage.writer.seeks(), vec![0]);
    }
}
