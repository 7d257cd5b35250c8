// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Update Service State Machine
//!
//! Models the bus object `com.coreos.update1.Manager` as a
//! [`ControlSurface`] trait with an in-process implementation. The
//! service-state snapshot is the only mutable state multiple callers can
//! observe concurrently, so it lives behind a `parking_lot::RwLock`
//! rather than single-writer informality.
//!
//! A real bus adapter (`zbus`) would sit in front of this trait,
//! translating method calls and enforcing the owner/user access policy;
//! that adapter is out of scope here, the trait is the documented seam
//! for it.

use async_trait::async_trait;
use futures::future::BoxFuture;
use parking_lot::RwLock;
use std::sync::Arc;

use update_engine_domain::{
    ErrorCategory, ExitCode, FileWriter, HttpFetcher, InstallPlan, Pipeline, PipelineDelegate, ServiceState, SlotIdentity,
    UpdateChecker, UpdateError,
};

use crate::application::stages::{DownloadStage, DownloadStageDelegate};
use crate::infrastructure::repositories::{PersistedStatus, StatusRepository};
use crate::infrastructure::EngineMetrics;

/// The `GetStatus` reply: `(last_checked_unix_s, progress_0_to_1,
/// current_state_string, new_version, new_size_bytes)`.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusSnapshot {
    pub last_checked_unix_s: i64,
    pub progress_fraction: f64,
    pub current_state_string: String,
    pub new_version: Option<String>,
    pub new_size_bytes: Option<u64>,
}

/// Models `com.coreos.update1.Manager`'s three methods.
/// The real bus boundary enforces the owner/user access policy; this
/// trait only carries the three operations any authorized caller may
/// invoke.
#[async_trait]
pub trait ControlSurface: Send + Sync {
    /// Starts a check if `Idle`; a no-op returning the current snapshot
    /// otherwise.
    async fn attempt_update(&self) -> StatusSnapshot;

    /// Clears `ReportingError` or `UpdatedNeedReboot` back to `Idle`.
    /// Idempotent.
    async fn reset_status(&self) -> StatusSnapshot;

    /// A read-only snapshot of current progress.
    async fn get_status(&self) -> StatusSnapshot;
}

struct Inner {
    state: ServiceState,
    new_version: Option<String>,
    new_size_bytes: Option<u64>,
    last_checked_unix_s: i64,
}

/// Forwards [`DownloadStage`]'s per-chunk progress into the shared
/// service-state snapshot. `set_download_status` is a no-op here: entry
/// into `Downloading` already happened at [`UpdateService::update_found`].
struct ProgressDelegate {
    inner: Arc<RwLock<Inner>>,
}

impl DownloadStageDelegate for ProgressDelegate {
    fn set_download_status(&mut self, _active: bool) {}

    fn bytes_received(&mut self, _chunk_size: u64, cumulative: u64, total: u64) {
        self.inner.write().state = ServiceState::Downloading { received: cumulative, total };
    }
}

/// Logs stage and pipeline lifecycle events at the levels the ambient
/// stack's logging section calls for (milestones at `info`, nothing
/// per-chunk).
struct TracingPipelineDelegate;

impl PipelineDelegate for TracingPipelineDelegate {
    fn on_stage_complete(&mut self, stage_index: usize, code: &ExitCode) {
        tracing::info!(stage_index, success = code.is_success(), "pipeline stage complete");
    }

    fn on_pipeline_done(&mut self, final_code: &ExitCode) {
        tracing::info!(success = final_code.is_success(), "pipeline done");
    }

    fn on_pipeline_stopped(&mut self) {
        tracing::info!("pipeline stopped");
    }
}

/// In-process implementation of [`ControlSurface`].
/// `AttemptUpdate` only flips the state to `CheckingForUpdate` and returns
/// immediately, matching the bus's fire-and-forget method semantics.
/// Driving the check/download/verify/finalize sequence to completion is a
/// separate call to [`UpdateService::run_check_cycle`] against a concrete
/// `UpdateChecker`; no such checker ships with this crate (the update-check
/// protocol itself is out of scope), so `updatectl` does not call it today
/// -- it is the documented seam for whoever supplies one.
pub struct UpdateService {
    inner: Arc<RwLock<Inner>>,
    repository: Arc<StatusRepository>,
    metrics: Arc<EngineMetrics>,
}

impl UpdateService {
    pub async fn new(repository: Arc<StatusRepository>, metrics: Arc<EngineMetrics>) -> Result<Self, UpdateError> {
        let persisted = repository.load().await?;
        metrics.set_current_state(ServiceState::Idle.as_str());
        Ok(Self {
            inner: Arc::new(RwLock::new(Inner {
                state: ServiceState::Idle,
                new_version: None,
                new_size_bytes: None,
                last_checked_unix_s: persisted.last_checked_unix_s,
            })),
            repository,
            metrics,
        })
    }

    fn snapshot(inner: &Inner) -> StatusSnapshot {
        StatusSnapshot {
            last_checked_unix_s: inner.last_checked_unix_s,
            progress_fraction: inner.state.progress_fraction(),
            current_state_string: inner.state.as_str().to_string(),
            new_version: inner.new_version.clone(),
            new_size_bytes: inner.new_size_bytes,
        }
    }

    /// Advance to `Downloading { received: 0, total }`, recording the
    /// advertised version/size for `GetStatus`. Called once an update
    /// check completes successfully, outside the `ControlSurface`
    /// methods proper.
    pub fn update_found(&self, version: String, total: u64) {
        let mut inner = self.inner.write();
        inner.new_version = Some(version);
        inner.new_size_bytes = Some(total);
        inner.state = ServiceState::Downloading { received: 0, total };
        self.metrics.set_current_state(inner.state.as_str());
    }

    /// No update found: return to `Idle` from `CheckingForUpdate`.
    pub fn no_update_found(&self) {
        let mut inner = self.inner.write();
        inner.state = ServiceState::Idle;
        self.metrics.set_current_state(inner.state.as_str());
    }

    /// Record download progress (`Downloading -- bytes --> Downloading`).
    pub fn report_progress(&self, received: u64, total: u64) {
        let mut inner = self.inner.write();
        inner.state = ServiceState::Downloading { received, total };
    }

    pub fn enter_verifying(&self) {
        let mut inner = self.inner.write();
        inner.state = ServiceState::Verifying;
        self.metrics.set_current_state(inner.state.as_str());
    }

    pub fn enter_finalizing(&self) {
        let mut inner = self.inner.write();
        inner.state = ServiceState::Finalizing;
        self.metrics.set_current_state(inner.state.as_str());
    }

    /// Finalization succeeded: `UpdatedNeedReboot`, and the successful
    /// slot is persisted for the next `GetStatus` after a restart.
    pub async fn finalized(&self, activated_slot: &str) -> Result<(), UpdateError> {
        {
            let mut inner = self.inner.write();
            inner.state = ServiceState::UpdatedNeedReboot;
            self.metrics.set_current_state(inner.state.as_str());
        }
        self.metrics.record_activation_success();
        self.persist(Some(activated_slot.to_string()), None).await
    }

    /// Any stage or the activator failed: `ReportingError{kind}`.
    /// `Cancelled` is the one kind that returns to `Idle` silently instead.
    pub async fn failed(&self, error: &UpdateError) -> Result<(), UpdateError> {
        let category = error.category();
        {
            let mut inner = self.inner.write();
            inner.state = if category == ErrorCategory::Cancellation {
                ServiceState::Idle
            } else {
                ServiceState::ReportingError { kind: category }
            };
            self.metrics.set_current_state(inner.state.as_str());
        }
        if category == ErrorCategory::Activation {
            self.metrics.record_activation_failure();
        }
        self.persist(None, Some(format!("{category:?}"))).await
    }

    /// Drives one full `CheckingForUpdate -> Downloading -> Verifying ->
    /// Finalizing -> UpdatedNeedReboot` cycle, gluing the pipeline and
    /// download stage to this state machine. Only meaningful to call
    /// right after `attempt_update` moved the state to
    /// `CheckingForUpdate`; calling it from any other state still runs
    /// the cycle; it is the caller's job to serialize this against
    /// concurrent `attempt_update` calls.
    ///
    /// `fetcher`/`writer` are built from the plan the checker returns,
    /// since they need the plan's URL/install path at construction.
    /// `finalize` is supplied by the composition root rather than called
    /// in-process here: the finalizer is a separately invoked executable
    /// (this binary's own `finalize` subcommand, run via the `Executor`
    /// port), not a pipeline stage, so `UpdateService` only needs its
    /// outcome.
    pub async fn run_check_cycle<C, F, W>(
        &self,
        checker: &C,
        fetcher_factory: impl FnOnce(&InstallPlan) -> F,
        writer_factory: impl FnOnce(&InstallPlan) -> W,
        finalize: impl FnOnce(InstallPlan) -> BoxFuture<'static, Result<SlotIdentity, UpdateError>>,
    ) -> Result<(), UpdateError>
    where
        C: UpdateChecker + ?Sized,
        F: HttpFetcher + 'static,
        W: FileWriter + 'static,
    {
        let (version, plan) = match checker.check().await {
            Ok(Some(found)) => found,
            Ok(None) => {
                self.no_update_found();
                return Ok(());
            }
            Err(e) => return self.failed(&e).await,
        };

        self.update_found(version, plan.payload_size);

        let fetcher = fetcher_factory(&plan);
        let writer = writer_factory(&plan);
        let progress = ProgressDelegate { inner: self.inner.clone() };

        let mut pipeline = Pipeline::new();
        let cancel = pipeline.cancellation_flag();
        pipeline
            .enqueue(DownloadStage::new(fetcher, writer, progress, cancel))
            .expect("a single freshly enqueued stage cannot mis-bond");

        let mut delegate = TracingPipelineDelegate;
        let code = pipeline
            .start(plan.clone(), &mut delegate)
            .await
            .expect("the seed is an InstallPlan, matching the sole stage's declared input");

        if let ExitCode::Failed(e) = code {
            return self.failed(&e).await;
        }

        self.enter_verifying();
        self.enter_finalizing();

        match finalize(plan).await {
            Ok(slot) => self.finalized(&slot.to_string()).await,
            Err(e) => self.failed(&e).await,
        }
    }

    async fn persist(&self, last_successful_slot: Option<String>, last_error_kind: Option<String>) -> Result<(), UpdateError> {
        let last_checked_unix_s = self.inner.read().last_checked_unix_s;
        let existing = self.repository.load().await?;
        self.repository
            .save(&PersistedStatus {
                last_checked_unix_s,
                last_successful_slot: last_successful_slot.or(existing.last_successful_slot),
                last_error_kind: last_error_kind.or(existing.last_error_kind),
            })
            .await
    }
}

#[async_trait]
impl ControlSurface for UpdateService {
    async fn attempt_update(&self) -> StatusSnapshot {
        let mut inner = self.inner.write();
        if inner.state.is_idle() {
            inner.state = ServiceState::CheckingForUpdate;
            inner.last_checked_unix_s = chrono::Utc::now().timestamp();
            self.metrics.set_current_state(inner.state.as_str());
        }
        Self::snapshot(&inner)
    }

    async fn reset_status(&self) -> StatusSnapshot {
        let mut inner = self.inner.write();
        if matches!(inner.state, ServiceState::ReportingError { .. } | ServiceState::UpdatedNeedReboot) {
            inner.state = ServiceState::Idle;
            inner.new_version = None;
            inner.new_size_bytes = None;
            self.metrics.set_current_state(inner.state.as_str());
        }
        Self::snapshot(&inner)
    }

    async fn get_status(&self) -> StatusSnapshot {
        Self::snapshot(&self.inner.read())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tempfile::tempdir;
    use update_engine_domain::{FetcherDelegate, HashCalculator};

    struct FakeChecker {
        result: Result<Option<(String, InstallPlan)>, UpdateError>,
    }

    #[async_trait]
    impl UpdateChecker for FakeChecker {
        async fn check(&self) -> Result<Option<(String, InstallPlan)>, UpdateError> {
            self.result.clone()
        }
    }

    struct FakeFetcher {
        chunk: Vec<u8>,
        terminated: Arc<std::sync::atomic::AtomicBool>,
    }

    #[async_trait]
    impl HttpFetcher for FakeFetcher {
        fn set_offset(&mut self, _n: u64) {}

        async fn begin(&mut self, delegate: &mut dyn FetcherDelegate) {
            delegate.on_chunk(0, &self.chunk);
            delegate.on_transfer_complete(true);
        }

        fn terminate(&mut self) {
            self.terminated.store(true, Ordering::SeqCst);
        }

        fn termination_handle(&self) -> Arc<std::sync::atomic::AtomicBool> {
            self.terminated.clone()
        }
    }

    struct FakeWriter {
        bytes: Vec<u8>,
    }

    #[async_trait]
    impl FileWriter for FakeWriter {
        async fn open(&mut self) -> Result<(), UpdateError> {
            Ok(())
        }
        async fn seek(&mut self, _offset: u64) -> Result<(), UpdateError> {
            Ok(())
        }
        async fn write(&mut self, bytes: &[u8]) -> Result<(), UpdateError> {
            self.bytes.extend_from_slice(bytes);
            Ok(())
        }
        async fn close(&mut self) -> Result<(), UpdateError> {
            Ok(())
        }
    }

    fn plan_for(payload: &[u8]) -> InstallPlan {
        let mut c = update_engine_domain::Sha256Calculator::new();
        c.update(payload);
        let hash = Box::new(c).finalize();
        InstallPlan::full_update("https://example.invalid/payload", payload.len() as u64, hash, "/tmp/fake-install-path")
    }

    async fn service() -> (UpdateService, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("status.db");
        let repository = Arc::new(StatusRepository::connect(db_path.to_str().unwrap()).await.unwrap());
        let metrics = Arc::new(EngineMetrics::new());
        (UpdateService::new(repository, metrics).await.unwrap(), dir)
    }

    #[tokio::test]
    async fn attempt_update_from_idle_moves_to_checking() {
        let (service, _dir) = service().await;
        let snapshot = service.attempt_update().await;
        assert_eq!(snapshot.current_state_string, "checking-for-update");
    }

    #[tokio::test]
    async fn attempt_update_while_not_idle_is_a_no_op() {
        let (service, _dir) = service().await;
        service.attempt_update().await;
        service.update_found("2026.1.0".to_string(), 1000);

        let before = service.get_status().await;
        let reply = service.attempt_update().await;

        assert_eq!(reply, before);
        assert_eq!(reply.current_state_string, "downloading");
    }

    #[tokio::test]
    async fn reset_status_is_idempotent() {
        let (service, _dir) = service().await;
        service
            .failed(&UpdateError::DownloadHashMismatch {
                expected: "a".to_string(),
                computed: "b".to_string(),
            })
            .await
            .unwrap();

        let first = service.reset_status().await;
        let second = service.reset_status().await;

        assert_eq!(first, second);
        assert_eq!(first.current_state_string, "idle");
    }

    #[tokio::test]
    async fn cancellation_returns_to_idle_not_reporting_error() {
        let (service, _dir) = service().await;
        service.attempt_update().await;

        service.failed(&UpdateError::Cancelled("stop() requested".to_string())).await.unwrap();

        let status = service.get_status().await;
        assert_eq!(status.current_state_string, "idle");
    }

    #[tokio::test]
    async fn non_cancellation_failure_reports_error_with_its_category() {
        let (service, _dir) = service().await;
        service.attempt_update().await;

        service.failed(&UpdateError::EspNotFound).await.unwrap();

        let status = service.get_status().await;
        assert_eq!(status.current_state_string, "reporting-error");
    }

    #[tokio::test]
    async fn successful_finalization_persists_the_activated_slot() {
        let (service, _dir) = service().await;
        service.finalized("B").await.unwrap();

        let status = service.get_status().await;
        assert_eq!(status.current_state_string, "updated-need-reboot");

        let persisted = service.repository.load().await.unwrap();
        assert_eq!(persisted.last_successful_slot, Some("B".to_string()));
    }

    #[tokio::test]
    async fn progress_updates_are_reflected_in_status() {
        let (service, _dir) = service().await;
        service.update_found("2026.1.0".to_string(), 200);
        service.report_progress(50, 200);

        let status = service.get_status().await;
        assert_eq!(status.progress_fraction, 0.25);
        assert_eq!(status.new_size_bytes, Some(200));
    }

    #[tokio::test]
    async fn run_check_cycle_with_no_update_returns_to_idle() {
        let (service, _dir) = service().await;
        let checker = FakeChecker { result: Ok(None) };

        service
            .run_check_cycle(
                &checker,
                |_plan| FakeFetcher {
                    chunk: Vec::new(),
                    terminated: Arc::new(AtomicBool::new(false)),
                },
                |_plan| FakeWriter { bytes: Vec::new() },
                |_plan| Box::pin(async { Ok(SlotIdentity::A) }),
            )
            .await
            .unwrap();

        let status = service.get_status().await;
        assert_eq!(status.current_state_string, "idle");
    }

    #[tokio::test]
    async fn run_check_cycle_end_to_end_success_reaches_updated_need_reboot() {
        let (service, _dir) = service().await;
        let payload = b"a shiny new image".to_vec();
        let plan = plan_for(&payload);
        let checker = FakeChecker {
            result: Ok(Some(("2026.2.0".to_string(), plan))),
        };

        service
            .run_check_cycle(
                &checker,
                |_plan| FakeFetcher {
                    chunk: payload.clone(),
                    terminated: Arc::new(AtomicBool::new(false)),
                },
                |_plan| FakeWriter { bytes: Vec::new() },
                |_plan| Box::pin(async { Ok(SlotIdentity::B) }),
            )
            .await
            .unwrap();

        let status = service.get_status().await;
        assert_eq!(status.current_state_string, "updated-need-reboot");
        assert_eq!(status.new_version, Some("2026.2.0".to_string()));

        let persisted = service.repository.load().await.unwrap();
        assert_eq!(persisted.last_successful_slot, Some("B".to_string()));
    }

    #[tokio::test]
    async fn run_check_cycle_reports_checker_failure() {
        let (service, _dir) = service().await;
        let checker = FakeChecker {
            result: Err(UpdateError::EspNotFound),
        };

        service
            .run_check_cycle(
                &checker,
                |_plan| FakeFetcher {
                    chunk: Vec::new(),
                    terminated: Arc::new(AtomicBool::new(false)),
                },
                |_plan| FakeWriter { bytes: Vec::new() },
                |_plan| Box::pin(async { Ok(SlotIdentity::A) }),
            )
            .await
            .unwrap();

        let status = service.get_status().await;
        assert_eq!(status.current_state_string, "reporting-error");
    }

    #[tokio::test]
    async fn run_check_cycle_reports_download_stage_failure() {
        let (service, _dir) = service().await;
        // Hash mismatch: plan advertises a hash for different bytes than the fetcher delivers.
        let plan = InstallPlan::full_update("https://example.invalid/payload", 3, "0".repeat(64), "/tmp/fake-install-path");
        let checker = FakeChecker {
            result: Ok(Some(("2026.2.0".to_string(), plan))),
        };

        service
            .run_check_cycle(
                &checker,
                |_plan| FakeFetcher {
                    chunk: b"foo".to_vec(),
                    terminated: Arc::new(AtomicBool::new(false)),
                },
                |_plan| FakeWriter { bytes: Vec::new() },
                |_plan| Box::pin(async { Ok(SlotIdentity::A) }),
            )
            .await
            .unwrap();

        let status = service.get_status().await;
        assert_eq!(status.current_state_string, "reporting-error");
    }

    #[tokio::test]
    async fn run_check_cycle_reports_finalize_failure() {
        let (service, _dir) = service().await;
        let payload = b"payload".to_vec();
        let plan = plan_for(&payload);
        let checker = FakeChecker {
            result: Ok(Some(("2026.2.0".to_string(), plan))),
        };

        service
            .run_check_cycle(
                &checker,
                |_plan| FakeFetcher {
                    chunk: payload.clone(),
                    terminated: Arc::new(AtomicBool::new(false)),
                },
                |_plan| FakeWriter { bytes: Vec::new() },
                |_plan| Box::pin(async { Err(UpdateError::ActivationError("no spare slot".to_string())) }),
            )
            .await
            .unwrap();

        let status = service.get_status().await;
        assert_eq!(status.current_state_string, "reporting-error");
    }
}
